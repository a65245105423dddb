//! Write Models
//!
//! Reducers for the kernel's aggregates. Each reducer sees the decoded
//! [`PlatformEvent`](crate::events::PlatformEvent) of the tags it handles.

pub mod human;
pub mod intent;
pub mod org_idp;

pub use human::{HumanReducer, HumanWriteModel};
pub use intent::{IntentReducer, IntentWriteModel};
pub use org_idp::{IdpEntry, OrgIdpsReducer, OrgIdpsWriteModel};
