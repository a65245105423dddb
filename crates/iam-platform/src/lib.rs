//! Identity Kernel Platform
//!
//! Event-sourced identity providers, federation intents and human users:
//! - `domain`: provider configurations, intent and user value types
//! - `events`: the [`PlatformEvent`] family and its registry
//! - `write_model`: reducers rebuilding aggregate state from events
//! - `operations`: commands with optimistic concurrency and bounded retries
//! - `service`: federation flow, intent tokens and request mapping

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod operations;
pub mod service;
pub mod write_model;

pub use config::PlatformConfig;
pub use domain::{ExecutionContext, ObjectDetails};
pub use error::{ErrorKind, PlatformError, Result};
pub use events::{registry, PlatformEvent};
pub use operations::Commands;
pub use service::{FederationService, UserService};
