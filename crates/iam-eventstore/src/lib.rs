//! Identity Kernel Event Store
//!
//! Event-sourcing primitives shared by every aggregate in the kernel:
//! - Aggregate identity and the immutable event record
//! - An explicit type registry mapping event tags to decoders
//! - The append-only store contract with optimistic concurrency
//! - An in-memory engine honouring that contract
//! - Write models folded from an aggregate's stream

pub mod aggregate;
pub mod error;
pub mod event;
pub mod memory;
pub mod registry;
pub mod store;
pub mod write_model;

pub use aggregate::Aggregate;
pub use error::{EventStoreError, Result};
pub use event::{PendingEvent, StoredEvent};
pub use memory::MemoryEventStore;
pub use registry::EventRegistry;
pub use store::{EventStore, EventStream};
pub use write_model::{Reducer, WriteModel};
