//! Event Store Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventStoreError {
    #[error("Sequence conflict on {aggregate_type} {aggregate_id}: expected {expected}, found {actual}")]
    SequenceConflict {
        aggregate_type: String,
        aggregate_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Resource owner mismatch on {aggregate_type} {aggregate_id}")]
    ResourceOwnerMismatch {
        aggregate_type: String,
        aggregate_id: String,
    },

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Failed to decode {event_type} at sequence {sequence}: {source}")]
    Decode {
        event_type: String,
        sequence: u64,
        source: serde_json::Error,
    },

    #[error("Failed to encode event payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EventStoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::SequenceConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, EventStoreError>;
