//! Event records.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Aggregate, EventStoreError, Result};

/// An event built by a command, not yet sequenced.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub event_type: String,
    pub editor_id: String,
    pub payload: serde_json::Value,
}

impl PendingEvent {
    pub fn new(
        event_type: impl Into<String>,
        editor_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            editor_id: editor_id.into(),
            payload,
        }
    }

    /// Serialize a typed payload.
    pub fn from_payload<P: Serialize>(
        event_type: impl Into<String>,
        editor_id: impl Into<String>,
        payload: &P,
    ) -> Result<Self> {
        Ok(Self::new(event_type, editor_id, serde_json::to_value(payload)?))
    }
}

/// An appended, immutable event.
///
/// `sequence` and `creation_time` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub aggregate_type: String,
    #[serde(rename = "aggregateID")]
    pub aggregate_id: String,
    pub resource_owner: String,
    pub sequence: u64,
    pub creation_time: DateTime<Utc>,
    #[serde(rename = "editorID")]
    pub editor_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl StoredEvent {
    pub fn aggregate(&self) -> Aggregate {
        Aggregate::new(&self.aggregate_type, &self.aggregate_id, &self.resource_owner)
    }

    /// Deserialize the payload into `P`.
    pub fn payload_as<P: DeserializeOwned>(&self) -> Result<P> {
        serde_json::from_value(self.payload.clone()).map_err(|source| EventStoreError::Decode {
            event_type: self.event_type.clone(),
            sequence: self.sequence,
            source,
        })
    }
}
