//! Domain Types
//!
//! Value types shared by events, write models and commands.

pub mod idp;
pub mod intent;
pub mod user;

pub use idp::*;
pub use intent::*;
pub use user::*;

use chrono::{DateTime, Utc};
use iam_eventstore::{StoredEvent, WriteModel};
use serde::{Deserialize, Serialize};

/// Who is executing a command, recorded as the editor of every event it
/// produces.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub principal_id: String,
    pub correlation_id: String,
}

impl ExecutionContext {
    pub fn new(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

/// Position of an aggregate after a command or read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetails {
    pub sequence: u64,
    pub change_date: DateTime<Utc>,
    pub resource_owner: String,
}

impl ObjectDetails {
    pub fn from_event(event: &StoredEvent) -> Self {
        Self {
            sequence: event.sequence,
            change_date: event.creation_time,
            resource_owner: event.resource_owner.clone(),
        }
    }

    /// `None` until the model has folded at least one event.
    pub fn from_write_model<R>(model: &WriteModel<R>) -> Option<Self> {
        model.change_date.map(|change_date| Self {
            sequence: model.processed_sequence,
            change_date,
            resource_owner: model.aggregate.resource_owner.clone(),
        })
    }
}
