//! Platform Error Types
//!
//! Every error maps to one [`ErrorKind`] and carries a stable message id
//! (`Errors.Intent.InvalidToken`, ...) for the service layer to translate.
//! Messages never contain secrets or tokens.

use std::time::Duration;

use iam_eventstore::EventStoreError;
use iam_secrets::SecretsError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    PreconditionFailed,
    SequenceConflict,
    CryptoFailure,
    DeadlineExceeded,
    Internal,
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Invalid argument ({id}): {message}")]
    InvalidArgument { id: &'static str, message: String },

    #[error("Not found ({id}): {entity_type} {entity_id}")]
    NotFound {
        id: &'static str,
        entity_type: &'static str,
        entity_id: String,
    },

    #[error("Already exists ({id}): {entity_type} {entity_id}")]
    AlreadyExists {
        id: &'static str,
        entity_type: &'static str,
        entity_id: String,
    },

    #[error("Permission denied ({id})")]
    PermissionDenied { id: &'static str },

    #[error("Precondition failed ({id}): {message}")]
    PreconditionFailed { id: &'static str, message: String },

    #[error("Sequence conflict on {aggregate_type} {aggregate_id}: expected {expected}, found {actual}")]
    SequenceConflict {
        aggregate_type: String,
        aggregate_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Crypto failure: {0}")]
    Crypto(#[from] SecretsError),

    #[error("Deadline exceeded: {operation} took longer than {timeout_ms} ms")]
    DeadlineExceeded {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Event type not registered: {event_type}")]
    UnknownEventType { event_type: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn invalid_argument(id: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            id,
            message: message.into(),
        }
    }

    pub fn not_found(id: &'static str, entity_type: &'static str, entity_id: impl Into<String>) -> Self {
        Self::NotFound {
            id,
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    pub fn already_exists(id: &'static str, entity_type: &'static str, entity_id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            id,
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    pub fn permission_denied(id: &'static str) -> Self {
        Self::PermissionDenied { id }
    }

    pub fn precondition_failed(id: &'static str, message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            id,
            message: message.into(),
        }
    }

    pub fn deadline_exceeded(operation: &'static str, timeout: Duration) -> Self {
        Self::DeadlineExceeded {
            operation,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            Self::SequenceConflict { .. } => ErrorKind::SequenceConflict,
            Self::Crypto(_) => ErrorKind::CryptoFailure,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::UnknownEventType { .. } | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Stable identifier for translation and client matching.
    pub fn message_id(&self) -> &'static str {
        match self {
            Self::InvalidArgument { id, .. }
            | Self::NotFound { id, .. }
            | Self::AlreadyExists { id, .. }
            | Self::PermissionDenied { id }
            | Self::PreconditionFailed { id, .. } => *id,
            Self::SequenceConflict { .. } => "Errors.Eventstore.SequenceConflict",
            Self::Crypto(_) => "Errors.Crypto.Failure",
            Self::DeadlineExceeded { .. } => "Errors.Eventstore.Timeout",
            Self::UnknownEventType { .. } => "Errors.Eventstore.UnknownEventType",
            Self::Internal { .. } => "Errors.Internal",
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::SequenceConflict
    }
}

impl From<EventStoreError> for PlatformError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::SequenceConflict {
                aggregate_type,
                aggregate_id,
                expected,
                actual,
            } => Self::SequenceConflict {
                aggregate_type,
                aggregate_id,
                expected,
                actual,
            },
            EventStoreError::ResourceOwnerMismatch { aggregate_id, .. } => {
                Self::invalid_argument("Errors.Aggregate.ResourceOwnerMismatch", aggregate_id)
            }
            EventStoreError::UnknownEventType(event_type) => Self::UnknownEventType { event_type },
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
