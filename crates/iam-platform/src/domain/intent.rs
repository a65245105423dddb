//! Federation intent state.

use serde::{Deserialize, Serialize};

/// Lifecycle of one federation attempt.
///
/// `Started` moves to exactly one terminal state and never changes again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentState {
    #[default]
    Unspecified,
    Started,
    Succeeded,
    Failed,
}

impl IntentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}
