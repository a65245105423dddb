//! Aggregate identity.

use serde::{Deserialize, Serialize};

/// Identity of one event stream.
///
/// `resource_owner` is the tenant scope. Every event of a stream carries the
/// same owner, fixed by the first push.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub aggregate_type: String,
    #[serde(rename = "aggregateID")]
    pub id: String,
    pub resource_owner: String,
}

impl Aggregate {
    pub fn new(
        aggregate_type: impl Into<String>,
        id: impl Into<String>,
        resource_owner: impl Into<String>,
    ) -> Self {
        Self {
            aggregate_type: aggregate_type.into(),
            id: id.into(),
            resource_owner: resource_owner.into(),
        }
    }
}

impl std::fmt::Display for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.aggregate_type, self.id, self.resource_owner)
    }
}
