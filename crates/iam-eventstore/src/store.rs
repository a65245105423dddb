//! Event store contract.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{Aggregate, PendingEvent, Result, StoredEvent};

/// Forward-only stream of one aggregate's events, ordered by sequence.
pub type EventStream = BoxStream<'static, Result<StoredEvent>>;

/// Append-only, per-aggregate event log with optimistic concurrency.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append `events` if the aggregate's latest sequence equals
    /// `expected_sequence`.
    ///
    /// The batch is committed atomically with consecutive sequences and one
    /// creation time. On mismatch nothing is written and
    /// [`EventStoreError::SequenceConflict`](crate::EventStoreError::SequenceConflict)
    /// is returned. An empty batch is a no-op.
    async fn push(
        &self,
        aggregate: &Aggregate,
        expected_sequence: u64,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<StoredEvent>>;

    /// Events with sequence greater than `after_sequence`, scoped to the
    /// aggregate's resource owner.
    async fn query(&self, aggregate: &Aggregate, after_sequence: u64) -> Result<EventStream>;

    /// Latest committed sequence, `0` for an empty stream.
    async fn latest_sequence(&self, aggregate: &Aggregate) -> Result<u64>;
}
