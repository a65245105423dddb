//! In-memory event store.
//!
//! One entry per aggregate stream in a `DashMap`. The shard lock is held only
//! while comparing and appending, never across an await.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::{Aggregate, EventStore, EventStoreError, EventStream, PendingEvent, Result, StoredEvent};

type StreamKey = (String, String);

#[derive(Debug)]
struct AggregateStream {
    resource_owner: String,
    events: Vec<StoredEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    streams: Arc<DashMap<StreamKey, AggregateStream>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams holding at least one event.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    fn key(aggregate: &Aggregate) -> StreamKey {
        (aggregate.aggregate_type.clone(), aggregate.id.clone())
    }

    /// Committed length of the stream as seen by `aggregate`'s owner.
    fn visible_len(&self, aggregate: &Aggregate) -> u64 {
        match self.streams.get(&Self::key(aggregate)) {
            Some(s) if s.resource_owner == aggregate.resource_owner => s.events.len() as u64,
            _ => 0,
        }
    }
}

fn check_expected(aggregate: &Aggregate, expected: u64, actual: u64) -> Result<()> {
    if actual == expected {
        return Ok(());
    }
    Err(EventStoreError::SequenceConflict {
        aggregate_type: aggregate.aggregate_type.clone(),
        aggregate_id: aggregate.id.clone(),
        expected,
        actual,
    })
}

/// Assign consecutive sequences after `actual` and one commit time.
fn stamp(aggregate: &Aggregate, actual: u64, events: Vec<PendingEvent>) -> Vec<StoredEvent> {
    let creation_time = Utc::now();
    events
        .into_iter()
        .enumerate()
        .map(|(offset, event)| StoredEvent {
            aggregate_type: aggregate.aggregate_type.clone(),
            aggregate_id: aggregate.id.clone(),
            resource_owner: aggregate.resource_owner.clone(),
            sequence: actual + 1 + offset as u64,
            creation_time,
            editor_id: event.editor_id,
            event_type: event.event_type,
            payload: event.payload,
        })
        .collect()
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn push(
        &self,
        aggregate: &Aggregate,
        expected_sequence: u64,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<StoredEvent>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let committed = match self.streams.entry(Self::key(aggregate)) {
            Entry::Occupied(mut entry) => {
                let stream = entry.get_mut();
                if stream.resource_owner != aggregate.resource_owner {
                    return Err(EventStoreError::ResourceOwnerMismatch {
                        aggregate_type: aggregate.aggregate_type.clone(),
                        aggregate_id: aggregate.id.clone(),
                    });
                }
                let actual = stream.events.len() as u64;
                check_expected(aggregate, expected_sequence, actual)?;
                let committed = stamp(aggregate, actual, events);
                stream.events.extend(committed.iter().cloned());
                committed
            }
            // A stream only exists once something was committed to it.
            Entry::Vacant(entry) => {
                check_expected(aggregate, expected_sequence, 0)?;
                let committed = stamp(aggregate, 0, events);
                entry.insert(AggregateStream {
                    resource_owner: aggregate.resource_owner.clone(),
                    events: committed.clone(),
                });
                committed
            }
        };
        let actual = committed[0].sequence - 1;

        debug!(
            aggregate = %aggregate,
            first_sequence = actual + 1,
            count = committed.len(),
            "Events appended"
        );
        Ok(committed)
    }

    async fn query(&self, aggregate: &Aggregate, after_sequence: u64) -> Result<EventStream> {
        // Bound the scan to what is committed now so the stream is finite.
        let upper = self.visible_len(aggregate);
        let streams = Arc::clone(&self.streams);
        let key = Self::key(aggregate);

        let events = stream::unfold(after_sequence, move |cursor| {
            let streams = Arc::clone(&streams);
            let key = key.clone();
            async move {
                if cursor >= upper {
                    return None;
                }
                let event = streams
                    .get(&key)
                    .and_then(|s| s.events.get(cursor as usize).cloned());
                match event {
                    Some(event) => Some((Ok(event), cursor + 1)),
                    None => Some((
                        Err(EventStoreError::Storage(format!(
                            "stream {}:{} lost sequence {}",
                            key.0,
                            key.1,
                            cursor + 1
                        ))),
                        upper,
                    )),
                }
            }
        });
        Ok(events.boxed())
    }

    async fn latest_sequence(&self, aggregate: &Aggregate) -> Result<u64> {
        Ok(self.visible_len(aggregate))
    }
}
