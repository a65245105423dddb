//! Write models.
//!
//! A write model is the minimal state a command needs, folded from one
//! aggregate's stream. Folding is pure: the change date comes from the
//! events, never from the clock.

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use tracing::{debug, trace};

use crate::{Aggregate, EventRegistry, EventStore, Result, StoredEvent};

/// State reduction for one kind of write model.
pub trait Reducer: Send + Sync {
    /// Decoded event type produced by the registry.
    type Event;

    /// Whether events with this tag change the state.
    fn handles(&self, event_type: &str) -> bool;

    fn reduce(&mut self, event: &StoredEvent, data: &Self::Event);
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteModel<R> {
    pub aggregate: Aggregate,
    /// Sequence of the last event folded in; the next expected sequence.
    pub processed_sequence: u64,
    pub change_date: Option<DateTime<Utc>>,
    pub state: R,
}

impl<R: Reducer> WriteModel<R> {
    pub fn new(aggregate: Aggregate, state: R) -> Self {
        Self {
            aggregate,
            processed_sequence: 0,
            change_date: None,
            state,
        }
    }

    /// Whether any event has been folded in.
    pub fn exists(&self) -> bool {
        self.processed_sequence > 0
    }

    /// Fold one event.
    ///
    /// Events at or below `processed_sequence` are ignored. Tags the reducer
    /// does not handle are skipped without decoding but still advance the
    /// sequence.
    pub fn apply(&mut self, registry: &EventRegistry<R::Event>, event: &StoredEvent) -> Result<()> {
        if event.sequence <= self.processed_sequence {
            trace!(
                sequence = event.sequence,
                processed = self.processed_sequence,
                "Ignoring already processed event"
            );
            return Ok(());
        }

        if self.state.handles(&event.event_type) {
            let data = registry.decode(event)?;
            self.state.reduce(event, &data);
        } else {
            debug!(
                event_type = %event.event_type,
                sequence = event.sequence,
                "Skipping unhandled event"
            );
        }

        self.processed_sequence = event.sequence;
        self.change_date = Some(event.creation_time);
        Ok(())
    }

    pub fn reduce<'a, I>(mut self, registry: &EventRegistry<R::Event>, events: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a StoredEvent>,
    {
        for event in events {
            self.apply(registry, event)?;
        }
        Ok(self)
    }

    /// Fold every event committed after `processed_sequence`.
    pub async fn load(
        mut self,
        store: &dyn EventStore,
        registry: &EventRegistry<R::Event>,
    ) -> Result<Self> {
        let mut events = store.query(&self.aggregate, self.processed_sequence).await?;
        while let Some(event) = events.try_next().await? {
            self.apply(registry, &event)?;
        }
        Ok(self)
    }
}
