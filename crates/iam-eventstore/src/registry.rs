//! Event type registry.
//!
//! Maps event tags to decoders. Built once at start-up and shared by `Arc`
//! with every reader; there is no global registration.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::{EventStoreError, Result, StoredEvent};

type Decoder<E> = Box<dyn Fn(&StoredEvent) -> Result<E> + Send + Sync>;

pub struct EventRegistry<E> {
    decoders: HashMap<String, Decoder<E>>,
}

impl<E> EventRegistry<E> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn is_registered(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Registered tags in lexical order.
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn decode(&self, event: &StoredEvent) -> Result<E> {
        let decoder = self
            .decoders
            .get(&event.event_type)
            .ok_or_else(|| EventStoreError::UnknownEventType(event.event_type.clone()))?;
        decoder(event)
    }
}

impl<E: 'static> EventRegistry<E> {
    /// Register a decoder for `event_type`.
    ///
    /// # Panics
    ///
    /// Panics if the tag is already registered.
    pub fn register<F>(&mut self, event_type: impl Into<String>, decoder: F) -> &mut Self
    where
        F: Fn(&StoredEvent) -> Result<E> + Send + Sync + 'static,
    {
        let event_type = event_type.into();
        if self.decoders.contains_key(&event_type) {
            panic!("event type {} registered twice", event_type);
        }
        self.decoders.insert(event_type, Box::new(decoder));
        self
    }

    /// Register a tag whose payload deserializes into `P`, wrapped by `wrap`.
    pub fn register_payload<P, W>(&mut self, event_type: impl Into<String>, wrap: W) -> &mut Self
    where
        P: DeserializeOwned + 'static,
        W: Fn(P) -> E + Send + Sync + 'static,
    {
        self.register(event_type, move |event| event.payload_as::<P>().map(&wrap))
    }
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("event_types", &self.event_types())
            .finish()
    }
}
