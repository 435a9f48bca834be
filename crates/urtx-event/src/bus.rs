//! The event bus: a fixed set of topics with one dispatch thread each.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use crate::{Event, EventError};

/// Owns every topic of one component.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ append(topic)* ──→ start() ──→ push / connect ... ──→ drop
/// ```
///
/// Topics are registered up front and the set is frozen by
/// [`start`](Self::start). Dropping the bus drops every queue sender,
/// which ends the dispatch threads once they drain.
///
/// One thread per topic is fine for the handful of topics a transport
/// registers (one catch-all plus one per descriptor). Each topic getting
/// its own thread also means a slow subscriber only delays its own
/// topic.
pub struct EventBus<K, T> {
    events: HashMap<K, Event<T>>,
    started: bool,
}

impl<K, T> EventBus<K, T>
where
    K: Eq + Hash + Display,
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            events: HashMap::new(),
            started: false,
        }
    }

    /// Registers a topic. Its event is named after `key`'s `Display`.
    ///
    /// # Errors
    /// - [`EventError::AlreadyStarted`] after [`start`](Self::start).
    /// - [`EventError::DuplicateTopic`] if `key` is already registered.
    pub fn append(&mut self, key: K) -> Result<(), EventError> {
        if self.started {
            return Err(EventError::AlreadyStarted);
        }
        if self.events.contains_key(&key) {
            return Err(EventError::DuplicateTopic(key.to_string()));
        }
        let event = Event::new(key.to_string());
        self.events.insert(key, event);
        Ok(())
    }

    /// Launches one dispatch thread per registered topic.
    pub fn start(&mut self) -> Result<(), EventError> {
        if self.started {
            return Err(EventError::AlreadyStarted);
        }
        // Topics launched before a failure keep running, so the bus counts
        // as started either way.
        self.started = true;
        for event in self.events.values() {
            event.start()?;
        }
        tracing::debug!(topics = self.events.len(), "event bus started");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Enqueues `payload` on the topic `key`.
    pub fn push(&self, key: &K, payload: T) -> Result<(), EventError> {
        self.event(key)?.push(payload)
    }

    /// Subscribes `handler` to the topic `key`.
    ///
    /// # Errors
    /// [`EventError::UnknownTopic`] if `key` was never registered.
    pub fn connect<F>(&self, key: &K, handler: F) -> Result<(), EventError>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.event(key)?.connect(handler);
        Ok(())
    }

    /// Looks up a topic.
    pub fn event(&self, key: &K) -> Result<&Event<T>, EventError> {
        self.events
            .get(key)
            .ok_or_else(|| EventError::UnknownTopic(key.to_string()))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.events.contains_key(key)
    }

    /// Registered topic keys, in no particular order.
    pub fn topics(&self) -> impl Iterator<Item = &K> {
        self.events.keys()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<K, T> Default for EventBus<K, T>
where
    K: Eq + Hash + Display,
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
