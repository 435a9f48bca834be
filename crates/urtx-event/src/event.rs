//! A single topic: queue, subscribers, and dispatch loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::EventError;

/// A subscriber callback. Receives its own copy of each payload.
pub type Handler<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

type Subscribers<T> = Arc<RwLock<Vec<Handler<T>>>>;

/// One named topic.
///
/// The queue exists from construction, so pushes made before dispatch
/// starts are kept. The receiving end is parked in `rx` until
/// [`EventBus::start`](crate::EventBus::start) moves it onto the dispatch
/// thread.
pub struct Event<T> {
    name: String,
    tx: mpsc::UnboundedSender<T>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<T>>>,
    subscribers: Subscribers<T>,
}

impl<T> Event<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            tx,
            rx: Mutex::new(Some(rx)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueues a payload. Never blocks, so it is safe to call from an
    /// async task.
    ///
    /// # Errors
    /// [`EventError::Closed`] if the dispatch thread has exited.
    pub fn push(&self, payload: T) -> Result<(), EventError> {
        self.tx
            .send(payload)
            .map_err(|_| EventError::Closed(self.name.clone()))
    }

    /// Appends a subscriber. Can be called at any time, before or after
    /// dispatch starts.
    pub fn connect<F>(&self, handler: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Arc::new(handler));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns `true` once the dispatch thread owns the queue.
    pub fn is_running(&self) -> bool {
        self.rx.lock().is_none()
    }

    /// Moves the queue onto a new dispatch thread.
    pub(crate) fn start(&self) -> Result<(), EventError> {
        let rx = self.rx.lock().take().ok_or(EventError::AlreadyStarted)?;
        let name = self.name.clone();
        let subscribers = Arc::clone(&self.subscribers);

        thread::Builder::new()
            .name(format!("urtx-event-{name}"))
            .spawn(move || dispatch_loop(name, rx, subscribers))
            .map_err(EventError::Spawn)?;

        Ok(())
    }
}

/// Runs until every sender is dropped (i.e. the owning `Event` is gone).
fn dispatch_loop<T: Clone>(
    name: String,
    mut rx: mpsc::UnboundedReceiver<T>,
    subscribers: Subscribers<T>,
) {
    tracing::debug!(topic = %name, "dispatch loop started");

    while let Some(payload) = rx.blocking_recv() {
        // Snapshot so handlers can subscribe more handlers without
        // deadlocking on the list.
        let handlers: Vec<Handler<T>> = subscribers.read().clone();
        if handlers.is_empty() {
            tracing::trace!(topic = %name, "no subscribers, payload dropped");
            continue;
        }

        for (index, handler) in handlers.iter().enumerate() {
            let payload = payload.clone();
            if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                tracing::warn!(
                    topic = %name,
                    handler = index,
                    panic = panic_message(cause.as_ref()),
                    "subscriber panicked, continuing"
                );
            }
        }
    }

    tracing::debug!(topic = %name, "dispatch loop stopped");
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_new_event_is_idle() {
        let event: Event<u32> = Event::new("idle");
        assert_eq!(event.name(), "idle");
        assert_eq!(event.subscriber_count(), 0);
        assert!(!event.is_running());
    }

    #[test]
    fn test_start_twice_fails() {
        let event: Event<u32> = Event::new("twice");
        event.start().unwrap();
        assert!(event.is_running());
        assert!(matches!(event.start(), Err(EventError::AlreadyStarted)));
    }

    #[test]
    fn test_dispatch_runs_on_named_thread() {
        let event: Event<u32> = Event::new("named");
        let (tx, rx) = std_mpsc::channel();
        event.connect(move |_| {
            let name = thread::current().name().map(str::to_owned);
            let _ = tx.send(name);
        });
        event.start().unwrap();
        event.push(1).unwrap();

        let name = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(name.as_deref(), Some("urtx-event-named"));
    }

    #[test]
    fn test_panic_message_extracts_strings() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
