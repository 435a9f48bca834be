//! Topic-based event bus for urtx.
//!
//! Each topic ([`Event`]) owns a FIFO queue, a subscriber list, and one
//! dispatch thread. Producers [`push`](Event::push) from wherever they
//! run (typically the transport's receive task); subscribers are invoked
//! on the topic's own thread, never on the producer's.
//!
//! # Key types
//!
//! - [`Event`]: one topic, with its queue, subscribers, and dispatch loop
//! - [`EventBus`]: owns a fixed set of topics keyed by `K`
//! - [`Handler`]: a subscriber callback
//!
//! # Delivery rules
//!
//! - Per topic, payloads are dispatched in push order. Across topics there
//!   is no ordering.
//! - Subscribers run in subscription order, each with its own clone of the
//!   payload.
//! - A panicking subscriber is logged and skipped; the rest of the
//!   subscribers and later payloads are unaffected.
//! - Payloads pushed before [`EventBus::start`] wait in the queue and go to
//!   whoever has subscribed by the time dispatch starts. Once dispatch is
//!   running, a payload that finds no subscribers is dropped.

mod bus;
mod error;
mod event;

pub use bus::EventBus;
pub use error::EventError;
pub use event::{Event, Handler};
