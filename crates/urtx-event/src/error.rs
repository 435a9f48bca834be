//! Error types for the event layer.

/// Errors that can occur while registering topics, subscribing, or
/// publishing.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// No topic with this name is registered.
    #[error("no such topic: {0}")]
    UnknownTopic(String),

    /// The topic is already registered on this bus.
    #[error("topic {0} already registered")]
    DuplicateTopic(String),

    /// Topics can only be added, and dispatch only started, once.
    #[error("event bus already started")]
    AlreadyStarted,

    /// The topic's dispatch side is gone.
    #[error("topic {0} is closed")]
    Closed(String),

    /// The dispatch thread could not be spawned.
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[source] std::io::Error),
}
