//! Unified error type for urtx.

use urtx_event::EventError;
use urtx_protocol::ProtocolError;
use urtx_transport::ConnectionError;

/// Top-level error that wraps all crate-specific errors.
///
/// Operations that cross layers (sending encodes then writes; building
/// starts the event bus) return this. Operations confined to one layer
/// return that layer's error directly.
#[derive(Debug, thiserror::Error)]
pub enum UrtxError {
    /// Connection-level failure (connect, send, receive).
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Schema or framing violation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Event bus failure (unknown topic, dispatch gone).
    #[error(transparent)]
    Event(#[from] EventError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use urtx_protocol::Descriptor;

    #[test]
    fn test_from_connection_error() {
        let err: UrtxError = ConnectionError::Refused("busy".into()).into();
        assert!(matches!(err, UrtxError::Connection(_)));
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: UrtxError = ProtocolError::UnknownDescriptor(Descriptor(9)).into();
        assert!(matches!(err, UrtxError::Protocol(_)));
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn test_from_event_error() {
        let err: UrtxError = EventError::UnknownTopic("7".into()).into();
        assert!(matches!(err, UrtxError::Event(_)));
    }
}
