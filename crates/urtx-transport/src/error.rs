//! Error types for the connection layer.

use std::net::SocketAddr;

/// Errors that can occur while establishing or using a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// `connect` was called while connecting or connected.
    #[error("already connected")]
    AlreadyConnected,

    /// The operation needs an established connection.
    #[error("not connected")]
    NotConnected,

    /// The transport has exited and will not connect again.
    #[error("transport has exited")]
    Exited,

    /// `disconnect` was called while the connection was being established.
    #[error("connection attempt aborted")]
    Aborted,

    /// Host name resolution failed.
    #[error("failed to resolve host: {0}")]
    Resolve(#[source] std::io::Error),

    /// Host name resolution produced no addresses.
    #[error("host resolved to no addresses")]
    NoAddress,

    /// Creating, binding, or listening on the server socket failed.
    #[error("failed to listen on {host}: {source}")]
    Bind {
        host: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Accepting the peer failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The active connect failed (refused, unreachable, ...).
    #[error("failed to connect to {host}: {source}")]
    ConnectFailed {
        host: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The active connect did not complete in time.
    #[error("timed out connecting to {0}")]
    Timeout(SocketAddr),

    /// The link refused to establish for a non-I/O reason.
    #[error("connection refused: {0}")]
    Refused(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
