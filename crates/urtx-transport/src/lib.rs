//! Connection layer for urtx.
//!
//! Provides the [`ConnectionTransport`] capability: establish one
//! connection, read exactly `n` bytes, write a buffer, close. The `urtx`
//! crate's `Transport` holds one implementation and never cares which:
//!
//! - [`TcpListenTransport`]: bind, listen, accept exactly one peer
//! - [`TcpConnectTransport`]: actively connect to a peer
//! - [`MemoryTransport`]: an in-process pair, for tests and local wiring

mod config;
mod error;
mod memory;
mod stream;
mod tcp;

pub use config::TransportConfig;
pub use error::ConnectionError;
pub use memory::MemoryTransport;
pub use tcp::{TcpConnectTransport, TcpListenTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for an established connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The far end of an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub id: ConnectionId,
    pub addr: SocketAddr,
}

/// How a transport reaches its single peer and moves bytes.
///
/// One implementation is picked when the transport is built. Reads come
/// only from the receive task; writes may come from many callers and are
/// serialised by the implementation.
pub trait ConnectionTransport: Send + Sync + 'static {
    /// Establishes the connection to (or from) `host`.
    fn establish(
        &self,
        host: SocketAddr,
    ) -> impl Future<Output = Result<Peer, ConnectionError>> + Send;

    /// Reads exactly `len` bytes.
    ///
    /// Returns `Ok(None)` when the peer closed before sending anything,
    /// and a shorter buffer when it closed partway through.
    fn read_exact(
        &self,
        len: usize,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, ConnectionError>> + Send;

    /// Writes the whole buffer. Concurrent callers are serialised; one
    /// call's bytes are never interleaved with another's.
    fn write_all(&self, data: &[u8]) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Releases the connection. Idempotent.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }
}
