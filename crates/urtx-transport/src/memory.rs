//! In-process link pair.

use std::net::SocketAddr;

use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

use crate::stream::StreamHalves;
use crate::{ConnectionError, ConnectionId, ConnectionTransport, Peer};

/// Default buffer size of each direction of the pair.
const DEFAULT_CAPACITY: usize = 64 * 1024;

/// One end of an in-memory duplex pipe.
///
/// Each end establishes once; the `host` passed to `establish` is only
/// echoed back as the peer address. Closing one end makes the other end's
/// reads report end-of-stream, like a TCP peer going away.
pub struct MemoryTransport {
    pending: Mutex<Option<DuplexStream>>,
    halves: StreamHalves<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>,
}

impl MemoryTransport {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates two connected ends with `capacity` bytes of buffering per
    /// direction. A writer blocks once its direction is full.
    pub fn pair_with_capacity(capacity: usize) -> (Self, Self) {
        let (a, b) = tokio::io::duplex(capacity);
        (Self::from_stream(a), Self::from_stream(b))
    }

    fn from_stream(stream: DuplexStream) -> Self {
        Self {
            pending: Mutex::new(Some(stream)),
            halves: StreamHalves::new(),
        }
    }
}

impl ConnectionTransport for MemoryTransport {
    async fn establish(&self, host: SocketAddr) -> Result<Peer, ConnectionError> {
        let stream = self
            .pending
            .lock()
            .await
            .take()
            .ok_or_else(|| ConnectionError::Refused("in-memory link already used".into()))?;

        let (reader, writer) = tokio::io::split(stream);
        self.halves.attach(reader, writer).await;

        let peer = Peer {
            id: ConnectionId::next(),
            addr: host,
        };
        tracing::debug!(id = %peer.id, "in-memory link established");
        Ok(peer)
    }

    async fn read_exact(&self, len: usize) -> Result<Option<Vec<u8>>, ConnectionError> {
        self.halves.read_exact(len).await
    }

    async fn write_all(&self, data: &[u8]) -> Result<(), ConnectionError> {
        self.halves.write_all(data).await
    }

    async fn close(&self) {
        self.halves.close().await;
    }
}
