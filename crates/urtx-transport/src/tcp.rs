//! TCP links: listen-and-accept for the server side, active connect for
//! the client side.

use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::watch;

use crate::stream::StreamHalves;
use crate::{ConnectionError, ConnectionId, ConnectionTransport, Peer, TransportConfig};

type TcpHalves = StreamHalves<OwnedReadHalf, OwnedWriteHalf>;

/// Splits an established stream into the link's halves.
async fn attach(
    halves: &TcpHalves,
    stream: TcpStream,
    addr: SocketAddr,
    config: &TransportConfig,
) -> Peer {
    if let Err(e) = stream.set_nodelay(config.nodelay) {
        tracing::debug!(%addr, error = %e, "failed to set TCP_NODELAY");
    }
    let (reader, writer) = stream.into_split();
    halves.attach(reader, writer).await;
    Peer {
        id: ConnectionId::next(),
        addr,
    }
}

// ---------------------------------------------------------------------------
// Server side
// ---------------------------------------------------------------------------

/// Binds to the host, accepts exactly one peer, then stops listening.
///
/// Further connection attempts are refused by the OS until this link is
/// closed and established again.
pub struct TcpListenTransport {
    config: TransportConfig,
    halves: TcpHalves,
    bound: watch::Sender<Option<SocketAddr>>,
}

impl TcpListenTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            halves: StreamHalves::new(),
            bound: watch::Sender::new(None),
        }
    }

    /// The address the socket is listening on, once it is.
    ///
    /// Useful when binding to port 0: wait for `Some` to learn the port
    /// the OS picked while `establish` is still waiting for a peer.
    pub fn bound_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.bound.subscribe()
    }

    fn listen(&self, host: SocketAddr) -> Result<tokio::net::TcpListener, ConnectionError> {
        let bind_err = |source| ConnectionError::Bind { host, source };
        let socket = if host.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(host).map_err(bind_err)?;
        socket.listen(self.config.backlog).map_err(bind_err)
    }
}

impl ConnectionTransport for TcpListenTransport {
    async fn establish(&self, host: SocketAddr) -> Result<Peer, ConnectionError> {
        let listener = self.listen(host)?;
        let local = listener.local_addr().unwrap_or(host);
        self.bound.send_replace(Some(local));
        tracing::info!(%local, backlog = self.config.backlog, "listening for a peer");

        let accepted = listener.accept().await;
        self.bound.send_replace(None);
        let (stream, addr) = accepted.map_err(ConnectionError::AcceptFailed)?;

        // `listener` drops here: only the accepted peer is serviced.
        let peer = attach(&self.halves, stream, addr, &self.config).await;
        tracing::info!(id = %peer.id, peer = %peer.addr, "accepted peer");
        Ok(peer)
    }

    async fn read_exact(&self, len: usize) -> Result<Option<Vec<u8>>, ConnectionError> {
        self.halves.read_exact(len).await
    }

    async fn write_all(&self, data: &[u8]) -> Result<(), ConnectionError> {
        self.halves.write_all(data).await
    }

    async fn close(&self) {
        // An abandoned `establish` leaves its address published.
        self.bound.send_replace(None);
        self.halves.close().await;
    }
}

// ---------------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------------

/// Connects to the host, bounded by [`TransportConfig::connect_timeout`].
pub struct TcpConnectTransport {
    config: TransportConfig,
    halves: TcpHalves,
}

impl TcpConnectTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            halves: StreamHalves::new(),
        }
    }
}

impl ConnectionTransport for TcpConnectTransport {
    async fn establish(&self, host: SocketAddr) -> Result<Peer, ConnectionError> {
        let stream = match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(host))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ConnectionError::ConnectFailed { host, source }),
            Err(_) => return Err(ConnectionError::Timeout(host)),
        };

        let peer = attach(&self.halves, stream, host, &self.config).await;
        tracing::info!(id = %peer.id, peer = %peer.addr, "connected");
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
