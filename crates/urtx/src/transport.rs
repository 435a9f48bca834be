//! The transport: connection state machine, receive loop, and event bus.
//!
//! This is where the layers meet. A [`Transport`] owns one link (any
//! [`ConnectionTransport`]), a [`PackageCodec`], and an [`EventBus`] keyed
//! by [`Topic`]. Bytes come in on the link, the receive task turns them
//! into [`Package`]s, and the bus hands those to subscribers on their
//! topics' dispatch threads.
//!
//! ```text
//! link.read_exact ──→ codec ──→ bus.push(AnyPackage) ──→ handlers
//!                            └─→ bus.push(Descriptor(d)) ──→ handlers
//!
//! send_package ──→ codec.encode ──→ link.write_all
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::{ToSocketAddrs, lookup_host};
use tokio::sync::watch;
use urtx_event::{EventBus, EventError};
use urtx_protocol::{Descriptor, Package, PackageCodec, SchemaRegistry};
use urtx_transport::{ConnectionError, ConnectionTransport, Peer};

use crate::{Topic, UrtxError};

/// Where a transport is in its connection lifecycle.
///
/// ```text
/// Disconnected ──connect──→ Connecting ──established──→ Connected
///      ↑                        │                           │
///      └────── failure / disconnect / peer gone ────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// State shared between the handle and its receive task.
struct Shared<L> {
    link: L,
    codec: PackageCodec,
    bus: EventBus<Topic, Package>,
    state: watch::Sender<ConnectionState>,
    /// One-way latch: once `true`, never `false` again.
    exit: watch::Sender<bool>,
    /// Bumped by every disconnect. A connect attempt remembers the value it
    /// started under and gives up as soon as it moves.
    epoch: watch::Sender<u64>,
    /// Held for the whole of one establishment, so an aborted attempt has
    /// released the link before the next one touches it.
    establishing: tokio::sync::Mutex<()>,
    /// Held by a disconnect until the link is closed. A connect claims the
    /// state under it, so that close never lands on the new connection.
    teardown: tokio::sync::Mutex<()>,
    host: Mutex<Option<SocketAddr>>,
}

/// A point-to-point package transport over one link.
///
/// Built with [`TransportBuilder`](crate::TransportBuilder), or
/// [`Transport::new`] for a custom link. Construction spawns the receive
/// task, which idles until the transport is connected. Handles are not
/// `Clone`; share one behind an `Arc` if several tasks need it.
///
/// Dropping the transport sets the exit latch, which stops the receive
/// task and releases the link.
///
/// ## Example
///
/// ```rust,no_run
/// use urtx::prelude::*;
///
/// # async fn run() -> Result<(), UrtxError> {
/// let client = TransportBuilder::new().build_client()?;
/// client.on_descriptor(Descriptor(0), |package| {
///     println!("got {:?}", package.fields());
/// })?;
///
/// client.connect("127.0.0.1:9090").await?;
/// client.send_package(Descriptor(0), &[5]).await?;
/// # Ok(())
/// # }
/// ```
pub struct Transport<L> {
    shared: Arc<Shared<L>>,
}

impl<L: ConnectionTransport> Transport<L> {
    /// Wires `link` to a fresh event bus with one topic per descriptor in
    /// `registry`, plus [`Topic::AnyPackage`], and spawns the receive task.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn new(link: L, registry: Arc<SchemaRegistry>) -> Result<Self, EventError> {
        let mut bus = EventBus::new();
        bus.append(Topic::AnyPackage)?;
        for descriptor in registry.descriptors() {
            bus.append(Topic::Descriptor(descriptor))?;
        }
        bus.start()?;

        let shared = Arc::new(Shared {
            link,
            codec: PackageCodec::new(registry),
            bus,
            state: watch::Sender::new(ConnectionState::Disconnected),
            exit: watch::Sender::new(false),
            epoch: watch::Sender::new(0),
            establishing: tokio::sync::Mutex::new(()),
            teardown: tokio::sync::Mutex::new(()),
            host: Mutex::new(None),
        });

        tokio::spawn(receive_loop(Arc::clone(&shared)));

        Ok(Self { shared })
    }

    /// Establishes the connection to (or, for a server, from) `host`.
    ///
    /// Resolves `host`, then hands the first address to the link. A
    /// [`disconnect`](Self::disconnect) while this is pending aborts it.
    ///
    /// # Errors
    /// - [`ConnectionError::Exited`] once [`exit`](Self::exit) was called.
    /// - [`ConnectionError::AlreadyConnected`] while connecting or connected.
    /// - [`ConnectionError::Aborted`] if disconnected while pending.
    /// - Whatever resolution or the link reports. The state is back to
    ///   [`ConnectionState::Disconnected`] on every error except
    ///   `AlreadyConnected`.
    pub async fn connect(&self, host: impl ToSocketAddrs) -> Result<(), ConnectionError> {
        if self.exit_requested() {
            return Err(ConnectionError::Exited);
        }

        let teardown = self.shared.teardown.lock().await;
        let mut attempt = None;
        self.shared.state.send_if_modified(|state| {
            if *state != ConnectionState::Disconnected {
                return false;
            }
            *state = ConnectionState::Connecting;
            attempt = Some(*self.shared.epoch.borrow());
            true
        });
        drop(teardown);
        let Some(attempt) = attempt else {
            return Err(ConnectionError::AlreadyConnected);
        };

        match self.establish(host, attempt).await {
            Ok((addr, peer)) => {
                tracing::info!(host = %addr, peer = %peer.addr, id = %peer.id, "connected");
                Ok(())
            }
            Err(e) => {
                // A disconnect since the attempt started owns the state now,
                // and a newer attempt may already have claimed it.
                self.shared.state.send_if_modified(|state| {
                    let ours = *state == ConnectionState::Connecting
                        && *self.shared.epoch.borrow() == attempt;
                    if ours {
                        *state = ConnectionState::Disconnected;
                    }
                    ours
                });
                tracing::warn!(error = %e, "connect failed");
                Err(e)
            }
        }
    }

    async fn establish(
        &self,
        host: impl ToSocketAddrs,
        attempt: u64,
    ) -> Result<(SocketAddr, Peer), ConnectionError> {
        let mut epoch = self.shared.epoch.subscribe();
        let mut exit = self.shared.exit.subscribe();

        let _establishing = tokio::select! {
            guard = self.shared.establishing.lock() => guard,
            _ = until_epoch_moves(&mut epoch, attempt) => return Err(ConnectionError::Aborted),
            _ = until_exit(&mut exit) => return Err(ConnectionError::Exited),
        };

        let outcome = tokio::select! {
            result = self.resolve_and_establish(host) => result,
            _ = until_epoch_moves(&mut epoch, attempt) => Err(ConnectionError::Aborted),
            _ = until_exit(&mut exit) => Err(ConnectionError::Exited),
        };
        let (addr, peer) = match outcome {
            Ok(linked) => linked,
            Err(e) => {
                self.shared.link.close().await;
                return Err(e);
            }
        };

        *self.shared.host.lock() = Some(addr);
        let connected = self.shared.state.send_if_modified(|state| {
            let ours = *state == ConnectionState::Connecting
                && *self.shared.epoch.borrow() == attempt;
            if ours {
                *state = ConnectionState::Connected;
            }
            ours
        });
        if !connected {
            self.shared.host.lock().take();
            self.shared.link.close().await;
            return Err(ConnectionError::Aborted);
        }

        Ok((addr, peer))
    }

    async fn resolve_and_establish(
        &self,
        host: impl ToSocketAddrs,
    ) -> Result<(SocketAddr, Peer), ConnectionError> {
        let addr = lookup_host(host)
            .await
            .map_err(ConnectionError::Resolve)?
            .next()
            .ok_or(ConnectionError::NoAddress)?;

        tracing::info!(host = %addr, "connecting");
        let peer = self.shared.link.establish(addr).await?;
        Ok((addr, peer))
    }

    /// Drops the connection. Idempotent; never fails.
    ///
    /// A read pending in the receive task is cancelled, and the task goes
    /// back to waiting for the next connection.
    pub async fn disconnect(&self) {
        self.shared.disconnect().await;
    }

    /// Sets the exit latch. The receive task stops as soon as it observes
    /// it, even mid-read, and the transport will refuse to connect again.
    pub fn exit(&self) {
        if !self.shared.exit.send_replace(true) {
            tracing::debug!("exit requested");
        }
    }

    /// Encodes a package and writes it to the peer.
    ///
    /// Concurrent senders are serialised; each frame goes out whole.
    ///
    /// # Errors
    /// - [`UrtxError::Protocol`] if `fields` don't fit the descriptor's
    ///   schema. Checked before anything else.
    /// - [`ConnectionError::NotConnected`] unless connected.
    /// - [`ConnectionError::SendFailed`] if the write fails.
    pub async fn send_package(&self, descriptor: Descriptor, fields: &[i64]) -> Result<(), UrtxError> {
        let frame = self.shared.codec.encode(descriptor, fields)?;

        if !self.is_connected() {
            return Err(ConnectionError::NotConnected.into());
        }

        if let Err(e) = self.shared.link.write_all(&frame).await {
            tracing::warn!(%descriptor, error = %e, "send failed");
            return Err(e.into());
        }

        tracing::debug!(%descriptor, bytes = frame.len(), "package sent");
        Ok(())
    }

    /// Subscribes `handler` to `topic`.
    ///
    /// Handlers run on the topic's dispatch thread, in subscription order,
    /// each with its own copy of the package. A handler that panics is
    /// logged and skipped; the others still run.
    ///
    /// # Errors
    /// [`EventError::UnknownTopic`] if `topic` names a descriptor that is
    /// not in the registry.
    pub fn subscribe<F>(&self, topic: impl Into<Topic>, handler: F) -> Result<(), EventError>
    where
        F: Fn(Package) + Send + Sync + 'static,
    {
        self.shared.bus.connect(&topic.into(), handler)
    }

    /// Subscribes to every package.
    pub fn on_package<F>(&self, handler: F) -> Result<(), EventError>
    where
        F: Fn(Package) + Send + Sync + 'static,
    {
        self.subscribe(Topic::AnyPackage, handler)
    }

    /// Subscribes to packages with one descriptor.
    pub fn on_descriptor<F>(&self, descriptor: Descriptor, handler: F) -> Result<(), EventError>
    where
        F: Fn(Package) + Send + Sync + 'static,
    {
        self.subscribe(Topic::Descriptor(descriptor), handler)
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// The resolved address of the current connection, if any.
    pub fn host(&self) -> Option<SocketAddr> {
        *self.shared.host.lock()
    }

    pub fn exit_requested(&self) -> bool {
        *self.shared.exit.borrow()
    }

    /// A receiver that sees every state change, e.g. to react when the
    /// peer goes away.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// The schema set this transport encodes and decodes with.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        self.shared.codec.registry()
    }

    /// The underlying link.
    pub fn link(&self) -> &L {
        &self.shared.link
    }
}

impl<L> Drop for Transport<L> {
    fn drop(&mut self) {
        self.shared.exit.send_replace(true);
    }
}

impl<L: ConnectionTransport> Shared<L> {
    async fn disconnect(&self) {
        let _teardown = self.teardown.lock().await;
        let previous = self.state.send_replace(ConnectionState::Disconnected);
        self.epoch.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
        let host = self.host.lock().take();
        self.link.close().await;
        if previous != ConnectionState::Disconnected {
            tracing::info!(host = ?host, "disconnected");
        }
    }

    /// Reads one package. `Ok(None)` means the peer closed cleanly
    /// between packages.
    async fn read_package(&self) -> Result<Option<Package>, UrtxError> {
        let Some(header) = self.link.read_exact(self.codec.header_len()).await? else {
            return Ok(None);
        };
        let descriptor = self.codec.decode_header(&header)?;
        let payload_len = self.codec.payload_len(descriptor)?;
        let payload = self
            .link
            .read_exact(payload_len)
            .await?
            .unwrap_or_default();
        Ok(Some(self.codec.decode_payload(descriptor, &payload)?))
    }

    fn publish(&self, package: Package) -> Result<(), EventError> {
        let topic = Topic::Descriptor(package.descriptor());
        self.bus.push(&Topic::AnyPackage, package.clone())?;
        self.bus.push(&topic, package)
    }

    /// Reads and publishes until the peer closes or something breaks.
    async fn pump(&self) -> Result<(), UrtxError> {
        loop {
            let Some(package) = self.read_package().await? else {
                return Ok(());
            };
            tracing::debug!(descriptor = %package.descriptor(), "package received");
            self.publish(package)?;
        }
    }
}

async fn until_exit(exit: &mut watch::Receiver<bool>) {
    let _ = exit.wait_for(|exit| *exit).await;
}

async fn until_epoch_moves(epoch: &mut watch::Receiver<u64>, attempt: u64) {
    let _ = epoch.wait_for(|epoch| *epoch != attempt).await;
}

async fn until_state<F>(state: &mut watch::Receiver<ConnectionState>, f: F)
where
    F: FnMut(&ConnectionState) -> bool,
{
    let _ = state.wait_for(f).await;
}

/// The receive task. Lives as long as the transport.
///
/// While disconnected it waits for a connection. While connected it
/// races the read against the exit latch and a local disconnect, so
/// either one interrupts a blocked read. When the stream itself ends or
/// fails, the transport is shut down for good: exit is latched and the
/// link released.
async fn receive_loop<L: ConnectionTransport>(shared: Arc<Shared<L>>) {
    let mut exit = shared.exit.subscribe();
    let mut state = shared.state.subscribe();
    tracing::debug!("receive loop started");

    loop {
        tokio::select! {
            biased;
            _ = until_exit(&mut exit) => break,
            _ = until_state(&mut state, |s| *s == ConnectionState::Connected) => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = until_exit(&mut exit) => break,
            _ = until_state(&mut state, |s| *s != ConnectionState::Connected) => {
                tracing::debug!("connection dropped locally, receive paused");
                continue;
            }
            outcome = shared.pump() => outcome,
        };

        match outcome {
            Ok(()) => tracing::warn!("peer closed the connection"),
            Err(e) => tracing::warn!(error = %e, "receive failed, dropping connection"),
        }
        shared.exit.send_replace(true);
        shared.disconnect().await;
    }

    tracing::debug!("receive loop stopped");
}
