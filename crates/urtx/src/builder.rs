//! `TransportBuilder`: picks the link and schema set for a [`Transport`].

use std::sync::Arc;

use urtx_protocol::SchemaRegistry;
use urtx_transport::{ConnectionTransport, TcpConnectTransport, TcpListenTransport, TransportConfig};

use crate::{Transport, UrtxError};

/// A transport that listens and accepts exactly one peer.
pub type ServerTransport = Transport<TcpListenTransport>;

/// A transport that actively connects to its peer.
pub type ClientTransport = Transport<TcpConnectTransport>;

/// Builder for [`Transport`]s.
///
/// Defaults to [`SchemaRegistry::standard`] and
/// [`TransportConfig::default`].
///
/// # Example
///
/// ```rust,no_run
/// use urtx::prelude::*;
///
/// # async fn run() -> Result<(), UrtxError> {
/// let registry = SchemaRegistry::builder()
///     .register(Descriptor(7), FieldSchema::new(vec![FieldType::U8, FieldType::I64]))
///     .build()?;
///
/// let server = TransportBuilder::new()
///     .registry(registry)
///     .build_server()?;
/// server.connect("0.0.0.0:9090").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransportBuilder {
    registry: Arc<SchemaRegistry>,
    config: TransportConfig,
}

impl TransportBuilder {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SchemaRegistry::standard()),
            config: TransportConfig::default(),
        }
    }

    /// Sets the schema set. Both peers must use the same one.
    pub fn registry(mut self, registry: impl Into<Arc<SchemaRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Sets the TCP link settings.
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the listening side.
    pub fn build_server(self) -> Result<ServerTransport, UrtxError> {
        let link = TcpListenTransport::new(self.config.clone());
        self.build_with(link)
    }

    /// Builds the connecting side.
    pub fn build_client(self) -> Result<ClientTransport, UrtxError> {
        let link = TcpConnectTransport::new(self.config.clone());
        self.build_with(link)
    }

    /// Builds a transport over any link, e.g. one end of a
    /// [`MemoryTransport`](urtx_transport::MemoryTransport) pair.
    ///
    /// The builder's [`TransportConfig`] only applies to the TCP links.
    pub fn build_with<L: ConnectionTransport>(self, link: L) -> Result<Transport<L>, UrtxError> {
        Ok(Transport::new(link, self.registry)?)
    }
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
