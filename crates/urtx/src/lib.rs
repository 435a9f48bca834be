//! # urtx
//!
//! Point-to-point binary transport for fixed-schema packages.
//!
//! One [`Transport`] talks to exactly one peer over a reliable byte
//! stream. Outgoing packages are encoded against a shared
//! [`SchemaRegistry`]; incoming ones are decoded by a background task and
//! published on an event bus, where each topic has its own dispatch
//! thread, so a slow subscriber never stalls the socket.
//!
//! The layers live in their own crates and are re-exported here:
//!
//! - [`protocol`]: descriptors, schemas, the package codec
//! - [`event`]: the topic bus
//! - [`link`]: the connection capability and its TCP / in-memory links
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use urtx::prelude::*;
//!
//! # async fn run() -> Result<(), UrtxError> {
//! let server = TransportBuilder::new().build_server()?;
//! server.on_package(|package| {
//!     println!("{} -> {:?}", package.descriptor(), package.fields());
//! })?;
//! server.connect("0.0.0.0:9090").await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod topic;
mod transport;

pub use builder::{ClientTransport, ServerTransport, TransportBuilder};
pub use error::UrtxError;
pub use topic::Topic;
pub use transport::{ConnectionState, Transport};

pub use urtx_event as event;
pub use urtx_protocol as protocol;
pub use urtx_transport as link;

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::{
        ClientTransport, ConnectionState, ServerTransport, Topic, Transport, TransportBuilder,
        UrtxError,
    };
    pub use urtx_event::EventError;
    pub use urtx_protocol::{
        Descriptor, FieldSchema, FieldType, Package, PackageCodec, ProtocolError, SchemaRegistry,
    };
    pub use urtx_transport::{
        ConnectionError, ConnectionTransport, MemoryTransport, TcpConnectTransport,
        TcpListenTransport, TransportConfig,
    };
}
