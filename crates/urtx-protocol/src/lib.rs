//! Wire protocol for urtx.
//!
//! This crate defines the "language" both ends of a urtx link speak:
//!
//! - **Types** ([`Descriptor`], [`FieldType`], [`FieldSchema`],
//!   [`SchemaRegistry`], [`Package`]): what a message looks like and
//!   which layout each descriptor carries.
//! - **Codec** ([`PackageCodec`]): how packages are turned into bytes
//!   and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding or
//!   decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the byte stream and the event bus. It
//! never touches a socket: callers hand it bytes (or a read callback) and
//! get packages back.
//!
//! ```text
//! Link (bytes) → Protocol (Package) → EventBus (subscribers)
//! ```
//!
//! # Wire format
//!
//! ```text
//! ┌───────────┬────────────┬──────────────────────────────────┐
//! │ 0xA5 sync │ descriptor │ fields, big-endian, schema order │
//! │   1 byte  │   1 byte   │  sum of the schema field widths  │
//! └───────────┴────────────┴──────────────────────────────────┘
//! ```
//!
//! There is no length prefix: the descriptor alone determines how many
//! payload bytes follow, which is why every schema is fixed-length.

mod codec;
mod error;
mod types;

pub use codec::{PackageCodec, HEADER_LEN, SYNC_BYTE};
pub use error::ProtocolError;
pub use types::{Descriptor, FieldSchema, FieldType, Package, SchemaRegistry, SchemaRegistryBuilder};
