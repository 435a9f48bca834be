//! Error types for the protocol layer.
//!
//! Each urtx crate defines its own error enum. When you see a
//! `ProtocolError`, the problem is in framing or field layout, not in the
//! socket or the subscriber side.

use crate::{Descriptor, FieldType};

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The descriptor has no schema in the registry.
    ///
    /// On decode this usually means the peer speaks a different schema
    /// set, or the stream lost synchronisation.
    #[error("unknown descriptor {0}")]
    UnknownDescriptor(Descriptor),

    /// A registry was built with the same descriptor twice.
    #[error("descriptor {0} registered twice")]
    DuplicateDescriptor(Descriptor),

    /// The number of values does not match the schema.
    #[error("descriptor {descriptor} expects {expected} fields, got {actual}")]
    FieldCount {
        descriptor: Descriptor,
        expected: usize,
        actual: usize,
    },

    /// A value does not fit in its field's integer type.
    #[error("field {index} of descriptor {descriptor} is {field_type}, {value} is out of range")]
    OutOfRange {
        descriptor: Descriptor,
        index: usize,
        field_type: FieldType,
        value: i64,
    },

    /// The first header byte was not [`SYNC_BYTE`](crate::SYNC_BYTE).
    #[error("bad sync byte 0x{0:02x}")]
    BadSync(u8),

    /// A read came back short, which means the peer closed mid-message.
    #[error("truncated read: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// A complete frame had the wrong total length for its descriptor.
    #[error("frame for descriptor {descriptor} must be {expected} bytes, got {actual}")]
    FrameLength {
        descriptor: Descriptor,
        expected: usize,
        actual: usize,
    },
}
