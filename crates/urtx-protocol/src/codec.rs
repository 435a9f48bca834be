//! Package encoder/decoder.
//!
//! [`PackageCodec`] is pure: no I/O, no state beyond the registry it was
//! built with. The async receive loop in the `urtx` crate drives it in
//! two steps (header, then payload) so that it can read exactly the number
//! of bytes each step needs; [`PackageCodec::decode_from`] does the same
//! thing for synchronous byte sources.

use std::sync::Arc;

use crate::{Descriptor, Package, ProtocolError, SchemaRegistry};

/// First byte of every package header.
pub const SYNC_BYTE: u8 = 0xA5;

/// Header size: sync byte + descriptor.
pub const HEADER_LEN: usize = 2;

/// Encodes and decodes packages against a [`SchemaRegistry`].
///
/// Cloning is cheap; clones share the registry.
///
/// ## Example
///
/// ```rust
/// use urtx_protocol::{Descriptor, PackageCodec, SchemaRegistry};
///
/// let codec = PackageCodec::new(SchemaRegistry::standard());
///
/// let bytes = codec.encode(Descriptor(0), &[5]).unwrap();
/// assert_eq!(bytes, [0xA5, 0, 0, 0, 0, 5]);
///
/// let package = codec.decode(&bytes).unwrap();
/// assert_eq!(package.fields(), &[5]);
/// ```
#[derive(Debug, Clone)]
pub struct PackageCodec {
    registry: Arc<SchemaRegistry>,
}

impl PackageCodec {
    pub fn new(registry: impl Into<Arc<SchemaRegistry>>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Size of the fixed header that precedes every payload.
    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Payload size for `descriptor`.
    pub fn payload_len(&self, descriptor: Descriptor) -> Result<usize, ProtocolError> {
        Ok(self.registry.schema(descriptor)?.payload_len())
    }

    /// Validates `fields` against the descriptor's schema and returns the
    /// full frame (header + payload).
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownDescriptor`] if the descriptor has no schema.
    /// - [`ProtocolError::FieldCount`] if the number of values is wrong.
    /// - [`ProtocolError::OutOfRange`] if a value doesn't fit its field.
    pub fn encode(&self, descriptor: Descriptor, fields: &[i64]) -> Result<Vec<u8>, ProtocolError> {
        let schema = self.registry.schema(descriptor)?;
        if fields.len() != schema.len() {
            return Err(ProtocolError::FieldCount {
                descriptor,
                expected: schema.len(),
                actual: fields.len(),
            });
        }

        let mut out = Vec::with_capacity(HEADER_LEN + schema.payload_len());
        out.push(SYNC_BYTE);
        out.push(descriptor.0);

        for (index, (&field_type, &value)) in schema.fields().iter().zip(fields).enumerate() {
            if !field_type.contains(value) {
                return Err(ProtocolError::OutOfRange {
                    descriptor,
                    index,
                    field_type,
                    value,
                });
            }
            field_type.put(value, &mut out);
        }

        Ok(out)
    }

    /// Parses a header and returns the descriptor it announces.
    pub fn decode_header(&self, header: &[u8]) -> Result<Descriptor, ProtocolError> {
        if header.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                expected: HEADER_LEN,
                actual: header.len(),
            });
        }
        if header[0] != SYNC_BYTE {
            return Err(ProtocolError::BadSync(header[0]));
        }
        let descriptor = Descriptor(header[1]);
        if !self.registry.contains(descriptor) {
            return Err(ProtocolError::UnknownDescriptor(descriptor));
        }
        Ok(descriptor)
    }

    /// Unpacks a payload into a [`Package`].
    pub fn decode_payload(
        &self,
        descriptor: Descriptor,
        payload: &[u8],
    ) -> Result<Package, ProtocolError> {
        let schema = self.registry.schema(descriptor)?;
        let expected = schema.payload_len();
        if payload.len() != expected {
            return Err(ProtocolError::Truncated {
                expected,
                actual: payload.len(),
            });
        }

        let mut fields = Vec::with_capacity(schema.len());
        let mut offset = 0;
        for field_type in schema.fields() {
            let width = field_type.width();
            fields.push(field_type.get(&payload[offset..offset + width]));
            offset += width;
        }

        Ok(Package::new(descriptor, fields))
    }

    /// Decodes one complete frame.
    pub fn decode(&self, frame: &[u8]) -> Result<Package, ProtocolError> {
        let descriptor = self.decode_header(frame)?;
        let expected = HEADER_LEN + self.payload_len(descriptor)?;
        if frame.len() != expected {
            return Err(ProtocolError::FrameLength {
                descriptor,
                expected,
                actual: frame.len(),
            });
        }
        self.decode_payload(descriptor, &frame[HEADER_LEN..])
    }

    /// Decodes one package by pulling bytes from `read`.
    ///
    /// `read(n)` must return exactly `n` bytes, or `None` / fewer bytes
    /// when the peer has gone away. Either case is reported as
    /// [`ProtocolError::Truncated`].
    pub fn decode_from<F>(&self, mut read: F) -> Result<Package, ProtocolError>
    where
        F: FnMut(usize) -> Option<Vec<u8>>,
    {
        let header = read_exact(&mut read, HEADER_LEN)?;
        let descriptor = self.decode_header(&header)?;
        let payload = read_exact(&mut read, self.payload_len(descriptor)?)?;
        self.decode_payload(descriptor, &payload)
    }
}

fn read_exact<F>(read: &mut F, len: usize) -> Result<Vec<u8>, ProtocolError>
where
    F: FnMut(usize) -> Option<Vec<u8>>,
{
    let bytes = read(len).unwrap_or_default();
    if bytes.len() != len {
        return Err(ProtocolError::Truncated {
            expected: len,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldSchema, FieldType};

    fn codec() -> PackageCodec {
        PackageCodec::new(SchemaRegistry::standard())
    }

    /// A read callback over an in-memory buffer, like a socket that
    /// closes once the bytes run out.
    fn reader(bytes: Vec<u8>) -> impl FnMut(usize) -> Option<Vec<u8>> {
        let mut pos = 0;
        move |n| {
            if pos >= bytes.len() {
                return None;
            }
            let end = (pos + n).min(bytes.len());
            let chunk = bytes[pos..end].to_vec();
            pos = end;
            Some(chunk)
        }
    }

    #[test]
    fn test_encode_single_field_layout() {
        let bytes = codec().encode(Descriptor(0), &[5]).unwrap();
        assert_eq!(bytes, [SYNC_BYTE, 0, 0, 0, 0, 5]);
    }

    #[test]
    fn test_encode_twelve_fields_length() {
        let fields = [1, 2, 3, 4, 5, 6, 11, 12, 13, 14, 15, 21];
        let bytes = codec().encode(Descriptor(1), &fields).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 24);
        assert_eq!(&bytes[..4], &[SYNC_BYTE, 1, 0, 1]);
    }

    #[test]
    fn test_decode_from_reproduces_package() {
        let codec = codec();
        let fields = vec![1, -2, 3, 4, 5, 6, 11, 12, 13, 14, 15, -32768];
        let bytes = codec.encode(Descriptor(1), &fields).unwrap();

        let package = codec.decode_from(reader(bytes)).unwrap();
        assert_eq!(package.descriptor(), Descriptor(1));
        assert_eq!(package.fields(), fields.as_slice());
    }

    #[test]
    fn test_decode_from_reads_consecutive_packages() {
        let codec = codec();
        let mut stream = codec.encode(Descriptor(0), &[7]).unwrap();
        stream.extend(codec.encode(Descriptor(0), &[-7]).unwrap());

        let mut read = reader(stream);
        assert_eq!(codec.decode_from(&mut read).unwrap().fields(), &[7]);
        assert_eq!(codec.decode_from(&mut read).unwrap().fields(), &[-7]);
        assert!(codec.decode_from(&mut read).is_err());
    }

    #[test]
    fn test_mixed_width_schema_round_trip() {
        let registry = SchemaRegistry::builder()
            .register(
                Descriptor(9),
                FieldSchema::new(vec![
                    FieldType::U8,
                    FieldType::I8,
                    FieldType::U16,
                    FieldType::U32,
                    FieldType::I64,
                ]),
            )
            .build()
            .unwrap();
        let codec = PackageCodec::new(registry);
        let fields = [255, -128, 65535, 4_294_967_295, i64::MIN];

        let bytes = codec.encode(Descriptor(9), &fields).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 1 + 1 + 2 + 4 + 8);
        assert_eq!(codec.decode(&bytes).unwrap().fields(), &fields);
    }

    #[test]
    fn test_encode_rejects_wrong_field_count() {
        let err = codec().encode(Descriptor(0), &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FieldCount {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_encode_rejects_out_of_range_value() {
        let err = codec().encode(Descriptor(1), &[0, 0, 0, 0, 0, 40_000, 0, 0, 0, 0, 0, 0]).unwrap_err();
        match err {
            ProtocolError::OutOfRange {
                index, field_type, value, ..
            } => {
                assert_eq!(index, 5);
                assert_eq!(field_type, FieldType::I16);
                assert_eq!(value, 40_000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_rejects_unknown_descriptor() {
        let err = codec().encode(Descriptor(42), &[]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownDescriptor(Descriptor(42))));
    }

    #[test]
    fn test_decode_rejects_unknown_descriptor() {
        let err = codec().decode_from(reader(vec![SYNC_BYTE, 42, 0, 0])).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownDescriptor(Descriptor(42))));
    }

    #[test]
    fn test_decode_rejects_bad_sync() {
        let err = codec().decode(&[0x00, 0, 0, 0, 0, 5]).unwrap_err();
        assert!(matches!(err, ProtocolError::BadSync(0x00)));
    }

    #[test]
    fn test_decode_from_short_payload_is_truncated() {
        let err = codec().decode_from(reader(vec![SYNC_BYTE, 0, 0, 0])).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Truncated {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_decode_from_empty_source_is_truncated() {
        let err = codec().decode_from(|_| None).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Truncated {
                expected: HEADER_LEN,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = codec().encode(Descriptor(0), &[1]).unwrap();
        bytes.push(0);
        let err = codec().decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameLength { expected: 6, actual: 7, .. }));
    }

    #[test]
    fn test_empty_schema_is_header_only() {
        let registry = SchemaRegistry::builder()
            .register(Descriptor(3), FieldSchema::new(Vec::new()))
            .build()
            .unwrap();
        let codec = PackageCodec::new(registry);
        let bytes = codec.encode(Descriptor(3), &[]).unwrap();
        assert_eq!(bytes, [SYNC_BYTE, 3]);
        assert!(codec.decode(&bytes).unwrap().fields().is_empty());
    }
}
