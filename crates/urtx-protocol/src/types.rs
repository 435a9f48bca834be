//! Core protocol types: descriptors, field layouts, and packages.
//!
//! A urtx message is nothing more than a descriptor followed by a fixed
//! run of integers. What those integers are (how many, how wide, signed
//! or not) lives in a [`SchemaRegistry`] that both peers agree on ahead
//! of time. The bytes on the wire never describe themselves.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Identifies a message type on the wire.
///
/// A newtype over `u8` so a descriptor can't be confused with a field
/// value or a byte count. `#[serde(transparent)]` keeps it a plain number
/// in serialized form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Descriptor(pub u8);

impl From<u8> for Descriptor {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

/// A fixed-width integer field.
///
/// Values travel through the API as `i64` and are range-checked against
/// the field type on encode. Every type here fits losslessly in an `i64`,
/// which is why there is no `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
}

impl FieldType {
    /// Number of bytes this field occupies on the wire.
    pub fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
            Self::I64 => 8,
        }
    }

    /// Inclusive `(min, max)` of representable values.
    pub fn range(self) -> (i64, i64) {
        match self {
            Self::I8 => (i8::MIN.into(), i8::MAX.into()),
            Self::U8 => (0, u8::MAX.into()),
            Self::I16 => (i16::MIN.into(), i16::MAX.into()),
            Self::U16 => (0, u16::MAX.into()),
            Self::I32 => (i32::MIN.into(), i32::MAX.into()),
            Self::U32 => (0, u32::MAX.into()),
            Self::I64 => (i64::MIN, i64::MAX),
        }
    }

    /// Returns `true` if `value` can be encoded as this type.
    pub fn contains(self, value: i64) -> bool {
        let (min, max) = self.range();
        (min..=max).contains(&value)
    }

    /// Appends `value` in big-endian order. The caller has already
    /// checked [`contains`](Self::contains).
    pub(crate) fn put(self, value: i64, out: &mut Vec<u8>) {
        match self {
            Self::I8 => out.extend_from_slice(&(value as i8).to_be_bytes()),
            Self::U8 => out.extend_from_slice(&(value as u8).to_be_bytes()),
            Self::I16 => out.extend_from_slice(&(value as i16).to_be_bytes()),
            Self::U16 => out.extend_from_slice(&(value as u16).to_be_bytes()),
            Self::I32 => out.extend_from_slice(&(value as i32).to_be_bytes()),
            Self::U32 => out.extend_from_slice(&(value as u32).to_be_bytes()),
            Self::I64 => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    /// Reads one value from a slice of exactly [`width`](Self::width) bytes.
    pub(crate) fn get(self, b: &[u8]) -> i64 {
        match self {
            Self::I8 => i8::from_be_bytes([b[0]]).into(),
            Self::U8 => u8::from_be_bytes([b[0]]).into(),
            Self::I16 => i16::from_be_bytes([b[0], b[1]]).into(),
            Self::U16 => u16::from_be_bytes([b[0], b[1]]).into(),
            Self::I32 => i32::from_be_bytes([b[0], b[1], b[2], b[3]]).into(),
            Self::U32 => u32::from_be_bytes([b[0], b[1], b[2], b[3]]).into(),
            Self::I64 => i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// FieldSchema
// ---------------------------------------------------------------------------

/// The ordered field layout of one descriptor.
///
/// `#[serde(transparent)]` makes a schema serialize as a bare list, e.g.
/// `["i32", "u8"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldType>,
}

impl FieldSchema {
    /// Creates a schema from an ordered list of field types.
    pub fn new(fields: Vec<FieldType>) -> Self {
        Self { fields }
    }

    /// A schema of `count` fields that all share one type.
    pub fn repeated(field_type: FieldType, count: usize) -> Self {
        Self {
            fields: vec![field_type; count],
        }
    }

    /// Field types in wire order.
    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    /// Number of values a package of this schema carries.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` for a schema with no fields (header-only packages).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Exact payload size in bytes.
    pub fn payload_len(&self) -> usize {
        self.fields.iter().map(|f| f.width()).sum()
    }
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// The fixed mapping from descriptor to field layout.
///
/// Built once through [`SchemaRegistry::builder`] and read-only after
/// that. Codec and transport share it behind an `Arc`, so two transports
/// in the same process can still speak different schema sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    schemas: BTreeMap<Descriptor, FieldSchema>,
}

impl SchemaRegistry {
    /// Starts building a registry.
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// The schema set the robot console and its onboard peer use:
    ///
    /// | descriptor | fields |
    /// |------------|--------|
    /// | `0` | one `i32` |
    /// | `1` | twelve `i16` |
    pub fn standard() -> Self {
        let mut schemas = BTreeMap::new();
        schemas.insert(Descriptor(0), FieldSchema::new(vec![FieldType::I32]));
        schemas.insert(Descriptor(1), FieldSchema::repeated(FieldType::I16, 12));
        Self { schemas }
    }

    /// Looks up the schema for `descriptor`.
    pub fn get(&self, descriptor: Descriptor) -> Option<&FieldSchema> {
        self.schemas.get(&descriptor)
    }

    /// Like [`get`](Self::get), but unknown descriptors are an error.
    pub fn schema(&self, descriptor: Descriptor) -> Result<&FieldSchema, ProtocolError> {
        self.get(descriptor)
            .ok_or(ProtocolError::UnknownDescriptor(descriptor))
    }

    /// Returns `true` if `descriptor` has a schema.
    pub fn contains(&self, descriptor: Descriptor) -> bool {
        self.schemas.contains_key(&descriptor)
    }

    /// All registered descriptors, in ascending order.
    pub fn descriptors(&self) -> impl Iterator<Item = Descriptor> + '_ {
        self.schemas.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Builder for [`SchemaRegistry`].
///
/// Registering the same descriptor twice is remembered and reported by
/// [`build`](Self::build), so chains stay free of `?`.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    schemas: BTreeMap<Descriptor, FieldSchema>,
    duplicate: Option<Descriptor>,
}

impl SchemaRegistryBuilder {
    /// Adds a descriptor and its layout.
    pub fn register(mut self, descriptor: Descriptor, schema: FieldSchema) -> Self {
        if self.schemas.insert(descriptor, schema).is_some() && self.duplicate.is_none() {
            self.duplicate = Some(descriptor);
        }
        self
    }

    /// Finishes the registry.
    ///
    /// # Errors
    /// Returns [`ProtocolError::DuplicateDescriptor`] for the first
    /// descriptor that was registered more than once.
    pub fn build(self) -> Result<SchemaRegistry, ProtocolError> {
        match self.duplicate {
            Some(descriptor) => Err(ProtocolError::DuplicateDescriptor(descriptor)),
            None => Ok(SchemaRegistry {
                schemas: self.schemas,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// One decoded protocol message.
///
/// Fields are private: once the codec hands a package out, nothing can
/// change it. Packages are cheap to clone and are handed to every
/// subscriber by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    descriptor: Descriptor,
    fields: Vec<i64>,
}

impl Package {
    /// Creates a package. Schema conformance is checked by the codec, not
    /// here.
    pub fn new(descriptor: Descriptor, fields: Vec<i64>) -> Self {
        Self {
            descriptor,
            fields,
        }
    }

    pub fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    /// Field values in schema order.
    pub fn fields(&self) -> &[i64] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<i64> {
        self.fields
    }
}

// =========================================================================
// Tests
// =========================================================================
