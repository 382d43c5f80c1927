use nom::number::Endianness;
use std::rc::Rc;

use crate::parser;

/// The two kinds of record in a FIT data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Definition,
    Data,
}

/// Bit-field accessors for the one-byte record header.
///
/// A set top bit marks a compressed-timestamp data record: bits 5-6 carry the
/// local message type and bits 0-4 a time offset against the last absolute
/// timestamp. Otherwise bit 6 distinguishes definition records from data
/// records, bits 0-3 carry the local message type, and bit 5 flags a
/// definition record with developer data.
pub trait RecordHeader {
    fn compressed(&self) -> bool;
    fn local_type(&self) -> u8;
    fn record_type(&self) -> RecordType;
    fn time_offset(&self) -> u8;
    fn developer(&self) -> bool;
}

impl RecordHeader for u8 {
    #[inline(always)]
    fn compressed(&self) -> bool {
        (self & 0x80) == 0x80
    }
    #[inline(always)]
    fn local_type(&self) -> u8 {
        match self.compressed() {
            true => (self & 0x60) >> 5,
            false => self & 0x0f,
        }
    }
    #[inline(always)]
    fn record_type(&self) -> RecordType {
        match !self.compressed() && (self & 0x40) == 0x40 {
            true => RecordType::Definition,
            false => RecordType::Data,
        }
    }
    #[inline(always)]
    fn time_offset(&self) -> u8 {
        match self.compressed() {
            true => self & 0x1f,
            false => 0,
        }
    }
    #[inline(always)]
    fn developer(&self) -> bool {
        (self & 0xe0) == 0x60
    }
}

/// The FIT file header.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    /// Header length in bytes; 12, or 14 when a header checksum is present.
    pub length: u8,
    pub protocol: u8,
    pub profile: u16,
    /// Declared length of the data section, excluding header and trailing
    /// checksum.
    pub data_size: u32,
    /// Format tag; `.FIT` for a FIT file.
    pub tag: [u8; 4],
    pub checksum: Option<u16>,
}

/// One field of a message definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Field number; identifies the field within its global message.
    pub number: u8,
    /// Length of the field in bytes. May be a whole multiple of the base
    /// type's intrinsic width, in which case the field is an array.
    pub length: u8,
    /// Base type tag. The lower five bits identify the type; the remaining
    /// bits are redundant.
    pub data_type: u8,
    /// Byte offset of the field within the message payload, calculated when
    /// the definition is parsed.
    pub offset: usize,
}

/// The active layout for one local message type.
///
/// A later definition record for the same local type replaces the prior one;
/// local types are a reused namespace, not message identities.
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// Global message number.
    pub number: u16,
    /// Total payload length of corresponding data records, in bytes.
    pub length: usize,
    /// Byte order of multi-byte fields in corresponding data records.
    pub byte_order: Endianness,
    pub fields: Vec<FieldDefinition>,
    pub developer_fields: Option<Vec<FieldDefinition>>,
}

/// A decoded field value.
///
/// `Nil` marks a field that is present in the layout but set to its base
/// type's invalid sentinel: recorded as "no value", not zero.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I8(i8),
    I8Array(Vec<i8>),
    U8(u8),
    U8Array(Vec<u8>),
    I16(i16),
    I16Array(Vec<i16>),
    U16(u16),
    U16Array(Vec<u16>),
    I32(i32),
    I32Array(Vec<i32>),
    U32(u32),
    U32Array(Vec<u32>),
    I64(i64),
    I64Array(Vec<i64>),
    U64(u64),
    U64Array(Vec<u64>),
    F32(f32),
    F32Array(Vec<f32>),
    F64(f64),
    F64Array(Vec<f64>),
    String(String),
    Nil,
}

/// A data message and the definition required to read its fields.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    pub definition: Rc<MessageDefinition>,
    pub data: &'a [u8],
}

impl<'a> Message<'a> {
    /// Returns the global message number.
    #[inline(always)]
    pub fn number(&self) -> u16 {
        self.definition.number
    }
    /// Returns the value of the field specified by `number`, or `None` if
    /// the active definition does not list it. A listed field set to its
    /// invalid sentinel decodes to `FieldValue::Nil`.
    pub fn field(&self, number: u8) -> Option<FieldValue> {
        self.definition
            .fields
            .iter()
            .find(|field| field.number == number)
            .map(|field| parser::decode_field(self, field))
    }
    /// Returns the field specified by `number` iff it is a scalar `i8`.
    pub fn field_i8(&self, number: u8) -> Option<i8> {
        match self.field(number) {
            Some(FieldValue::I8(value)) => Some(value),
            _ => None,
        }
    }
    /// Returns the field specified by `number` iff it is a scalar `u8`.
    pub fn field_u8(&self, number: u8) -> Option<u8> {
        match self.field(number) {
            Some(FieldValue::U8(value)) => Some(value),
            _ => None,
        }
    }
    /// Returns the field specified by `number` iff it can be widened to a
    /// scalar `i16`.
    pub fn field_i16(&self, number: u8) -> Option<i16> {
        match self.field(number) {
            Some(FieldValue::I8(value)) => Some(value.into()),
            Some(FieldValue::I16(value)) => Some(value),
            _ => None,
        }
    }
    /// Returns the field specified by `number` iff it can be widened to a
    /// scalar `u16`.
    pub fn field_u16(&self, number: u8) -> Option<u16> {
        match self.field(number) {
            Some(FieldValue::U8(value)) => Some(value.into()),
            Some(FieldValue::U16(value)) => Some(value),
            _ => None,
        }
    }
    /// Returns the field specified by `number` iff it can be widened to a
    /// scalar `i32`.
    pub fn field_i32(&self, number: u8) -> Option<i32> {
        match self.field(number) {
            Some(FieldValue::I8(value)) => Some(value.into()),
            Some(FieldValue::I16(value)) => Some(value.into()),
            Some(FieldValue::I32(value)) => Some(value),
            _ => None,
        }
    }
    /// Returns the field specified by `number` iff it can be widened to a
    /// scalar `u32`.
    pub fn field_u32(&self, number: u8) -> Option<u32> {
        match self.field(number) {
            Some(FieldValue::U8(value)) => Some(value.into()),
            Some(FieldValue::U16(value)) => Some(value.into()),
            Some(FieldValue::U32(value)) => Some(value),
            _ => None,
        }
    }
    /// Returns the field specified by `number` iff it is a string.
    pub fn field_string(&self, number: u8) -> Option<String> {
        match self.field(number) {
            Some(FieldValue::String(value)) => Some(value),
            _ => None,
        }
    }
}

/// One record from the data section, or the trailing checksum.
#[derive(Debug)]
pub enum Record<'a> {
    Definition(u8, Rc<MessageDefinition>),
    Message(u8, Message<'a>),
    Checksum(u16),
}
