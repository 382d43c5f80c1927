//! nom combinators for the FIT wire format.
//!
//! All multi-byte reads take their byte order from the active message
//! definition; the file header itself is always little-endian.

use nom::bytes::complete::take;
use nom::combinator::cond;
use nom::multi::count;
use nom::number::complete::{
    f32, f64, i16, i32, i64, le_i8, le_u16, le_u32, le_u8, u16, u32, u64,
};
use nom::number::Endianness;
use nom::sequence::tuple;
use nom::IResult;

use crate::types::{FieldDefinition, FieldValue, FileHeader, Message, MessageDefinition, RecordHeader};

/// Consumes a file header. Validation of the header length and format tag
/// is left to the caller, which can produce richer errors than nom's.
pub fn take_file_header(input: &[u8]) -> IResult<&[u8], FileHeader> {
    let (input, length) = le_u8(input)?;
    let (input, protocol) = le_u8(input)?;
    let (input, profile) = le_u16(input)?;
    let (input, data_size) = le_u32(input)?;
    let (input, tag) = take(4usize)(input)?;
    let (input, checksum) = cond(length >= 14, le_u16)(input)?;
    Ok((
        input,
        FileHeader {
            length,
            protocol,
            profile,
            data_size,
            tag: [tag[0], tag[1], tag[2], tag[3]],
            checksum,
        },
    ))
}

#[inline(always)]
pub fn take_record_header(input: &[u8]) -> IResult<&[u8], u8> {
    le_u8(input)
}

fn take_byte_order(input: &[u8]) -> IResult<&[u8], Endianness> {
    let (input, value) = le_u8(input)?;
    match value {
        0 => Ok((input, Endianness::Little)),
        _ => Ok((input, Endianness::Big)),
    }
}

/// Field definition triple: (field number, length, base type tag).
fn take_field_triple(input: &[u8]) -> IResult<&[u8], (u8, u8, u8)> {
    tuple((le_u8, le_u8, le_u8))(input)
}

fn take_field_block(input: &[u8]) -> IResult<&[u8], Vec<(u8, u8, u8)>> {
    let (input, n) = le_u8(input)?;
    count(take_field_triple, n as usize)(input)
}

/// Assigns each raw field its byte offset within the message payload.
fn layout_fields(raw: &[(u8, u8, u8)], start: usize) -> Vec<FieldDefinition> {
    raw.iter()
        .scan(start, |offset, &(number, length, data_type)| {
            let current = *offset;
            *offset += length as usize;
            Some(FieldDefinition {
                number,
                length,
                data_type,
                offset: current,
            })
        })
        .collect()
}

/// Consumes the body of a definition record. `header` is the record header
/// byte, needed for the developer-data flag.
pub fn take_message_definition(header: u8) -> impl Fn(&[u8]) -> IResult<&[u8], MessageDefinition> {
    move |input: &[u8]| {
        let (input, _reserved) = le_u8(input)?;
        let (input, byte_order) = take_byte_order(input)?;
        let (input, number) = u16(byte_order)(input)?;
        let (input, fields) = take_field_block(input)?;
        let (input, developer_fields) = cond(header.developer(), take_field_block)(input)?;
        let base_length: usize = fields.iter().map(|&(_, length, _)| length as usize).sum();
        let developer_length: usize = developer_fields
            .as_ref()
            .map_or(0, |fields| fields.iter().map(|&(_, length, _)| length as usize).sum());
        Ok((
            input,
            MessageDefinition {
                number,
                length: base_length + developer_length,
                byte_order,
                fields: layout_fields(&fields, 0),
                developer_fields: developer_fields
                    .as_deref()
                    .map(|fields| layout_fields(fields, base_length)),
            },
        ))
    }
}

#[inline(always)]
pub fn take_message_data(length: usize) -> impl Fn(&[u8]) -> IResult<&[u8], &[u8]> {
    move |input: &[u8]| take(length)(input)
}

#[inline(always)]
pub fn take_checksum(input: &[u8]) -> IResult<&[u8], u16> {
    le_u16(input)
}

/// Decodes every scalar the field's byte span holds, without sentinel
/// filtering.
fn decode_all<'a, T, P>(data: &'a [u8], width: usize, parser: P) -> Option<Vec<T>>
where
    P: FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
{
    let n = data.len() / width;
    if n == 0 {
        return None;
    }
    count(parser, n)(data).ok().map(|(_, values)| values)
}

/// As [`decode_all`], but treats a span where every element equals the base
/// type's invalid sentinel as "no value".
fn decode_scalars<'a, T, P>(data: &'a [u8], width: usize, invalid: T, parser: P) -> Option<Vec<T>>
where
    T: PartialEq,
    P: FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
{
    let values = decode_all(data, width, parser)?;
    if values.iter().all(|value| *value == invalid) {
        None
    } else {
        Some(values)
    }
}

fn collapse<T>(
    values: Option<Vec<T>>,
    single: impl FnOnce(T) -> FieldValue,
    many: impl FnOnce(Vec<T>) -> FieldValue,
) -> FieldValue {
    match values {
        None => FieldValue::Nil,
        Some(mut values) if values.len() == 1 => single(values.remove(0)),
        Some(values) => many(values),
    }
}

/// Decodes one field from `message` per its declared base type and length.
/// Whether `field` belongs to the message's definition is not checked.
pub fn decode_field(message: &Message, field: &FieldDefinition) -> FieldValue {
    use FieldValue::*;
    let endianness = message.definition.byte_order;
    let length = field.length as usize;
    let data = match message.data.get(field.offset..field.offset + length) {
        Some(data) => data,
        None => return Nil,
    };
    match field.data_type & 0x1f {
        // enum, uint8, byte
        0 | 2 | 13 => collapse(decode_scalars(data, 1, u8::MAX, le_u8), U8, U8Array),
        1 => collapse(decode_scalars(data, 1, i8::MAX, le_i8), I8, I8Array),
        3 => collapse(decode_scalars(data, 2, i16::MAX, i16(endianness)), I16, I16Array),
        4 => collapse(decode_scalars(data, 2, u16::MAX, u16(endianness)), U16, U16Array),
        5 => collapse(decode_scalars(data, 4, i32::MAX, i32(endianness)), I32, I32Array),
        6 => collapse(decode_scalars(data, 4, u32::MAX, u32(endianness)), U32, U32Array),
        // NUL-terminated UTF-8 string
        7 => {
            let bytes = match data.iter().position(|&b| b == 0) {
                Some(n) => &data[..n],
                None => data,
            };
            if bytes.is_empty() {
                Nil
            } else {
                String(std::string::String::from_utf8_lossy(bytes).into_owned())
            }
        }
        // Floats have no in-band sentinel; all-0xff bytes mean unset.
        8 => {
            if data.iter().all(|&b| b == 0xff) {
                return Nil;
            }
            collapse(decode_all(data, 4, f32(endianness)), F32, F32Array)
        }
        9 => {
            if data.iter().all(|&b| b == 0xff) {
                return Nil;
            }
            collapse(decode_all(data, 8, f64(endianness)), F64, F64Array)
        }
        // The "z" types use zero as their invalid sentinel.
        10 => collapse(decode_scalars(data, 1, 0u8, le_u8), U8, U8Array),
        11 => collapse(decode_scalars(data, 2, 0u16, u16(endianness)), U16, U16Array),
        12 => collapse(decode_scalars(data, 4, 0u32, u32(endianness)), U32, U32Array),
        14 => collapse(decode_scalars(data, 8, i64::MAX, i64(endianness)), I64, I64Array),
        15 => collapse(decode_scalars(data, 8, u64::MAX, u64(endianness)), U64, U64Array),
        16 => collapse(decode_scalars(data, 8, 0u64, u64(endianness)), U64, U64Array),
        _ => Nil,
    }
}
