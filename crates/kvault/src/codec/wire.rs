//! 🔌 Protobuf wire primitives: varints, zigzag, field keys, and skipping.
//!
//! Encoders append to a `Vec<u8>`. Decoders walk a `&[u8]` with an explicit
//! cursor (`idx`), so a message body can be decoded in place without copying.

use super::CodecError;

/// Largest field number the wire format allows (2^29 - 1).
pub(crate) const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// 🏷️ The four wire types we speak. Groups (3, 4) are proto2 archaeology and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(CodecError::UnsupportedWireType(other)),
        }
    }
}

pub(crate) fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub(crate) fn get_varint(buf: &[u8], idx: &mut usize) -> Result<u64, CodecError> {
    let mut value = 0u64;
    for shift in (0..70).step_by(7) {
        let byte = *buf.get(*idx).ok_or(CodecError::Truncated)?;
        *idx += 1;
        // -- the 10th byte may only carry the single leftover bit
        if shift == 63 && byte > 1 {
            return Err(CodecError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(CodecError::VarintOverflow)
}

pub(crate) fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub(crate) fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub(crate) fn put_key(out: &mut Vec<u8>, number: u32, wire_type: WireType) {
    put_varint(out, (u64::from(number) << 3) | wire_type as u64);
}

/// 🔑 Read a field key. Returns `(field number, wire type)`.
pub(crate) fn get_key(buf: &[u8], idx: &mut usize) -> Result<(u32, WireType), CodecError> {
    let key = get_varint(buf, idx)?;
    let number = key >> 3;
    if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
        return Err(CodecError::InvalidFieldNumber(number));
    }
    let wire_type = WireType::try_from((key & 0x7) as u8)?;
    Ok((number as u32, wire_type))
}

pub(crate) fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    put_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// 📏 Borrow a length-delimited payload and advance past it.
pub(crate) fn get_bytes<'a>(buf: &'a [u8], idx: &mut usize) -> Result<&'a [u8], CodecError> {
    let len = usize::try_from(get_varint(buf, idx)?).map_err(|_| CodecError::Truncated)?;
    let end = idx.checked_add(len).ok_or(CodecError::Truncated)?;
    let slice = buf.get(*idx..end).ok_or(CodecError::Truncated)?;
    *idx = end;
    Ok(slice)
}

pub(crate) fn get_fixed32(buf: &[u8], idx: &mut usize) -> Result<[u8; 4], CodecError> {
    let slice = buf.get(*idx..*idx + 4).ok_or(CodecError::Truncated)?;
    *idx += 4;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(slice);
    Ok(raw)
}

pub(crate) fn get_fixed64(buf: &[u8], idx: &mut usize) -> Result<[u8; 8], CodecError> {
    let slice = buf.get(*idx..*idx + 8).ok_or(CodecError::Truncated)?;
    *idx += 8;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(slice);
    Ok(raw)
}

/// 🗑️ Step over a field we have no schema entry for.
pub(crate) fn skip_field(buf: &[u8], idx: &mut usize, wire_type: WireType) -> Result<(), CodecError> {
    match wire_type {
        WireType::Varint => get_varint(buf, idx).map(|_| ()),
        WireType::Fixed64 => get_fixed64(buf, idx).map(|_| ()),
        WireType::LengthDelimited => get_bytes(buf, idx).map(|_| ()),
        WireType::Fixed32 => get_fixed32(buf, idx).map(|_| ()),
    }
}
