//! Wire-level framing primitives shared by the encode and decode paths.
//!
//! MQTT frames every packet with a fixed header whose second field is the
//! *remaining length*: a variable-byte integer giving the exact number of
//! bytes that follow the fixed header. Strings and topic names use a
//! separate framing, a 16-bit big-endian length prefix followed by the raw
//! bytes (no terminator).
//!
//! Both schemes are implemented here so the per-packet builders in
//! [`connection`](crate::connection) and the accessors in
//! [`packet`](crate::packet) share one definition of the format.

use crate::error::Error;

/// Largest value representable by the remaining-length integer
/// (4 encoded bytes of 7 payload bits each).
pub const REMAINING_LENGTH_MAX: usize = 268_435_455;

/// Maximum encoded size of the remaining-length integer, in bytes.
pub const REMAINING_LENGTH_SIZE: usize = 4;

/// Largest byte length a 16-bit length-prefixed field can carry.
pub const STRING_MAX: usize = u16::MAX as usize;

/// Encode `value` as an MQTT remaining-length integer into `out`.
///
/// The value is split into 7-bit groups, least significant group first;
/// every byte except the last has its top bit set. Returns the number of
/// bytes written (1-4).
///
/// # Errors
///
/// - [`Error::MalformedLength`] if `value` exceeds [`REMAINING_LENGTH_MAX`]
/// - [`Error::BufferTooSmall`] if `out` cannot hold the encoding
pub fn encode_remaining_length(mut value: usize, out: &mut [u8]) -> Result<usize, Error> {
    if value > REMAINING_LENGTH_MAX {
        return Err(Error::MalformedLength);
    }
    let mut written = 0;
    loop {
        let mut byte = (value % 128) as u8;
        value /= 128;
        if value > 0 {
            byte |= 0x80;
        }
        *out.get_mut(written).ok_or(Error::BufferTooSmall)? = byte;
        written += 1;
        if value == 0 {
            return Ok(written);
        }
    }
}

/// Decode an MQTT remaining-length integer from the start of `buf`.
///
/// Returns `Ok(Some((value, consumed)))` where `consumed` is the number of
/// bytes the length field itself occupied (1-4); the variable header begins
/// immediately after. Returns `Ok(None)` if `buf` ends before a terminating
/// byte (top bit clear) was seen - the caller should read more bytes.
///
/// # Errors
///
/// [`Error::MalformedLength`] if a fourth byte still carries the
/// continuation bit, i.e. the field claims to exceed the 28-bit limit.
pub fn decode_remaining_length(buf: &[u8]) -> Result<Option<(usize, usize)>, Error> {
    let mut value = 0usize;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().take(REMAINING_LENGTH_SIZE).enumerate() {
        value |= ((byte & 0x7F) as usize) << shift;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
        shift += 7;
    }
    if buf.len() >= REMAINING_LENGTH_SIZE {
        // 4 continuation bytes: the field can never terminate legally.
        return Err(Error::MalformedLength);
    }
    Ok(None)
}

/// Read a big-endian `u16` at `offset`, or `None` if `buf` is too short.
pub fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read a 16-bit length-prefixed field starting at `offset`.
///
/// This is the framing used for topic names, client identifiers and the
/// CONNECT credential fields. Returns the field bytes without the prefix.
///
/// # Errors
///
/// [`Error::MalformedLength`] if the prefix or the field itself runs past
/// the end of `buf`.
pub fn read_string(buf: &[u8], offset: usize) -> Result<&[u8], Error> {
    let len = read_u16(buf, offset).ok_or(Error::MalformedLength)? as usize;
    buf.get(offset + 2..offset + 2 + len)
        .ok_or(Error::MalformedLength)
}
