//! Primitive binary reader/writer over a growable buffer.
//!
//! The Java wire format is big-endian throughout; variable-length
//! integers are plain LEB128 (7 payload bits per byte, no ZigZag),
//! capped at 5 bytes for 32-bit values. Reads consume from the front,
//! writes append at the back; both positions only move forward. Not
//! thread-safe — one `ByteMessage` belongs to one connection task.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtoError;
use crate::version::Version;

/// Default cap for length-prefixed strings (protocol limit for
/// arbitrary text fields).
pub const DEFAULT_MAX_STRING: usize = 32767;

/// Encode a packet body for a given version.
pub trait PacketEncode {
    fn encode(&self, buf: &mut ByteMessage, version: Version);
}

/// Decode a packet body for a given version.
pub trait PacketDecode: Sized {
    fn decode(buf: &mut ByteMessage, version: Version) -> Result<Self, ProtoError>;
}

/// 128-bit UUID, stored as the two big-endian halves the wire uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uuid {
    pub most_significant: u64,
    pub least_significant: u64,
}

impl Uuid {
    pub fn new(most: u64, least: u64) -> Self {
        Self {
            most_significant: most,
            least_significant: least,
        }
    }

    /// Offline-mode style hyphenated form, used by the pre-1.16 login
    /// success packet.
    pub fn to_hyphenated(&self) -> String {
        let m = self.most_significant;
        let l = self.least_significant;
        format!(
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (m >> 32) as u32,
            (m >> 16) as u16,
            m as u16,
            (l >> 48) as u16,
            l & 0xFFFF_FFFF_FFFF
        )
    }
}

/// Cursor over a mutable byte buffer.
pub struct ByteMessage {
    buf: BytesMut,
}

impl ByteMessage {
    pub const MAX_VARINT_BYTES: usize = 5;

    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn from_bytes(bytes: Bytes) -> Self {
        Self {
            buf: BytesMut::from(&bytes[..]),
        }
    }

    pub fn from_slice(slice: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(slice),
        }
    }

    /// Unread bytes left in the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the written contents.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtoError> {
        if self.buf.remaining() < needed {
            return Err(ProtoError::TruncatedInput {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    // -- fixed-width integers (big-endian) --

    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtoError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn read_i8(&mut self) -> Result<i8, ProtoError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtoError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.put_u16(v);
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtoError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.put_i16(v);
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtoError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtoError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    pub fn read_i64(&mut self) -> Result<i64, ProtoError> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.put_f32(v);
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtoError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32())
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.put_f64(v);
    }

    pub fn read_f64(&mut self) -> Result<f64, ProtoError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    // -- varint --

    pub fn write_var_int(&mut self, v: i32) {
        let mut value = v as u32;
        loop {
            if value & !0x7F == 0 {
                self.buf.put_u8(value as u8);
                return;
            }
            self.buf.put_u8((value & 0x7F | 0x80) as u8);
            value >>= 7;
        }
    }

    pub fn read_var_int(&mut self) -> Result<i32, ProtoError> {
        let mut result: u32 = 0;
        let mut shift: u32 = 0;
        for i in 0..Self::MAX_VARINT_BYTES {
            if !self.buf.has_remaining() {
                return Err(ProtoError::TruncatedInput {
                    needed: 1,
                    remaining: 0,
                });
            }
            let byte = self.buf.get_u8();
            result |= ((byte & 0x7F) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(result as i32);
            }
            shift += 7;
            if i == Self::MAX_VARINT_BYTES - 1 {
                return Err(ProtoError::MalformedVarInt {
                    max_bytes: Self::MAX_VARINT_BYTES,
                });
            }
        }
        Err(ProtoError::TruncatedInput {
            needed: 1,
            remaining: 0,
        })
    }

    /// Bytes a varint occupies on the wire.
    pub fn var_int_len(v: i32) -> usize {
        let mut value = v as u32;
        let mut len = 1;
        while value & !0x7F != 0 {
            value >>= 7;
            len += 1;
        }
        len
    }

    // -- strings --

    pub fn write_string(&mut self, s: &str) {
        self.write_var_int(s.len() as i32);
        self.buf.put_slice(s.as_bytes());
    }

    pub fn read_string(&mut self) -> Result<String, ProtoError> {
        self.read_string_limited(DEFAULT_MAX_STRING)
    }

    pub fn read_string_limited(&mut self, max: usize) -> Result<String, ProtoError> {
        let len = self.read_var_int()?;
        if len < 0 {
            return Err(ProtoError::MalformedField(format!(
                "negative string length {len}"
            )));
        }
        let len = len as usize;
        if len > max * 4 {
            return Err(ProtoError::StringTooLong { len, max });
        }
        self.ensure(len)?;
        let data = self.buf.split_to(len);
        let s = std::str::from_utf8(&data).map_err(|_| ProtoError::InvalidUtf8)?;
        if s.chars().count() > max {
            return Err(ProtoError::StringTooLong {
                len: s.chars().count(),
                max,
            });
        }
        Ok(s.to_owned())
    }

    // -- byte arrays --

    pub fn write_bytes_array(&mut self, data: &[u8]) {
        self.write_var_int(data.len() as i32);
        self.buf.put_slice(data);
    }

    pub fn read_bytes_array(&mut self) -> Result<Vec<u8>, ProtoError> {
        let len = self.read_var_int()?;
        if len < 0 {
            return Err(ProtoError::MalformedField(format!(
                "negative array length {len}"
            )));
        }
        let len = len as usize;
        self.ensure(len)?;
        Ok(self.buf.split_to(len).to_vec())
    }

    pub fn write_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ProtoError> {
        self.ensure(len)?;
        Ok(self.buf.split_to(len).to_vec())
    }

    /// Consume everything left (unprefixed trailing payloads).
    pub fn read_remaining(&mut self) -> Vec<u8> {
        self.buf.split_to(self.buf.len()).to_vec()
    }

    // -- uuid --

    pub fn write_uuid(&mut self, uuid: Uuid) {
        self.buf.put_u64(uuid.most_significant);
        self.buf.put_u64(uuid.least_significant);
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, ProtoError> {
        self.ensure(16)?;
        Ok(Uuid {
            most_significant: self.buf.get_u64(),
            least_significant: self.buf.get_u64(),
        })
    }

    // -- string arrays --

    pub fn write_string_array(&mut self, values: &[&str]) {
        self.write_var_int(values.len() as i32);
        for v in values {
            self.write_string(v);
        }
    }

    // -- fixed bit sets --

    pub fn write_fixed_bit_set(&mut self, bits: &[bool]) {
        let mut bytes = vec![0u8; bits.len().div_ceil(8)];
        for (i, set) in bits.iter().enumerate() {
            if *set {
                bytes[i >> 3] |= 1 << (i & 7);
            }
        }
        self.buf.put_slice(&bytes);
    }

    pub fn read_fixed_bit_set(&mut self, bits: usize) -> Result<Vec<bool>, ProtoError> {
        let len = bits.div_ceil(8);
        self.ensure(len)?;
        let bytes = self.buf.split_to(len);
        let mut out = Vec::with_capacity(bits);
        for i in 0..bits {
            out.push(bytes[i >> 3] & (1 << (i & 7)) != 0);
        }
        Ok(out)
    }
}

impl Default for ByteMessage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_varint(value: i32) {
        let mut buf = ByteMessage::new();
        buf.write_var_int(value);
        assert_eq!(buf.remaining(), ByteMessage::var_int_len(value));
        assert_eq!(buf.read_var_int().unwrap(), value);
    }

    #[test]
    fn varint_roundtrip() {
        for v in [0, 1, 2, 127, 128, 255, 300, 25565, 2097151, i32::MAX] {
            roundtrip_varint(v);
        }
        roundtrip_varint(-1);
        roundtrip_varint(i32::MIN);
    }

    #[test]
    fn varint_no_zigzag() {
        let mut buf = ByteMessage::new();
        buf.write_var_int(1);
        assert_eq!(buf.as_slice(), &[0x01]);
        let mut buf = ByteMessage::new();
        buf.write_var_int(300);
        assert_eq!(buf.as_slice(), &[0xAC, 0x02]);
    }

    #[test]
    fn varint_truncated() {
        let mut buf = ByteMessage::from_slice(&[0x80]);
        assert!(matches!(
            buf.read_var_int(),
            Err(ProtoError::TruncatedInput { .. })
        ));
        let mut buf = ByteMessage::new();
        assert!(buf.read_var_int().is_err());
    }

    #[test]
    fn varint_over_five_bytes_is_malformed() {
        let mut buf = ByteMessage::from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert!(matches!(
            buf.read_var_int(),
            Err(ProtoError::MalformedVarInt { .. })
        ));
    }

    #[test]
    fn string_roundtrip() {
        let mut buf = ByteMessage::new();
        buf.write_string("limbo");
        assert_eq!(buf.read_string().unwrap(), "limbo");

        let mut buf = ByteMessage::new();
        buf.write_string("");
        assert_eq!(buf.read_string().unwrap(), "");

        let mut buf = ByteMessage::new();
        buf.write_string("проверка");
        assert_eq!(buf.read_string().unwrap(), "проверка");
    }

    #[test]
    fn string_over_limit_fails() {
        let mut buf = ByteMessage::new();
        buf.write_string("abcdefgh");
        assert!(matches!(
            buf.read_string_limited(4),
            Err(ProtoError::StringTooLong { .. })
        ));
    }

    #[test]
    fn string_truncated_body() {
        let mut buf = ByteMessage::new();
        buf.write_var_int(10);
        buf.write_slice(b"abc");
        assert!(matches!(
            buf.read_string(),
            Err(ProtoError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn bytes_array_roundtrip() {
        let mut buf = ByteMessage::new();
        buf.write_bytes_array(&[1, 2, 3, 4]);
        assert_eq!(buf.read_bytes_array().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn uuid_roundtrip_and_format() {
        let uuid = Uuid::new(0x0123_4567_89AB_CDEF, 0xFEDC_BA98_7654_3210);
        let mut buf = ByteMessage::new();
        buf.write_uuid(uuid);
        assert_eq!(buf.remaining(), 16);
        assert_eq!(buf.read_uuid().unwrap(), uuid);
        assert_eq!(
            uuid.to_hyphenated(),
            "01234567-89ab-cdef-fedc-ba9876543210"
        );
    }

    #[test]
    fn fixed_bit_set_roundtrip() {
        let bits = [true, false, true, true, false, false, false, false, true];
        let mut buf = ByteMessage::new();
        buf.write_fixed_bit_set(&bits);
        assert_eq!(buf.remaining(), 2);
        assert_eq!(buf.read_fixed_bit_set(9).unwrap(), bits.to_vec());
    }

    #[test]
    fn fixed_width_big_endian() {
        let mut buf = ByteMessage::new();
        buf.write_i32(0x0102_0304);
        assert_eq!(buf.as_slice(), &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(buf.read_i32().unwrap(), 0x0102_0304);
    }

    #[test]
    fn reads_fail_cleanly_on_empty() {
        let mut buf = ByteMessage::new();
        assert!(buf.read_u8().is_err());
        assert!(buf.read_i64().is_err());
        assert!(buf.read_uuid().is_err());
        assert!(buf.read_fixed_bit_set(20).is_err());
    }
}
