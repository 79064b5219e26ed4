//! Write-only NBT encoding for registry/dimension metadata blobs.
//!
//! The limbo only ever produces these (join-game dimension codecs and
//! the configuration-state registry payload), so decode is not
//! implemented. Two root forms exist on the wire: the classic named
//! root (empty name) and the nameless network form introduced in
//! 1.20.2.

use crate::codec::ByteMessage;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(Vec<Tag>),
    Compound(Vec<(String, Tag)>),
}

impl Tag {
    pub fn compound() -> CompoundBuilder {
        CompoundBuilder { entries: vec![] }
    }

    fn type_id(&self) -> u8 {
        match self {
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Classic root form: type id, empty root name, then the payload.
    pub fn write_named(&self, buf: &mut ByteMessage) {
        buf.write_u8(self.type_id());
        buf.write_u16(0); // root name, always empty here
        self.write_payload(buf);
    }

    /// 1.20.2+ network form: type id then payload, no root name.
    pub fn write_nameless(&self, buf: &mut ByteMessage) {
        buf.write_u8(self.type_id());
        self.write_payload(buf);
    }

    fn write_payload(&self, buf: &mut ByteMessage) {
        match self {
            Tag::Byte(v) => buf.write_i8(*v),
            Tag::Short(v) => buf.write_i16(*v),
            Tag::Int(v) => buf.write_i32(*v),
            Tag::Long(v) => buf.write_i64(*v),
            Tag::Float(v) => buf.write_f32(*v),
            Tag::Double(v) => buf.write_f64(*v),
            Tag::String(v) => {
                buf.write_u16(v.len() as u16);
                buf.write_slice(v.as_bytes());
            }
            Tag::ByteArray(v) => {
                buf.write_i32(v.len() as i32);
                for b in v {
                    buf.write_i8(*b);
                }
            }
            Tag::IntArray(v) => {
                buf.write_i32(v.len() as i32);
                for i in v {
                    buf.write_i32(*i);
                }
            }
            Tag::LongArray(v) => {
                buf.write_i32(v.len() as i32);
                for l in v {
                    buf.write_i64(*l);
                }
            }
            Tag::List(items) => {
                let element_type = items.first().map(Tag::type_id).unwrap_or(0);
                buf.write_u8(element_type);
                buf.write_i32(items.len() as i32);
                for item in items {
                    item.write_payload(buf);
                }
            }
            Tag::Compound(entries) => {
                for (name, tag) in entries {
                    buf.write_u8(tag.type_id());
                    buf.write_u16(name.len() as u16);
                    buf.write_slice(name.as_bytes());
                    tag.write_payload(buf);
                }
                buf.write_u8(0); // TAG_End
            }
        }
    }
}

pub struct CompoundBuilder {
    entries: Vec<(String, Tag)>,
}

impl CompoundBuilder {
    pub fn put(mut self, name: &str, tag: Tag) -> Self {
        self.entries.push((name.to_owned(), tag));
        self
    }

    pub fn put_string(self, name: &str, value: &str) -> Self {
        self.put(name, Tag::String(value.to_owned()))
    }

    pub fn put_byte(self, name: &str, value: i8) -> Self {
        self.put(name, Tag::Byte(value))
    }

    pub fn put_int(self, name: &str, value: i32) -> Self {
        self.put(name, Tag::Int(value))
    }

    pub fn put_long(self, name: &str, value: i64) -> Self {
        self.put(name, Tag::Long(value))
    }

    pub fn put_float(self, name: &str, value: f32) -> Self {
        self.put(name, Tag::Float(value))
    }

    pub fn put_double(self, name: &str, value: f64) -> Self {
        self.put(name, Tag::Double(value))
    }

    pub fn build(self) -> Tag {
        Tag::Compound(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_root_has_type_and_empty_name() {
        let tag = Tag::compound().put_byte("flag", 1).build();
        let mut buf = ByteMessage::new();
        tag.write_named(&mut buf);
        let bytes = buf.as_slice();
        assert_eq!(bytes[0], 10); // TAG_Compound
        assert_eq!(&bytes[1..3], &[0, 0]); // empty root name
        assert_eq!(*bytes.last().unwrap(), 0); // TAG_End
    }

    #[test]
    fn nameless_root_skips_name() {
        let tag = Tag::compound().put_byte("flag", 1).build();
        let mut named = ByteMessage::new();
        tag.write_named(&mut named);
        let mut nameless = ByteMessage::new();
        tag.write_nameless(&mut nameless);
        assert_eq!(nameless.remaining() + 2, named.remaining());
    }

    #[test]
    fn string_payload_is_short_prefixed() {
        let tag = Tag::String("hi".into());
        let mut buf = ByteMessage::new();
        tag.write_nameless(&mut buf);
        assert_eq!(buf.as_slice(), &[8, 0, 2, b'h', b'i']);
    }

    #[test]
    fn empty_list_writes_end_type() {
        let tag = Tag::List(vec![]);
        let mut buf = ByteMessage::new();
        tag.write_nameless(&mut buf);
        assert_eq!(buf.as_slice(), &[9, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn compound_entries_keep_insertion_order() {
        let tag = Tag::compound()
            .put_int("a", 1)
            .put_int("b", 2)
            .build();
        let mut buf = ByteMessage::new();
        tag.write_nameless(&mut buf);
        let bytes = buf.as_slice().to_vec();
        let a = bytes.windows(1).position(|w| w == b"a").unwrap();
        let b = bytes.windows(1).position(|w| w == b"b").unwrap();
        assert!(a < b);
    }
}
