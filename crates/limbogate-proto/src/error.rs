//! Protocol-level errors.

use thiserror::Error;

use crate::registry::PacketKind;
use crate::version::Version;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("buffer too short: need {needed} more bytes, have {remaining}")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("VarInt is too long (more than {max_bytes} bytes)")]
    MalformedVarInt { max_bytes: usize },

    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    #[error("string too long: {len} chars, limit {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("no packet mapping for id 0x{id:02X} in {version}")]
    UnknownPacketId { version: Version, id: i32 },

    #[error("no id mapping for {kind:?} in {version}")]
    UnknownPacketKind { version: Version, kind: PacketKind },

    #[error("malformed field: {0}")]
    MalformedField(String),
}

impl ProtoError {
    /// Whether this failure must close the connection. Mapping misses
    /// survive (ids drift across versions); everything else is a
    /// protocol violation.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ProtoError::UnknownPacketId { .. } | ProtoError::UnknownPacketKind { .. }
        )
    }
}
