//! Varint length framing over the raw TCP stream.

use bytes::{Buf, Bytes, BytesMut};
use limbogate_proto::error::ProtoError;

/// Largest frame a limbo session ever legitimately receives.
pub const MAX_FRAME: usize = 64 * 1024;

/// Split one complete length-prefixed frame off the front of `buf`.
/// Returns `None` while the frame is still incomplete.
pub fn split_frame(buf: &mut BytesMut) -> Result<Option<Bytes>, ProtoError> {
    let mut len: u32 = 0;
    let mut shift = 0;
    let mut header = 0usize;
    for byte in buf.iter() {
        header += 1;
        len |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            let len = len as usize;
            if len > MAX_FRAME {
                return Err(ProtoError::MalformedField(format!(
                    "frame of {len} bytes exceeds limit"
                )));
            }
            if buf.len() < header + len {
                return Ok(None);
            }
            buf.advance(header);
            return Ok(Some(buf.split_to(len).freeze()));
        }
        shift += 7;
        if header == 5 {
            return Err(ProtoError::MalformedVarInt { max_bytes: 5 });
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_frames_in_order() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x02, 0xAA, 0xBB, 0x01, 0xCC]);
        assert_eq!(split_frame(&mut buf).unwrap().unwrap().as_ref(), &[0xAA, 0xBB]);
        assert_eq!(split_frame(&mut buf).unwrap().unwrap().as_ref(), &[0xCC]);
        assert!(split_frame(&mut buf).unwrap().is_none());
    }

    #[test]
    fn waits_for_partial_body() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x03, 0x01]);
        assert!(split_frame(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&[0x02, 0x03]);
        assert_eq!(
            split_frame(&mut buf).unwrap().unwrap().as_ref(),
            &[0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn oversized_frame_is_an_error() {
        let mut buf = BytesMut::new();
        // 0x80 0x80 0x40 = 1048576
        buf.extend_from_slice(&[0x80, 0x80, 0x40]);
        assert!(split_frame(&mut buf).is_err());
    }

    #[test]
    fn runaway_length_prefix_is_an_error() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(split_frame(&mut buf).is_err());
    }
}
