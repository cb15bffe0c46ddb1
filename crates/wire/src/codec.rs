use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::WireError;
use crate::frame::{Frame, HEADER_LEN, MAX_PAYLOAD_LEN};

/// `tokio_util` codec that frames a byte stream into [`Frame`]s.
///
/// Peeks the header's `payload_len` field before a whole frame is buffered,
/// so a single read that straddles two frames does not force a copy of data
/// that has not arrived yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let payload_len = u32::from_le_bytes(src[8..12].try_into().unwrap());
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(WireError::PayloadTooLarge { len: payload_len });
        }

        let total_len = HEADER_LEN + payload_len as usize;
        if src.len() < total_len {
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        let frame_bytes = src.split_to(total_len);
        Frame::decode(&frame_bytes).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = WireError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = item.encode()?;
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_waits_for_a_complete_frame() {
        let frame = Frame::new(0x10, 1, b"hello".to_vec());
        let bytes = frame.encode().unwrap();

        let mut codec = FrameCodec;
        let mut buf = BytesMut::from(&bytes[..HEADER_LEN - 1]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&bytes[HEADER_LEN - 1..]);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_handles_back_to_back_frames() {
        let first = Frame::new(0x10, 1, b"one".to_vec());
        let second = Frame::new(0x11, 2, b"two".to_vec());

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&first.encode().unwrap());
        buf.extend_from_slice(&second.encode().unwrap());

        let mut codec = FrameCodec;
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(first));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(second));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let frame = Frame::new(0x13, 42, vec![7u8; 1024]);
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        codec.encode(frame.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn decode_propagates_oversized_payload_error() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&crate::frame::MAGIC.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0x10u16.to_le_bytes());
        buf.extend_from_slice(&(MAX_PAYLOAD_LEN + 1).to_le_bytes());
        buf.extend_from_slice(&[0u8; 10]); // seq, flags, checksum

        let mut codec = FrameCodec;
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { .. }));
    }
}
