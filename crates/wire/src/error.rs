use thiserror::Error;

/// Errors raised while decoding a frame or a message payload.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum WireError {
    /// Magic, version, checksum, or sequence-number validation failed. The
    /// peer resets the session on any of these per the framing invariant.
    #[error("frame invalid: {detail}")]
    FrameInvalid {
        /// Human-readable description of which check failed.
        detail: String,
    },
    /// A declared payload length exceeds the 16 MiB wire limit.
    #[error("payload of {len} bytes exceeds the 16 MiB frame limit")]
    PayloadTooLarge {
        /// The offending declared length.
        len: u32,
    },
    /// Fewer bytes were available than the header or payload length requires.
    #[error("truncated frame: expected at least {expected} bytes, got {actual}")]
    TruncatedPayload {
        /// Bytes required to decode the frame or field.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },
    /// The frame's `msg_type` does not match any known message.
    #[error("unknown message type 0x{0:04x}")]
    UnknownMsgType(u16),
    /// A `REJECT` payload carried an unrecognised reason code.
    #[error("unknown reject reason code {0}")]
    UnknownRejectReason(u16),
    /// A `FILE_META_ACK` payload carried an unrecognised `ack_type`.
    #[error("unknown ack type {0}")]
    UnknownAckType(u8),
}
