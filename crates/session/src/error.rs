use thiserror::Error;

use sentinelfs_bandwidth::GovernorError;
use sentinelfs_wire::{MsgType, RejectReason, WireError};

/// Failure establishing or maintaining a peer session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A frame failed to decode or encode.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// The underlying transport returned an I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The handshake did not complete within the configured deadline.
    #[error("handshake timed out")]
    Timeout,
    /// A message of the wrong type arrived for the current handshake step.
    #[error("expected {expected:?}, received {actual:?}")]
    UnexpectedMessage {
        /// The message type the state machine was waiting for.
        expected: MsgType,
        /// The message type actually received.
        actual: MsgType,
    },
    /// The peer rejected the handshake.
    #[error("peer rejected handshake: {reason:?}: {detail}")]
    Rejected {
        /// Machine-readable rejection reason.
        reason: RejectReason,
        /// Human-readable detail from the `REJECT` payload.
        detail: String,
    },
    /// The connection closed before the handshake finished.
    #[error("connection closed during handshake")]
    ConnectionClosed,
    /// A received frame's sequence number did not match `expected_rx_seq`;
    /// the session must be reset.
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// The sequence number this session was expecting next.
        expected: u32,
        /// The sequence number the frame actually carried.
        actual: u32,
    },
    /// No frame has been received within the liveness timeout.
    #[error("liveness timeout: no frame received in time")]
    LivenessTimeout,
    /// The bandwidth governor denied capacity for an outbound frame.
    #[error(transparent)]
    Bandwidth(#[from] GovernorError),
}
