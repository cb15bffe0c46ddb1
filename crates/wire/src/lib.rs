//! Frame format, handshake messages, and the `tokio_util` codec for the
//! SentinelFS peer wire protocol.
//!
//! Every frame is a fixed 22-byte header (magic, version, message type,
//! payload length, sequence number, flags, CRC-32 checksum) followed by a
//! payload whose layout is determined by the message type. [`FrameCodec`]
//! adapts this format to `tokio_util::codec`, and [`Message`] parses the
//! typed payload once the message type is known.
//!
//! ```
//! use sentinelfs_wire::{capability, Frame, Hello, Message, MsgType};
//!
//! let hello = Message::Hello(Hello {
//!     protocol_version: 1,
//!     peer_id: b"node-a".to_vec(),
//!     session_code: b"swordfish".to_vec(),
//!     capabilities: capability::DELTA_SYNC,
//!     proposed_chunk_size: 4096,
//! });
//!
//! let frame = Frame::new(hello.msg_type() as u16, 0, hello.encode_payload());
//! let bytes = frame.encode().unwrap();
//!
//! let decoded_frame = Frame::decode(&bytes).unwrap();
//! let msg_type = MsgType::try_from(decoded_frame.msg_type).unwrap();
//! let decoded = Message::decode(msg_type, &decoded_frame.payload).unwrap();
//! assert_eq!(decoded, hello);
//! ```

mod codec;
mod error;
mod frame;
mod message;
mod reader;

pub use codec::FrameCodec;
pub use error::WireError;
pub use frame::{Frame, HEADER_LEN, MAGIC, MAX_PAYLOAD_LEN, PROTOCOL_VERSION};
pub use message::{
    capability, AckType, BlockAck, BlockData, DeleteFile, FileMeta, FileMetaAck, Hello, Message,
    MsgType, Reject, RejectReason, SignatureEntry, SignatureList, TransferComplete, Welcome,
};
