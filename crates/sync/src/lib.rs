#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `sentinelfs-sync` drives one file transfer end to end as a pair of pure
//! state machines — [`SenderPipeline`] and [`ReceiverPipeline`] — decoupled
//! from the actual network I/O, which lives in the daemon crate. The
//! receiver decides whether it needs nothing, a full file, or a delta; the
//! sender plans the transfer accordingly and paces `BLOCK_DATA` chunks
//! through a [`SlidingWindow`] so a fast sender cannot overrun a slow
//! receiver.
//!
//! # Example
//!
//! ```
//! use sentinelfs_checksums::Sha256;
//! use sentinelfs_sync::{ReceiverPipeline, SenderPipeline};
//! use sentinelfs_wire::AckType;
//!
//! let content = b"hello world".repeat(10);
//! let hash = Sha256::digest(&content);
//!
//! let mut receiver = ReceiverPipeline::new();
//! let ack = receiver.decide_ack(hash, None);
//! assert_eq!(ack, AckType::NeedFull);
//!
//! let mut sender = SenderPipeline::new();
//! sender.on_file_meta_ack(ack, &content, None, 32, 8).unwrap();
//!
//! loop {
//!     let sendable = sender.drain_sendable();
//!     if sendable.is_empty() {
//!         break;
//!     }
//!     for (index, data) in sendable {
//!         receiver.on_block_data(index, sender.total_chunks(), data);
//!         sender.on_block_ack(index);
//!     }
//! }
//!
//! assert_eq!(receiver.reassemble(hash).unwrap(), content);
//! ```

mod error;
mod ops_codec;
mod pipeline;
mod window;

pub use error::SyncError;
pub use ops_codec::{chunk_bytes, decode_ops, encode_ops};
pub use pipeline::{
    ReceiverPipeline, ReceiverState, SenderPipeline, SenderState, DEFAULT_BLOCK_SIZE,
};
pub use sentinelfs_delta::BlockSignature;
pub use window::{SlidingWindow, DEFAULT_WINDOW_SIZE};
