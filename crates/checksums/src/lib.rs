#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `sentinelfs-checksums` provides the rolling and strong checksum
//! primitives the delta codec builds on. The rolling checksum identifies
//! candidate blocks cheaply during a sliding-window scan; the strong digest
//! confirms a candidate before it is trusted as a match.
//!
//! # Design
//!
//! - [`rolling`] implements the Adler-32-style weak checksum used for block
//!   matching during delta transfers.
//! - [`strong`] exposes the [`strong::StrongDigest`] trait and its SHA-256
//!   implementation, the cryptographic digest named in the data model as
//!   `strong_32B` / `file_hash_32B`.
//!
//! # Invariants
//!
//! - [`rolling::RollingChecksum`] truncates both state components to 16 bits
//!   after every update.
//! - Rolling updates reject mismatched slice lengths and empty windows so the
//!   caller never observes silent state corruption.
//! - Strong digests stream data incrementally and never panic.
//!
//! # Examples
//!
//! ```
//! use sentinelfs_checksums::rolling::RollingChecksum;
//!
//! let mut rolling = RollingChecksum::new();
//! rolling.update(b"abcd");
//! assert_eq!(rolling.len(), 4);
//!
//! rolling.roll(b'a', b'e').unwrap();
//! assert_eq!(rolling.len(), 4);
//! ```

pub mod rolling;
pub mod strong;

pub use rolling::{RollingChecksum, RollingDigest, RollingError, RollingSliceError};
pub use strong::{Sha256, StrongDigest};
