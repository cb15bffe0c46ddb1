#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `sentinelfs-delta` composes the rolling and strong checksums from
//! `sentinelfs-checksums` into the three rsync-style delta operations:
//! [`signatures`], [`delta`], and [`apply`]. The weak checksum gives O(n)
//! average scanning over the new file; the strong checksum confirms a weak
//! match before it is trusted, preventing a weak-checksum collision from
//! corrupting the reconstructed file.
//!
//! # Example
//!
//! ```
//! use sentinelfs_delta::{apply, delta, signatures};
//!
//! let base = b"the quick brown fox jumps over the lazy dog";
//! let new = b"the quick brown fox leaps over the lazy dog";
//!
//! let sigs = signatures(base, 8);
//! let result = delta(new, &sigs, 8);
//! let reconstructed = apply(base, &result).unwrap();
//! assert_eq!(reconstructed, new);
//! ```

mod codec;
mod error;
mod types;

pub use codec::{apply, delta, signatures};
pub use error::DeltaError;
pub use types::{BlockSignature, DeltaOp, DeltaResult, DeltaStats};
