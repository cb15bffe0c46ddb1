//! Rolling checksum implementation for the delta codec.
//!
//! The rolling checksum is a weak but fast checksum used to identify
//! candidate blocks during delta transfers. It allows efficient sliding
//! window computation where updating the checksum for a shifted window
//! requires O(1) operations rather than recomputing from scratch.
//!
//! # Algorithm
//!
//! This module implements the Adler-32-style rolling checksum, which
//! maintains two 16-bit components (a simple sum and a weighted sum) that
//! can be incrementally updated as the window slides over data.
//!
//! # Example
//!
//! ```rust
//! use sentinelfs_checksums::rolling::RollingChecksum;
//!
//! let mut rolling = RollingChecksum::new();
//! rolling.update(b"hello");
//!
//! // Slide window: remove 'h', add '!'
//! rolling.roll(b'h', b'!').unwrap();
//! ```

mod checksum;
mod digest;
mod error;

pub use checksum::RollingChecksum;
pub use digest::RollingDigest;
pub use error::{RollingError, RollingSliceError};
