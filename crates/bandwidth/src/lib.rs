#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `sentinelfs_bandwidth` centralises the token-bucket pacing applied to
//! outbound and inbound transfer traffic. The crate exposes a
//! [`BandwidthGovernor`] that holds one independent [`TokenBucket`] per
//! [`Direction`] (upload and download), so a peer can cap its seed rate
//! without throttling concurrent fetches.
//!
//! # Design
//!
//! - [`TokenBucket`] implements the pacing algorithm: it accumulates a byte
//!   debt on every [`TokenBucket::reserve`] call, lets elapsed wall-clock
//!   time pay the debt down at the configured rate, and reports how long the
//!   caller must wait before the debt is considered settled.
//! - [`BandwidthGovernor::acquire`] wraps a bucket lookup with
//!   [`tokio::time::sleep`], so callers `await` the pacing delay instead of
//!   blocking a worker thread. An optional deadline lets callers bound how
//!   long they are willing to wait before giving up.
//!
//! # Invariants
//!
//! - The governor never sleeps for intervals shorter than 100ms; debt below
//!   that threshold is carried forward instead, coalescing many small writes
//!   into a single pause.
//! - A direction with no configured limit never sleeps.
//!
//! # Examples
//!
//! ```
//! use sentinelfs_bandwidth::{BandwidthGovernor, Direction};
//! use std::num::NonZeroU64;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let governor = BandwidthGovernor::new();
//! governor.set_limit(Direction::Upload, Some(NonZeroU64::new(1 << 20).unwrap()), None);
//! governor.acquire(64 * 1024, Direction::Upload, None).await.unwrap();
//! # }
//! ```

mod governor;

pub use governor::{BandwidthGovernor, Direction, GovernorError, TokenBucket};
