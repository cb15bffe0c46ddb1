mod bucket;

pub use bucket::TokenBucket;

use std::num::NonZeroU64;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Mutex;

/// Transfer direction a [`BandwidthGovernor`] paces independently.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Bytes sent to a peer (serving block data or signatures).
    Upload,
    /// Bytes received from a peer.
    Download,
}

/// Error returned by [`BandwidthGovernor::acquire`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum GovernorError {
    /// The caller's deadline would elapse before the pacing delay clears.
    #[error("bandwidth pacing delay would exceed the caller's deadline")]
    DeadlineExceeded,
}

/// Paces upload and download traffic independently using one [`TokenBucket`] per direction.
///
/// A direction with no configured limit (the default) never delays callers.
/// Reconfiguring a limit at runtime replaces that direction's bucket,
/// discarding any debt accumulated under the previous rate.
#[derive(Debug, Default)]
pub struct BandwidthGovernor {
    upload: Mutex<Option<TokenBucket>>,
    download: Mutex<Option<TokenBucket>>,
}

impl BandwidthGovernor {
    /// Constructs a governor with no configured limits in either direction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            upload: Mutex::new(None),
            download: Mutex::new(None),
        }
    }

    /// Constructs a governor with initial limits for both directions.
    #[must_use]
    pub fn with_limits(
        upload: Option<(NonZeroU64, Option<NonZeroU64>)>,
        download: Option<(NonZeroU64, Option<NonZeroU64>)>,
    ) -> Self {
        Self {
            upload: Mutex::new(upload.map(|(limit, burst)| TokenBucket::with_burst(limit, burst))),
            download: Mutex::new(
                download.map(|(limit, burst)| TokenBucket::with_burst(limit, burst)),
            ),
        }
    }

    fn bucket_for(&self, direction: Direction) -> &Mutex<Option<TokenBucket>> {
        match direction {
            Direction::Upload => &self.upload,
            Direction::Download => &self.download,
        }
    }

    /// Reserves `bytes` against `direction`'s bucket, sleeping until the
    /// resulting pacing debt clears.
    ///
    /// `deadline` bounds how long the caller is willing to wait; when the
    /// required sleep would finish after `deadline`, the reservation is
    /// still recorded (the debt was incurred) but the call returns
    /// [`GovernorError::DeadlineExceeded`] instead of sleeping past the
    /// deadline, matching the "signal and let the caller decide" pattern the
    /// rest of the daemon uses for cancellation.
    pub async fn acquire(
        &self,
        bytes: usize,
        direction: Direction,
        deadline: Option<Instant>,
    ) -> Result<(), GovernorError> {
        let sleep = {
            let mut guard = self.bucket_for(direction).lock().await;
            match guard.as_mut() {
                Some(bucket) => bucket.reserve(bytes),
                None => return Ok(()),
            }
        };

        if sleep.is_zero() {
            return Ok(());
        }

        if let Some(deadline) = deadline
            && Instant::now() + sleep > deadline
        {
            return Err(GovernorError::DeadlineExceeded);
        }

        tokio::time::sleep(sleep).await;
        Ok(())
    }

    /// Returns the chunk size `direction` currently recommends before the next pacing check.
    ///
    /// An unlimited direction recommends `buffer_len` unchanged.
    pub async fn recommended_chunk_size(&self, direction: Direction, buffer_len: usize) -> usize {
        let guard = self.bucket_for(direction).lock().await;
        guard
            .as_ref()
            .map_or(buffer_len, |bucket| bucket.recommended_chunk_size(buffer_len))
    }

    /// Sets or clears `direction`'s rate limit. Passing `limit = None` disables pacing.
    pub async fn set_limit(
        &self,
        direction: Direction,
        limit: Option<NonZeroU64>,
        burst: Option<NonZeroU64>,
    ) {
        let mut guard = self.bucket_for(direction).lock().await;
        *guard = limit.map(|limit| TokenBucket::with_burst(limit, burst));
    }
}
