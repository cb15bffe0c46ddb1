use std::num::NonZeroU64;
use std::time::{Duration, Instant};

const MICROS_PER_SECOND: u128 = 1_000_000;
const MINIMUM_SLEEP_MICROS: u128 = MICROS_PER_SECOND / 10;
const MAX_REPRESENTABLE_MICROSECONDS: u128 =
    (u64::MAX as u128) * MICROS_PER_SECOND + (MICROS_PER_SECOND - 1);

/// Smallest chunk size a bucket ever recommends before the next pacing check.
pub(crate) const MIN_WRITE_MAX: usize = 512;

fn duration_from_microseconds(us: u128) -> Duration {
    if us == 0 {
        return Duration::ZERO;
    }
    if us > MAX_REPRESENTABLE_MICROSECONDS {
        return Duration::MAX;
    }
    let seconds = (us / MICROS_PER_SECOND) as u64;
    let micros = (us % MICROS_PER_SECOND) as u32;
    Duration::new(seconds, micros.saturating_mul(1_000))
}

fn calculate_write_max(limit: NonZeroU64, burst: Option<NonZeroU64>) -> usize {
    let kib = if limit.get() < 1024 {
        1
    } else {
        limit.get() / 1024
    };

    let base_write_max = u128::from(kib)
        .saturating_mul(128)
        .max(MIN_WRITE_MAX as u128);
    let mut write_max = base_write_max.min(usize::MAX as u128) as usize;

    if let Some(burst) = burst {
        let burst = burst.get().min(usize::MAX as u64);
        write_max = usize::try_from(burst)
            .unwrap_or(usize::MAX)
            .max(MIN_WRITE_MAX)
            .max(1);
    }

    write_max.max(MIN_WRITE_MAX)
}

/// Token-bucket pacing state for a single transfer direction.
///
/// The bucket tracks an outstanding byte debt rather than a token balance:
/// every [`reserve`](Self::reserve) call adds to the debt, and wall-clock
/// time elapsed since the previous call pays it down at the configured
/// byte-per-second rate. This mirrors a debt-based limiter rather than a
/// classic refilling bucket, which keeps the accounting exact even when
/// callers reserve wildly different chunk sizes.
#[derive(Clone, Debug)]
pub struct TokenBucket {
    limit_bytes: NonZeroU64,
    write_max: usize,
    burst_bytes: Option<NonZeroU64>,
    total_written: u128,
    last_instant: Option<Instant>,
}

impl TokenBucket {
    /// Constructs a bucket capped at `limit` bytes per second.
    #[must_use]
    pub fn new(limit: NonZeroU64) -> Self {
        Self::with_burst(limit, None)
    }

    /// Constructs a bucket capped at `limit` bytes per second with an explicit burst ceiling.
    #[must_use]
    pub fn with_burst(limit: NonZeroU64, burst: Option<NonZeroU64>) -> Self {
        Self {
            limit_bytes: limit,
            write_max: calculate_write_max(limit, burst),
            burst_bytes: burst,
            total_written: 0,
            last_instant: None,
        }
    }

    /// Applies a new rate and burst ceiling, discarding any accumulated debt.
    pub fn reconfigure(&mut self, limit: NonZeroU64, burst: Option<NonZeroU64>) {
        self.limit_bytes = limit;
        self.write_max = calculate_write_max(limit, burst);
        self.burst_bytes = burst;
        self.total_written = 0;
        self.last_instant = None;
    }

    /// Returns the configured rate in bytes per second.
    #[must_use]
    pub const fn limit_bytes(&self) -> NonZeroU64 {
        self.limit_bytes
    }

    /// Returns the configured burst ceiling in bytes, if any.
    #[must_use]
    pub const fn burst_bytes(&self) -> Option<NonZeroU64> {
        self.burst_bytes
    }

    /// Returns the largest chunk a caller should reserve before re-checking pacing.
    #[must_use]
    pub fn recommended_chunk_size(&self, buffer_len: usize) -> usize {
        buffer_len.min(self.write_max.max(1))
    }

    #[inline]
    fn clamp_debt_to_burst(&mut self) {
        if let Some(burst) = self.burst_bytes {
            self.total_written = self.total_written.min(u128::from(burst.get()));
        }
    }

    /// Records a reservation of `bytes` and returns how long the caller should
    /// wait before the accumulated debt is considered paid.
    ///
    /// Debt below the 100ms minimum sleep threshold is retained rather than
    /// rounded away, so a burst of tiny writes still eventually triggers a
    /// single coalesced pause.
    pub fn reserve(&mut self, bytes: usize) -> Duration {
        if bytes == 0 {
            return Duration::ZERO;
        }

        self.total_written = self.total_written.saturating_add(bytes as u128);
        self.clamp_debt_to_burst();

        let now = Instant::now();
        let bytes_per_second = u128::from(self.limit_bytes.get());

        if let Some(previous) = self.last_instant {
            let elapsed_us = now
                .duration_since(previous)
                .as_micros()
                .min(u128::from(u64::MAX));
            if elapsed_us > 0 {
                let allowed = elapsed_us.saturating_mul(bytes_per_second) / MICROS_PER_SECOND;
                self.total_written = self.total_written.saturating_sub(allowed);
            }
        }
        self.clamp_debt_to_burst();

        let sleep_us = self.total_written.saturating_mul(MICROS_PER_SECOND) / bytes_per_second;

        if sleep_us < MINIMUM_SLEEP_MICROS {
            self.last_instant = Some(now);
            return Duration::ZERO;
        }

        let requested = duration_from_microseconds(sleep_us);
        // The debt is treated as settled once the caller honours `requested`;
        // the next reservation measures elapsed time from that predicted
        // instant so pacing stays accurate without re-entering this bucket.
        self.total_written = 0;
        self.last_instant = Some(now + requested);
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(value: u64) -> NonZeroU64 {
        NonZeroU64::new(value).expect("non-zero value required")
    }

    #[test]
    fn calculate_write_max_small_limit_uses_minimum() {
        assert_eq!(calculate_write_max(nz(100), None), MIN_WRITE_MAX);
    }

    #[test]
    fn calculate_write_max_large_limit_scales_with_rate() {
        assert_eq!(calculate_write_max(nz(1024 * 100), None), 12800);
    }

    #[test]
    fn calculate_write_max_burst_overrides_rate() {
        assert_eq!(
            calculate_write_max(nz(1024 * 100), Some(nz(8192))),
            8192
        );
    }

    #[test]
    fn reserve_zero_bytes_never_sleeps() {
        let mut bucket = TokenBucket::new(nz(1024));
        assert_eq!(bucket.reserve(0), Duration::ZERO);
    }

    #[test]
    fn reserve_small_write_under_minimum_does_not_sleep() {
        let mut bucket = TokenBucket::new(nz(1_000_000));
        // 1 byte at 1MB/s implies a sub-microsecond sleep, far under the
        // 100ms coalescing threshold.
        assert_eq!(bucket.reserve(1), Duration::ZERO);
    }

    #[test]
    fn reserve_large_write_requests_a_sleep() {
        let mut bucket = TokenBucket::new(nz(1024));
        let sleep = bucket.reserve(1024 * 1024);
        assert!(sleep > Duration::ZERO);
    }

    #[test]
    fn reserve_respects_burst_ceiling() {
        let mut bucket = TokenBucket::with_burst(nz(1024), Some(nz(2048)));
        let first = bucket.reserve(1_000_000);
        let second = bucket.reserve(1_000_000);
        // Debt is clamped to the burst ceiling, so neither sleep can exceed
        // the time needed to drain `burst_bytes` at `limit_bytes`.
        let max_sleep = Duration::from_secs(2);
        assert!(first <= max_sleep);
        assert!(second <= max_sleep);
    }

    #[test]
    fn reconfigure_resets_accumulated_debt() {
        let mut bucket = TokenBucket::new(nz(1024));
        let _ = bucket.reserve(1024 * 1024);
        bucket.reconfigure(nz(2048), None);
        assert_eq!(bucket.limit_bytes().get(), 2048);
        assert_eq!(bucket.reserve(1), Duration::ZERO);
    }

    #[test]
    fn recommended_chunk_size_caps_to_write_max() {
        let bucket = TokenBucket::new(nz(1024 * 100));
        assert_eq!(bucket.recommended_chunk_size(usize::MAX), 12800);
        assert_eq!(bucket.recommended_chunk_size(100), 100);
    }
}
