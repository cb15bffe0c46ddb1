#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Per-peer network-quality tracking: a bounded RTT history feeding a
//! running average/min/max and a jitter estimate, packet-loss counters,
//! an exponentially-smoothed bandwidth estimate, and connection-reset
//! bookkeeping. [`PeerMetrics`] is the snapshot `sentinelfs-scorer`
//! reduces to a single composite quality number.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Maximum number of RTT samples retained for the jitter/avg/min/max
/// calculation. Older samples are evicted first.
pub const RTT_HISTORY_CAPACITY: usize = 20;

/// Smoothing factor for the bandwidth exponential moving average.
pub const BANDWIDTH_EMA_ALPHA: f64 = 0.3;

/// Network-quality state tracked for one peer.
///
/// All reads observe a consistent snapshot: every update method takes
/// `&mut self`, so a caller sharing one instance across tasks wraps it in
/// a lock (e.g. `tokio::sync::RwLock`) at the call site rather than this
/// type managing its own synchronization.
#[derive(Clone, Debug)]
pub struct PeerMetrics {
    rtt_history: VecDeque<Duration>,
    rtt_current: Option<Duration>,
    rtt_min: Option<Duration>,
    rtt_max: Option<Duration>,
    jitter_ms: f64,
    packets_sent: u64,
    packets_lost: u64,
    bandwidth_est_mbps: f64,
    connection_resets: u64,
    first_seen: Instant,
    last_successful_probe: Option<Instant>,
    composite_score: f64,
}

impl PeerMetrics {
    /// Creates an empty metrics record, timestamped as first seen now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rtt_history: VecDeque::with_capacity(RTT_HISTORY_CAPACITY),
            rtt_current: None,
            rtt_min: None,
            rtt_max: None,
            jitter_ms: 0.0,
            packets_sent: 0,
            packets_lost: 0,
            bandwidth_est_mbps: 0.0,
            connection_resets: 0,
            first_seen: Instant::now(),
            last_successful_probe: None,
            composite_score: 50.0,
        }
    }

    /// Appends an RTT sample, evicting the oldest once the history is at
    /// [`RTT_HISTORY_CAPACITY`], then recomputes the running average,
    /// min/max, and jitter (population standard deviation of the ring).
    pub fn update_rtt(&mut self, sample: Duration) {
        if self.rtt_history.len() == RTT_HISTORY_CAPACITY {
            self.rtt_history.pop_front();
        }
        self.rtt_history.push_back(sample);
        self.rtt_current = Some(sample);
        self.rtt_min = Some(self.rtt_min.map_or(sample, |min| min.min(sample)));
        self.rtt_max = Some(self.rtt_max.map_or(sample, |max| max.max(sample)));
        self.jitter_ms = stddev_ms(&self.rtt_history);
        self.last_successful_probe = Some(Instant::now());
    }

    /// Records that a probe packet was sent.
    pub fn record_packet_sent(&mut self) {
        self.packets_sent += 1;
    }

    /// Records that a sent probe packet was lost.
    pub fn record_packet_lost(&mut self) {
        self.packets_lost += 1;
    }

    /// Records a transport reset, penalizing the stability bonus the
    /// scorer applies.
    pub fn record_connection_reset(&mut self) {
        self.connection_resets += 1;
    }

    /// Folds a throughput sample into the bandwidth EMA.
    /// Samples with zero duration are ignored (would divide by zero).
    pub fn update_bandwidth(&mut self, bytes: u64, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let mbps = (bytes as f64 * 8.0) / duration.as_secs_f64() / 1_000_000.0;
        self.bandwidth_est_mbps =
            BANDWIDTH_EMA_ALPHA * mbps + (1.0 - BANDWIDTH_EMA_ALPHA) * self.bandwidth_est_mbps;
    }

    /// Most recent RTT sample, if any.
    #[must_use]
    pub fn rtt_current(&self) -> Option<Duration> {
        self.rtt_current
    }

    /// Mean of the retained RTT history; `Duration::ZERO` with no samples.
    #[must_use]
    pub fn rtt_avg(&self) -> Duration {
        if self.rtt_history.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.rtt_history.iter().sum();
        total / self.rtt_history.len() as u32
    }

    /// Smallest RTT sample retained, if any.
    #[must_use]
    pub fn rtt_min(&self) -> Option<Duration> {
        self.rtt_min
    }

    /// Largest RTT sample retained, if any.
    #[must_use]
    pub fn rtt_max(&self) -> Option<Duration> {
        self.rtt_max
    }

    /// Population standard deviation of the retained RTT history, in ms.
    #[must_use]
    pub fn jitter_ms(&self) -> f64 {
        self.jitter_ms
    }

    /// Total probe packets sent.
    #[must_use]
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Total probe packets lost.
    #[must_use]
    pub fn packets_lost(&self) -> u64 {
        self.packets_lost
    }

    /// `packets_lost / packets_sent`, or `0.0` with no packets sent yet.
    #[must_use]
    pub fn loss_rate(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.packets_lost as f64 / self.packets_sent as f64
        }
    }

    /// Exponentially-smoothed bandwidth estimate in Mbps.
    #[must_use]
    pub fn bandwidth_est_mbps(&self) -> f64 {
        self.bandwidth_est_mbps
    }

    /// Number of connection resets recorded for this peer.
    #[must_use]
    pub fn connection_resets(&self) -> u64 {
        self.connection_resets
    }

    /// Time elapsed since this record was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.first_seen.elapsed()
    }

    /// Time of the most recent successful RTT probe, if any.
    #[must_use]
    pub fn last_successful_probe(&self) -> Option<Instant> {
        self.last_successful_probe
    }

    /// Most recently computed composite quality score, as stored by
    /// `sentinelfs-scorer` via
    /// [`set_composite_score`](Self::set_composite_score).
    #[must_use]
    pub fn composite_score(&self) -> f64 {
        self.composite_score
    }

    /// Stores a freshly computed composite score (0-100) alongside the
    /// raw metrics it was derived from.
    pub fn set_composite_score(&mut self, score: f64) {
        self.composite_score = score;
    }
}

impl Default for PeerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn stddev_ms(history: &VecDeque<Duration>) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let samples_ms: Vec<f64> = history
        .iter()
        .map(|d| d.as_secs_f64() * 1000.0)
        .collect();
    let mean = samples_ms.iter().sum::<f64>() / samples_ms.len() as f64;
    let variance =
        samples_ms.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples_ms.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rtt_average_and_bounds_update_as_samples_arrive() {
        let mut metrics = PeerMetrics::new();
        metrics.update_rtt(Duration::from_millis(100));
        metrics.update_rtt(Duration::from_millis(200));
        metrics.update_rtt(Duration::from_millis(150));
        assert_eq!(metrics.rtt_avg(), Duration::from_millis(150));
        assert_eq!(metrics.rtt_min(), Some(Duration::from_millis(100)));
        assert_eq!(metrics.rtt_max(), Some(Duration::from_millis(200)));
        assert_eq!(metrics.rtt_current(), Some(Duration::from_millis(150)));
    }

    #[test]
    fn rtt_history_evicts_the_oldest_sample_beyond_capacity() {
        let mut metrics = PeerMetrics::new();
        for ms in 0..RTT_HISTORY_CAPACITY as u64 + 5 {
            metrics.update_rtt(Duration::from_millis(ms));
        }
        assert_eq!(metrics.rtt_min(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn jitter_is_zero_for_constant_rtt() {
        let mut metrics = PeerMetrics::new();
        for _ in 0..5 {
            metrics.update_rtt(Duration::from_millis(50));
        }
        assert_eq!(metrics.jitter_ms(), 0.0);
    }

    #[test]
    fn loss_rate_tracks_sent_and_lost_packets() {
        let mut metrics = PeerMetrics::new();
        for _ in 0..10 {
            metrics.record_packet_sent();
        }
        for _ in 0..2 {
            metrics.record_packet_lost();
        }
        assert!((metrics.loss_rate() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn bandwidth_ema_smooths_toward_repeated_samples() {
        let mut metrics = PeerMetrics::new();
        metrics.update_bandwidth(1_000_000, Duration::from_secs(1)); // 8 Mbps
        let first = metrics.bandwidth_est_mbps();
        assert!(first > 0.0 && first < 8.0);
        for _ in 0..50 {
            metrics.update_bandwidth(1_000_000, Duration::from_secs(1));
        }
        assert!((metrics.bandwidth_est_mbps() - 8.0).abs() < 0.01);
    }

    #[test]
    fn zero_duration_bandwidth_samples_are_ignored() {
        let mut metrics = PeerMetrics::new();
        metrics.update_bandwidth(1_000_000, Duration::ZERO);
        assert_eq!(metrics.bandwidth_est_mbps(), 0.0);
    }

    #[test]
    fn composite_score_defaults_to_neutral_until_set() {
        let metrics = PeerMetrics::new();
        assert_eq!(metrics.composite_score(), 50.0);
    }
}
