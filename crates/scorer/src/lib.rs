#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Reduces a [`PeerMetrics`] snapshot to a single composite quality score
//! in `[0, 100]`. [`score`] is a pure, deterministic function: no shared
//! state, no I/O, trivially testable for the monotonicity property that
//! worsening any one axis never raises the score.

use std::time::Duration;

use sentinelfs_netmetrics::PeerMetrics;

/// Reference RTT at which the latency-axis score has decayed by `e^-k`.
pub const RTT_REFERENCE_MS: f64 = 100.0;
/// Decay steepness of the RTT axis.
pub const RTT_DECAY_K: f64 = 2.0;
/// Reference jitter at which the jitter-axis score has decayed by `e^-k`.
pub const JITTER_REFERENCE_MS: f64 = 20.0;
/// Decay steepness of the jitter axis.
pub const JITTER_DECAY_K: f64 = 2.5;
/// Reference loss rate at which the loss-axis score has decayed by `e^-k`.
pub const LOSS_REFERENCE: f64 = 0.02;
/// Decay steepness of the loss axis.
pub const LOSS_DECAY_K: f64 = 3.0;

/// Composite weight of the RTT axis. Weights must sum to 1.0.
pub const WEIGHT_RTT: f64 = 0.4;
/// Composite weight of the jitter axis.
pub const WEIGHT_JITTER: f64 = 0.3;
/// Composite weight of the loss axis.
pub const WEIGHT_LOSS: f64 = 0.3;

/// Maximum bonus points awarded for a long, reset-free connection.
pub const MAX_STABILITY_BONUS: f64 = 10.0;
/// Uptime at which the stability bonus reaches its maximum scale.
pub const DEFAULT_STABLE_THRESHOLD: Duration = Duration::from_secs(300);
/// Fraction of the stability bonus removed per recorded connection reset.
pub const CONNECTION_RESET_PENALTY: f64 = 0.2;

/// Score returned when there is not yet enough data to judge a peer.
pub const NEUTRAL_SCORE: f64 = 50.0;

fn decay_score(sample: f64, reference: f64, k: f64) -> f64 {
    (100.0 * (-k * sample / reference).exp()).clamp(0.0, 100.0)
}

/// Composite quality score using [`DEFAULT_STABLE_THRESHOLD`].
#[must_use]
pub fn score(metrics: &PeerMetrics) -> f64 {
    score_with_stable_threshold(metrics, DEFAULT_STABLE_THRESHOLD)
}

/// Composite quality score with an explicit stability-bonus threshold.
///
/// Returns [`NEUTRAL_SCORE`] when `metrics` has no packets sent yet or no
/// RTT samples (there is nothing to judge). Otherwise: each axis decays
/// exponentially from 100 as its sample grows past its reference value,
/// the three axes combine by weight, and a stability bonus of up to
/// [`MAX_STABILITY_BONUS`] points is added, scaled down by recent
/// connection resets.
#[must_use]
pub fn score_with_stable_threshold(metrics: &PeerMetrics, stable_threshold: Duration) -> f64 {
    if metrics.packets_sent() == 0 || metrics.rtt_avg().is_zero() {
        return NEUTRAL_SCORE;
    }

    let rtt_score = decay_score(metrics.rtt_avg().as_secs_f64() * 1000.0, RTT_REFERENCE_MS, RTT_DECAY_K);
    let jitter_score = decay_score(metrics.jitter_ms(), JITTER_REFERENCE_MS, JITTER_DECAY_K);
    let loss_score = decay_score(metrics.loss_rate(), LOSS_REFERENCE, LOSS_DECAY_K);

    let composite = WEIGHT_RTT * rtt_score + WEIGHT_JITTER * jitter_score + WEIGHT_LOSS * loss_score;

    let stability_scale = (metrics.uptime().as_secs_f64() / stable_threshold.as_secs_f64()).min(1.0);
    let reset_penalty = (1.0 - CONNECTION_RESET_PENALTY * metrics.connection_resets() as f64).max(0.0);
    let bonus = MAX_STABILITY_BONUS * stability_scale * reset_penalty;

    (composite + bonus).clamp(0.0, 100.0)
}
