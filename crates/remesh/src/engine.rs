use std::collections::HashMap;

use crate::types::{DroppedPeer, RemeshConfig, RemeshStats, TickOutcome};

#[derive(Clone, Copy, Debug, Default)]
struct PeerEvalState {
    last_score: Option<f64>,
    consecutive_bad_evals: u32,
}

/// Pure evaluation state machine behind the auto-remesh loop: takes a
/// fresh composite score per connected peer and decides which peers, if
/// any, to drop this tick. Holds no I/O and no async dependency, so the
/// decision logic is testable without spawning a task.
#[derive(Debug, Default)]
pub struct RemeshEngine {
    config: RemeshConfig,
    states: HashMap<String, PeerEvalState>,
    stats: RemeshStats,
}

impl RemeshEngine {
    /// Creates an engine with the given configuration and no peer history.
    #[must_use]
    pub fn new(config: RemeshConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
            stats: RemeshStats::default(),
        }
    }

    /// Runs one evaluation tick over the current composite scores of every
    /// connected peer, keyed by peer id.
    ///
    /// Implements §4.9 exactly: increment/reset `consecutive_bad_evals`,
    /// build the worst-first candidate drop set, drop while the mesh stays
    /// above `min_peers`, and skip any candidate whose score has changed
    /// by less than `hysteresis_margin` since its last evaluation.
    pub fn evaluate_tick(&mut self, scores: &HashMap<String, f64>) -> TickOutcome {
        self.stats.evaluations += 1;
        let connected_count = scores.len();

        for (peer_id, &score) in scores {
            let state = self.states.entry(peer_id.clone()).or_default();
            if score < self.config.min_threshold {
                state.consecutive_bad_evals += 1;
            } else {
                state.consecutive_bad_evals = 0;
            }
        }

        let mut candidates: Vec<(&String, f64)> = scores
            .iter()
            .filter(|(peer_id, _)| {
                self.states[*peer_id].consecutive_bad_evals >= self.config.min_evaluation_count
            })
            .map(|(peer_id, &score)| (peer_id, score))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut dropped = Vec::new();
        for (peer_id, score) in candidates {
            if connected_count - dropped.len() <= self.config.min_peers {
                break;
            }
            let last_score = self.states[peer_id].last_score;
            let within_hysteresis =
                last_score.is_some_and(|last| (score - last).abs() < self.config.hysteresis_margin);
            if within_hysteresis {
                continue;
            }
            dropped.push(DroppedPeer {
                peer_id: peer_id.clone(),
                score,
                reason: "score below threshold".to_string(),
            });
        }

        for (peer_id, &score) in scores {
            self.states.get_mut(peer_id).unwrap().last_score = Some(score);
        }

        self.stats.peers_dropped += dropped.len() as u64;
        if !dropped.is_empty() {
            self.stats.optimization_events += 1;
        }

        TickOutcome { dropped }
    }

    /// Records a replacement connection established after a drop, for the
    /// cumulative statistics.
    pub fn record_replacement(&mut self) {
        self.stats.replacements += 1;
    }

    /// Cumulative statistics across every tick run so far.
    #[must_use]
    pub fn stats(&self) -> RemeshStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(id, score)| (id.to_string(), *score)).collect()
    }

    #[test]
    fn a_peer_below_threshold_is_not_dropped_before_min_evaluation_count() {
        let mut engine = RemeshEngine::new(RemeshConfig::default());
        let bad = scores(&[("a", 90.0), ("b", 90.0), ("c", 90.0), ("bad", 10.0)]);
        let first = engine.evaluate_tick(&bad);
        let second = engine.evaluate_tick(&bad);
        assert!(first.dropped.is_empty());
        assert!(second.dropped.is_empty());
    }

    #[test]
    fn a_peer_stays_bad_for_min_evaluation_count_ticks_before_dropping() {
        let mut engine = RemeshEngine::new(RemeshConfig::default());
        let bad = scores(&[("a", 90.0), ("b", 90.0), ("c", 90.0), ("bad", 10.0)]);
        engine.evaluate_tick(&bad);
        engine.evaluate_tick(&bad);
        let outcome = engine.evaluate_tick(&bad);
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(outcome.dropped[0].peer_id, "bad");
        assert!(outcome.dropped[0].reason.contains("score"));
    }

    #[test]
    fn never_drops_below_the_min_peers_floor() {
        let mut config = RemeshConfig::default();
        config.min_peers = 2;
        let mut engine = RemeshEngine::new(config);
        let all_bad = scores(&[("a", 5.0), ("b", 5.0), ("c", 5.0)]);
        for _ in 0..3 {
            engine.evaluate_tick(&all_bad);
        }
        let outcome = engine.evaluate_tick(&all_bad);
        // three connected, floor is 2: at most one can be dropped this tick.
        assert!(outcome.dropped.len() <= 1);
    }

    #[test]
    fn recovering_above_threshold_resets_the_bad_eval_counter() {
        let mut engine = RemeshEngine::new(RemeshConfig::default());
        let bad = scores(&[("a", 90.0), ("recovering", 10.0)]);
        engine.evaluate_tick(&bad);
        engine.evaluate_tick(&bad);
        let recovered = scores(&[("a", 90.0), ("recovering", 90.0)]);
        engine.evaluate_tick(&recovered);
        let bad_again = scores(&[("a", 90.0), ("recovering", 10.0)]);
        engine.evaluate_tick(&bad_again);
        let outcome = engine.evaluate_tick(&bad_again);
        // the counter was reset by the recovery tick, so two more bad
        // ticks are not yet enough to reach min_evaluation_count (3).
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn hysteresis_blocks_a_drop_when_the_score_barely_moved() {
        let mut config = RemeshConfig::default();
        config.hysteresis_margin = 10.0;
        config.min_peers = 1;
        let mut engine = RemeshEngine::new(config);
        let tick1 = scores(&[("a", 90.0), ("flaky", 35.0)]);
        engine.evaluate_tick(&tick1);
        engine.evaluate_tick(&tick1);
        // flaky's score barely moves (35.0 -> 36.0, well under the 10-point
        // margin) so even once min_evaluation_count is reached it is not
        // actioned this tick.
        let tick2 = scores(&[("a", 90.0), ("flaky", 36.0)]);
        let outcome = engine.evaluate_tick(&tick2);
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn stats_accumulate_across_ticks() {
        let mut config = RemeshConfig::default();
        config.min_peers = 1;
        let mut engine = RemeshEngine::new(config);
        let bad = scores(&[("a", 90.0), ("bad", 5.0)]);
        for _ in 0..3 {
            engine.evaluate_tick(&bad);
        }
        let outcome = engine.evaluate_tick(&bad);
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(engine.stats().peers_dropped, 1);
        assert_eq!(engine.stats().optimization_events, 1);
        assert_eq!(engine.stats().evaluations, 4);
    }
}
