use std::time::Duration;

/// Tunables for the auto-remesh loop.
#[derive(Clone, Debug, PartialEq)]
pub struct RemeshConfig {
    /// How often the loop re-evaluates peer scores.
    pub period: Duration,
    /// Composite score below which a peer is considered unhealthy.
    pub min_threshold: f64,
    /// Consecutive unhealthy evaluations before a peer becomes a drop
    /// candidate.
    pub min_evaluation_count: u32,
    /// The mesh never drops a peer if doing so would leave fewer than
    /// this many peers connected.
    pub min_peers: usize,
    /// A peer whose score has changed by less than this amount since its
    /// last evaluation is not acted upon this tick, even if it otherwise
    /// qualifies for dropping.
    pub hysteresis_margin: f64,
}

impl Default for RemeshConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(30),
            min_threshold: 40.0,
            min_evaluation_count: 3,
            min_peers: 2,
            hysteresis_margin: 10.0,
        }
    }
}

/// One peer dropped by an evaluation tick.
#[derive(Clone, Debug, PartialEq)]
pub struct DroppedPeer {
    /// Id of the dropped peer.
    pub peer_id: String,
    /// Composite score that triggered the drop.
    pub score: f64,
    /// Human-readable reason, always mentioning "score" per the topology
    /// callback contract.
    pub reason: String,
}

/// Result of one [`crate::RemeshEngine::evaluate_tick`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutcome {
    /// Peers dropped this tick, worst score first.
    pub dropped: Vec<DroppedPeer>,
}

/// Cumulative counters over the lifetime of a [`crate::RemeshEngine`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RemeshStats {
    /// Total evaluation ticks run.
    pub evaluations: u64,
    /// Total peers dropped across all ticks.
    pub peers_dropped: u64,
    /// Total replacement connections established after a drop.
    pub replacements: u64,
    /// Total ticks that made at least one topology change.
    pub optimization_events: u64,
}
