use std::sync::Mutex;
use std::time::Instant;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use sentinelfs_netmetrics::PeerMetrics;
use sentinelfs_sync::{ReceiverPipeline, SenderPipeline};

/// Everything the daemon tracks about one connected peer outside of its
/// dedicated per-connection task.
pub struct PeerEntry {
    /// Negotiated capability bitset from the handshake.
    pub capabilities: u32,
    /// Negotiated chunk size from the handshake.
    pub chunk_size: u32,
    /// When this peer connected.
    pub connected_at: Instant,
    /// Running network-quality metrics, updated by the per-peer worker.
    pub metrics: PeerMetrics,
    /// Cancellation token the per-peer worker task observes; cancelling it
    /// tears the connection down cooperatively.
    pub cancellation: CancellationToken,
    /// State machine driving files this daemon sends to the peer.
    sender: Mutex<SenderPipeline>,
    /// State machine driving files this daemon receives from the peer.
    receiver: Mutex<ReceiverPipeline>,
}

/// A point-in-time view of one peer, safe to hand out over the IPC surface.
#[derive(Clone, Debug, PartialEq)]
pub struct PeerSummary {
    /// The peer's opaque identifier.
    pub peer_id: String,
    /// Composite quality score in `[0, 100]`.
    pub score: f64,
    /// Round-trip time average, in milliseconds.
    pub rtt_avg_ms: f64,
    /// Fraction of packets lost, in `[0, 1]`.
    pub loss_rate: f64,
}

/// Concurrent map of currently-connected peers, shared between the accept
/// loop, the per-peer worker tasks, the auto-remesh loop, and IPC dispatch.
#[derive(Default)]
pub struct PeerRegistry {
    peers: DashMap<String, PeerEntry>,
}

impl PeerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { peers: DashMap::new() }
    }

    /// Registers a newly connected peer, replacing any stale entry under the
    /// same id (a reconnect after a dropped session).
    pub fn insert(&self, peer_id: String, capabilities: u32, chunk_size: u32, cancellation: CancellationToken) {
        self.peers.insert(
            peer_id,
            PeerEntry {
                capabilities,
                chunk_size,
                connected_at: Instant::now(),
                metrics: PeerMetrics::new(),
                cancellation,
                sender: Mutex::new(SenderPipeline::new()),
                receiver: Mutex::new(ReceiverPipeline::new()),
            },
        );
    }

    /// Removes a peer, e.g. after its worker task observes disconnection.
    pub fn remove(&self, peer_id: &str) -> Option<PeerEntry> {
        self.peers.remove(peer_id).map(|(_, entry)| entry)
    }

    /// Cancels a peer's worker task without removing it from the registry;
    /// the worker's own cleanup path performs the removal.
    #[must_use]
    pub fn disconnect(&self, peer_id: &str) -> bool {
        match self.peers.get(peer_id) {
            Some(entry) => {
                entry.cancellation.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of peers currently connected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peers are currently connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Composite score for every connected peer, keyed by peer id, for the
    /// auto-remesh loop to evaluate.
    #[must_use]
    pub fn scores(&self) -> std::collections::HashMap<String, f64> {
        self.peers
            .iter()
            .map(|entry| (entry.key().clone(), sentinelfs_scorer::score(&entry.value().metrics)))
            .collect()
    }

    /// Runs `f` against a connected peer's metrics, if still present.
    pub fn update_metrics<R>(&self, peer_id: &str, f: impl FnOnce(&mut PeerMetrics) -> R) -> Option<R> {
        let mut entry = self.peers.get_mut(peer_id)?;
        Some(f(&mut entry.metrics))
    }

    /// Runs `f` against the sender pipeline driving transfers to `peer_id`,
    /// if the peer is still connected.
    pub fn with_sender<R>(&self, peer_id: &str, f: impl FnOnce(&mut SenderPipeline) -> R) -> Option<R> {
        let entry = self.peers.get(peer_id)?;
        let mut sender = entry.sender.lock().unwrap();
        Some(f(&mut sender))
    }

    /// Runs `f` against the receiver pipeline driving transfers from
    /// `peer_id`, if the peer is still connected.
    pub fn with_receiver<R>(&self, peer_id: &str, f: impl FnOnce(&mut ReceiverPipeline) -> R) -> Option<R> {
        let entry = self.peers.get(peer_id)?;
        let mut receiver = entry.receiver.lock().unwrap();
        Some(f(&mut receiver))
    }

    /// Point-in-time summaries of every connected peer, for `IpcCommand::ListPeers`.
    #[must_use]
    pub fn summaries(&self) -> Vec<PeerSummary> {
        self.peers
            .iter()
            .map(|entry| PeerSummary {
                peer_id: entry.key().clone(),
                score: sentinelfs_scorer::score(&entry.value().metrics),
                rtt_avg_ms: entry.value().metrics.rtt_avg().as_secs_f64() * 1000.0,
                loss_rate: entry.value().metrics.loss_rate(),
            })
            .collect()
    }
}
