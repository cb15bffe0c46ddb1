use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::engine::RemeshEngine;
use crate::types::{RemeshConfig, RemeshStats, TickOutcome};

/// Runs the auto-remesh loop until `cancellation` fires.
///
/// On each `config.period` tick, calls `score_peers` to obtain a fresh
/// composite score per connected peer id, feeds it through the engine, and
/// calls `on_drop` once for every peer the tick decided to drop. Both
/// callbacks may perform I/O; the decision logic itself stays inside
/// [`RemeshEngine`], which holds no I/O of its own.
pub async fn run(
    config: RemeshConfig,
    cancellation: CancellationToken,
    mut score_peers: impl FnMut() -> HashMap<String, f64> + Send,
    mut on_drop: impl FnMut(&crate::types::DroppedPeer) + Send,
) -> RemeshStats {
    let period = config.period;
    let engine = Arc::new(Mutex::new(RemeshEngine::new(config)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancellation.cancelled() => break,
            _ = ticker.tick() => {
                let scores = score_peers();
                let outcome: TickOutcome = engine.lock().await.evaluate_tick(&scores);
                for dropped in &outcome.dropped {
                    tracing::info!(
                        peer_id = %dropped.peer_id,
                        score = dropped.score,
                        reason = %dropped.reason,
                        "auto-remesh dropped peer"
                    );
                    on_drop(dropped);
                }
            }
        }
    }

    engine.lock().await.stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop_promptly() {
        let config = RemeshConfig {
            period: Duration::from_secs(5),
            ..RemeshConfig::default()
        };
        let cancellation = CancellationToken::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticks_clone = ticks.clone();

        let token = cancellation.clone();
        let handle = tokio::spawn(run(
            config,
            cancellation,
            move || {
                ticks_clone.fetch_add(1, Ordering::SeqCst);
                HashMap::new()
            },
            |_| {},
        ));

        tokio::time::advance(Duration::from_secs(12)).await;
        token.cancel();
        let stats = handle.await.unwrap();
        assert!(stats.evaluations >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn a_persistently_bad_peer_is_dropped_and_reported() {
        let config = RemeshConfig {
            period: Duration::from_secs(5),
            min_peers: 1,
            min_evaluation_count: 3,
            ..RemeshConfig::default()
        };
        let cancellation = CancellationToken::new();
        let token = cancellation.clone();
        let dropped_ids = Arc::new(Mutex::new(Vec::new()));
        let dropped_ids_clone = dropped_ids.clone();

        let handle = tokio::spawn(run(
            config,
            cancellation,
            || {
                let mut scores = HashMap::new();
                scores.insert("good".to_string(), 95.0);
                scores.insert("bad".to_string(), 5.0);
                scores
            },
            move |dropped| {
                let dropped_ids_clone = dropped_ids_clone.clone();
                let peer_id = dropped.peer_id.clone();
                tokio::spawn(async move {
                    dropped_ids_clone.lock().await.push(peer_id);
                });
            },
        ));

        tokio::time::advance(Duration::from_secs(21)).await;
        token.cancel();
        handle.await.unwrap();
        tokio::task::yield_now().await;

        assert!(dropped_ids.lock().await.contains(&"bad".to_string()));
    }
}
