#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Periodically re-scores every connected peer and drops the ones that
//! stay unhealthy for long enough, so the mesh self-heals without an
//! operator watching it. [`RemeshEngine`] is the pure decision core —
//! no I/O, no clock of its own — and [`run`] is the thin cancellable
//! loop that drives it on a real timer.
//!
//! ```
//! use std::collections::HashMap;
//! use sentinelfs_remesh::{RemeshConfig, RemeshEngine};
//!
//! let mut engine = RemeshEngine::new(RemeshConfig {
//!     min_peers: 1,
//!     ..RemeshConfig::default()
//! });
//! let mut scores = HashMap::new();
//! scores.insert("flaky".to_string(), 5.0);
//! scores.insert("solid".to_string(), 95.0);
//! for _ in 0..3 {
//!     engine.evaluate_tick(&scores);
//! }
//! let outcome = engine.evaluate_tick(&scores);
//! assert_eq!(outcome.dropped.len(), 1);
//! assert_eq!(outcome.dropped[0].peer_id, "flaky");
//! ```

mod engine;
mod loop_task;
mod types;

pub use engine::RemeshEngine;
pub use loop_task::run;
pub use types::{DroppedPeer, RemeshConfig, RemeshStats, TickOutcome};
