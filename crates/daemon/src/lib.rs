#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Wires every core and ambient crate into a running peer-to-peer sync
//! daemon: accepts inbound peer connections and runs the session
//! handshake, tracks connected peers and their network-quality metrics in
//! a shared [`PeerRegistry`], drives the auto-remesh loop over that
//! registry, and exposes a [`dispatch`] seam for the daemon's IPC command
//! surface. The persistent metadata store's backing transport, the
//! local-filesystem watcher, and the IPC transport itself are out of
//! scope — this crate only defines and consumes those interfaces.

mod daemon;
mod error;
mod ipc;
mod registry;

pub use daemon::Daemon;
pub use error::DaemonError;
pub use ipc::{dispatch, parse_pin_mode, IpcResponse};
pub use registry::{PeerEntry, PeerRegistry, PeerSummary};
