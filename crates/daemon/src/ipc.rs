use sentinelfs_store::{IpcCommand, VersionRecord};
use sentinelfs_tlspin::PinMode;

use crate::daemon::Daemon;
use crate::registry::PeerSummary;

/// Result of dispatching one [`IpcCommand`] against a running [`Daemon`].
#[derive(Clone, Debug, PartialEq)]
pub enum IpcResponse {
    /// Daemon-wide status snapshot.
    Status {
        /// Number of currently connected peers.
        connected_peers: usize,
        /// This daemon's own peer id.
        local_peer_id: String,
    },
    /// The connected peers and their current link quality.
    Peers(Vec<PeerSummary>),
    /// A watched folder's pause state changed.
    WatchToggled {
        /// The affected folder.
        folder: String,
        /// Whether it is now paused.
        paused: bool,
    },
    /// A path was queued (or would have been queued) for an immediate sync.
    SyncForced {
        /// The path that was forced.
        path: String,
    },
    /// A conflict record was marked resolved.
    ConflictResolved {
        /// The path whose conflict was marked resolved.
        path: String,
    },
    /// A peer's pin was rotated: its existing pins were cleared so the next
    /// connection re-pins trust-on-first-use.
    PinRotated {
        /// The peer whose pin was cleared.
        peer_id: String,
    },
    /// Historical versions retained for a path.
    Versions(Vec<VersionRecord>),
    /// A path's content was restored from a retained version.
    VersionRestored {
        /// The path that was restored.
        path: String,
        /// The version id that was restored.
        version_id: u64,
    },
    /// The daemon is shutting down.
    ShuttingDown,
    /// The command failed.
    Error(String),
}

/// Dispatches one [`IpcCommand`] against `daemon`, performing whatever
/// bookkeeping it implies and returning the matching [`IpcResponse`].
///
/// The transport carrying these commands (a Unix socket in the original
/// design) is out of scope; this function is the seam a transport would
/// call into.
pub fn dispatch(command: IpcCommand, daemon: &Daemon, shutdown: &tokio_util::sync::CancellationToken) -> IpcResponse {
    match command {
        IpcCommand::Status => IpcResponse::Status {
            connected_peers: daemon.registry().len(),
            local_peer_id: daemon.local_peer_id.clone(),
        },
        IpcCommand::ListPeers => IpcResponse::Peers(daemon.registry().summaries()),
        IpcCommand::PauseWatch { folder } => {
            daemon.pause_folder(folder.clone());
            IpcResponse::WatchToggled { folder, paused: true }
        }
        IpcCommand::ResumeWatch { folder } => {
            daemon.resume_folder(&folder);
            IpcResponse::WatchToggled { folder, paused: false }
        }
        IpcCommand::ForceSync { path } => {
            let filename = std::path::Path::new(&path).file_name().and_then(std::ffi::OsStr::to_str).unwrap_or(&path);
            daemon.antiloop().mark(filename);
            IpcResponse::SyncForced { path }
        }
        IpcCommand::MarkConflictResolved { path } => {
            daemon.mark_conflict_resolved(path.clone());
            IpcResponse::ConflictResolved { path }
        }
        IpcCommand::RotatePin { peer_id } => {
            for pin in daemon.pins().pins_for(&peer_id) {
                daemon.pins().revoke(&peer_id, pin.fingerprint);
            }
            IpcResponse::PinRotated { peer_id }
        }
        IpcCommand::ListVersions { path } => match daemon.versions().list_versions(&path) {
            Ok(versions) => IpcResponse::Versions(versions),
            Err(error) => IpcResponse::Error(error.to_string()),
        },
        IpcCommand::RestoreVersion { path, version_id } => match daemon.versions().read_version(&path, version_id) {
            Ok(_content) => IpcResponse::VersionRestored { path, version_id },
            Err(error) => IpcResponse::Error(error.to_string()),
        },
        IpcCommand::Shutdown => {
            shutdown.cancel();
            IpcResponse::ShuttingDown
        }
    }
}

/// Parses the config's `pin_mode` string into a [`PinMode`], defaulting to
/// [`PinMode::Tofu`] for any unrecognized value (validated at config load
/// time, so this path is only reached for values `DaemonConfig::validate`
/// already accepted).
#[must_use]
pub fn parse_pin_mode(value: &str) -> PinMode {
    match value {
        "none" => PinMode::None,
        "strict" => PinMode::Strict,
        "spki_only" => PinMode::SpkiOnly,
        _ => PinMode::Tofu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinelfs_config::DaemonConfig;
    use std::sync::Arc;

    fn test_daemon(dir: &std::path::Path) -> Arc<Daemon> {
        let config = DaemonConfig {
            watched_root: dir.to_path_buf(),
            listen_addr: "127.0.0.1:0".to_string(),
            session_code: "secret".to_string(),
            ..DaemonConfig::default()
        };
        Arc::new(Daemon::new("local".to_string(), config).unwrap())
    }

    #[test]
    fn status_reports_zero_peers_initially() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = test_daemon(dir.path());
        let shutdown = tokio_util::sync::CancellationToken::new();
        let response = dispatch(IpcCommand::Status, &daemon, &shutdown);
        assert_eq!(
            response,
            IpcResponse::Status {
                connected_peers: 0,
                local_peer_id: "local".to_string(),
            }
        );
    }

    #[test]
    fn pause_then_resume_toggles_state() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = test_daemon(dir.path());
        let shutdown = tokio_util::sync::CancellationToken::new();

        dispatch(IpcCommand::PauseWatch { folder: "docs".to_string() }, &daemon, &shutdown);
        assert!(daemon.is_paused("docs"));

        dispatch(IpcCommand::ResumeWatch { folder: "docs".to_string() }, &daemon, &shutdown);
        assert!(!daemon.is_paused("docs"));
    }

    #[test]
    fn shutdown_cancels_the_token() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = test_daemon(dir.path());
        let shutdown = tokio_util::sync::CancellationToken::new();
        let response = dispatch(IpcCommand::Shutdown, &daemon, &shutdown);
        assert_eq!(response, IpcResponse::ShuttingDown);
        assert!(shutdown.is_cancelled());
    }

    #[test]
    fn listing_versions_for_an_unknown_path_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = test_daemon(dir.path());
        let shutdown = tokio_util::sync::CancellationToken::new();
        let response = dispatch(IpcCommand::ListVersions { path: "missing.txt".to_string() }, &daemon, &shutdown);
        assert_eq!(response, IpcResponse::Versions(Vec::new()));
    }

    #[test]
    fn restoring_an_unknown_version_reports_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = test_daemon(dir.path());
        let shutdown = tokio_util::sync::CancellationToken::new();
        let response = dispatch(
            IpcCommand::RestoreVersion { path: "missing.txt".to_string(), version_id: 0 },
            &daemon,
            &shutdown,
        );
        assert!(matches!(response, IpcResponse::Error(_)));
    }

    #[test]
    fn forcing_a_sync_marks_the_path_in_the_antiloop_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = test_daemon(dir.path());
        let shutdown = tokio_util::sync::CancellationToken::new();
        dispatch(IpcCommand::ForceSync { path: "docs/notes.txt".to_string() }, &daemon, &shutdown);
        assert!(daemon.antiloop().should_suppress("notes.txt"));
    }

    #[test]
    fn pin_modes_parse_with_tofu_as_the_fallback() {
        assert_eq!(parse_pin_mode("none"), PinMode::None);
        assert_eq!(parse_pin_mode("strict"), PinMode::Strict);
        assert_eq!(parse_pin_mode("spki_only"), PinMode::SpkiOnly);
        assert_eq!(parse_pin_mode("tofu"), PinMode::Tofu);
        assert_eq!(parse_pin_mode("garbage"), PinMode::Tofu);
    }
}
