use serde::{Deserialize, Serialize};

/// One retained snapshot of a path's content.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct VersionRecord {
    /// Monotonically increasing id, unique per path, oldest first.
    pub version_id: u64,
    /// Strong digest of this version's content.
    pub content_hash: [u8; 32],
    /// Size of this version's content in bytes.
    pub size: u64,
    /// Source modification time, seconds since the Unix epoch.
    pub mtime: u64,
    /// When this version was stored locally, seconds since the Unix epoch.
    pub stored_at: u64,
}

/// Direction a queued sync operation moves data in.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SyncDirection {
    /// Sending local content to a peer.
    Push,
    /// Pulling a peer's content locally.
    Pull,
}

/// One pending unit of work for the sync pipeline.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SyncQueueEntry {
    /// Path relative to the watched root.
    pub path: String,
    /// Peer this entry synchronizes with.
    pub peer_id: String,
    /// Which way the data is moving.
    pub direction: SyncDirection,
    /// When this entry was enqueued, seconds since the Unix epoch.
    pub enqueued_at: u64,
    /// Number of attempts made so far.
    pub attempts: u32,
}

/// A command delivered over the daemon's local IPC surface.
///
/// The transport that carries these (a Unix socket in the original) is out
/// of scope for this core; only the command shape is specified here so
/// `sentinelfs-daemon`'s `dispatch` has something concrete to act on.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum IpcCommand {
    /// Request a snapshot of daemon status (connected peers, queue depth).
    Status,
    /// List currently connected peers and their session state.
    ListPeers,
    /// Pause sync activity for one watched folder.
    PauseWatch {
        /// Path of the watched folder, relative to the daemon's root set.
        folder: String,
    },
    /// Resume sync activity for a folder paused by [`IpcCommand::PauseWatch`].
    ResumeWatch {
        /// Path of the watched folder, relative to the daemon's root set.
        folder: String,
    },
    /// Force an immediate sync attempt for one path, bypassing the queue's
    /// normal scheduling delay.
    ForceSync {
        /// Path relative to the watched root.
        path: String,
    },
    /// Mark a recorded conflict as resolved, removing it from the active
    /// conflict list without touching the file on disk.
    MarkConflictResolved {
        /// Path the conflict was recorded against.
        path: String,
    },
    /// Rotate the pinned certificate for a peer, e.g. after a planned key
    /// change on that peer's end.
    RotatePin {
        /// Peer whose pin should be rotated.
        peer_id: String,
    },
    /// List historical versions retained for a path.
    ListVersions {
        /// Path relative to the watched root.
        path: String,
    },
    /// Restore a path's content from a previously retained version.
    RestoreVersion {
        /// Path relative to the watched root.
        path: String,
        /// Version id to restore, as returned by [`IpcCommand::ListVersions`].
        version_id: u64,
    },
    /// Gracefully stop the daemon.
    Shutdown,
}
