#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Conflict resolution for two versions of the same path that were
//! edited independently on different peers. A conflict only exists when
//! the content differs; if both sides hash to the same digest the
//! "conflict" is a false alarm (the same edit arrived by two paths) and
//! resolves to [`Resolution::Identical`].
//!
//! Otherwise, resolution is skew-tolerant last-writer-wins: a clock skew
//! of up to [`DEFAULT_SKEW_THRESHOLD`] between peers is expected, so only
//! an `mtime` difference exceeding the threshold is trusted as a real
//! ordering. Within the threshold, the two candidates are considered
//! concurrent and the lexicographically greater peer id wins — both
//! sides of the comparison reach the same decision without further
//! coordination.

use std::time::Duration;

/// Default tolerance for clock skew between peers before `mtime` ordering
/// is trusted over the peer-id tie-break.
pub const DEFAULT_SKEW_THRESHOLD: Duration = Duration::from_secs(2);

/// One side of a conflicting edit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CandidateVersion {
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u64,
    /// Strong digest of the file content.
    pub content_hash: [u8; 32],
    /// Id of the peer that produced this version.
    pub peer_id: String,
}

/// Outcome of comparing two candidate versions of the same path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// The local version should be kept; the remote one is discarded (or
    /// archived, per the retention policy).
    KeepLocal,
    /// The remote version should be kept and applied locally.
    KeepRemote,
    /// Both versions have identical content; there is no real conflict.
    Identical,
}

/// A resolved conflict, suitable for an audit log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConflictRecord {
    /// Path the conflict occurred on.
    pub path: String,
    /// The local candidate considered.
    pub local: CandidateVersion,
    /// The remote candidate considered.
    pub remote: CandidateVersion,
    /// The resolution reached.
    pub resolution: Resolution,
}

/// Compares two versions of the same path and decides which one wins,
/// using [`DEFAULT_SKEW_THRESHOLD`] as the clock-skew tolerance.
#[must_use]
pub fn resolve(local: &CandidateVersion, remote: &CandidateVersion) -> Resolution {
    resolve_with_skew(local, remote, DEFAULT_SKEW_THRESHOLD)
}

/// Compares two versions of the same path and decides which one wins,
/// with an explicit clock-skew tolerance.
///
/// If `remote.mtime` exceeds `local.mtime` by more than `skew_threshold`,
/// remote wins; symmetrically for local. Within the threshold, the
/// versions are treated as concurrent and the lexicographically greater
/// `peer_id` wins.
#[must_use]
pub fn resolve_with_skew(
    local: &CandidateVersion,
    remote: &CandidateVersion,
    skew_threshold: Duration,
) -> Resolution {
    if local.content_hash == remote.content_hash {
        return Resolution::Identical;
    }

    let skew_secs = skew_threshold.as_secs();
    let remote_newer = remote.mtime.saturating_sub(local.mtime);
    let local_newer = local.mtime.saturating_sub(remote.mtime);

    if remote_newer > skew_secs {
        Resolution::KeepRemote
    } else if local_newer > skew_secs {
        Resolution::KeepLocal
    } else if remote.peer_id > local.peer_id {
        Resolution::KeepRemote
    } else {
        Resolution::KeepLocal
    }
}

/// Resolves a conflict and wraps the decision in a [`ConflictRecord`] for
/// the caller to persist via `sentinelfs-store`.
#[must_use]
pub fn detect(path: &str, local: CandidateVersion, remote: CandidateVersion) -> ConflictRecord {
    let resolution = resolve(&local, &remote);
    ConflictRecord {
        path: path.to_string(),
        local,
        remote,
        resolution,
    }
}
