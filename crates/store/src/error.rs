use thiserror::Error;

/// Failure reading or writing persisted version/queue state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path the operation was attempted against.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A version record's sidecar metadata failed to (de)serialize.
    #[error("corrupt version metadata at {path}: {source}")]
    Corrupt {
        /// The path whose metadata was unreadable.
        path: String,
        /// Underlying (de)serialization error.
        #[source]
        source: serde_json::Error,
    },
    /// The requested version id does not exist for this path.
    #[error("no version {version_id} recorded for {path}")]
    VersionNotFound {
        /// The path that was queried.
        path: String,
        /// The version id that was not found.
        version_id: u64,
    },
}
