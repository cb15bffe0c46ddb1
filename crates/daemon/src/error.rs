use thiserror::Error;

/// Failure handling a request against the running daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// No peer with this id is currently connected.
    #[error("peer {peer_id} is not connected")]
    PeerUnreachable {
        /// The peer id that was not found in the registry.
        peer_id: String,
    },
    /// The persisted version store rejected the request.
    #[error("version store error: {0}")]
    Store(#[from] sentinelfs_store::StoreError),
    /// Certificate pin verification or rotation failed.
    #[error("pin error: {0}")]
    Pin(#[from] sentinelfs_tlspin::PinError),
    /// The peer session handshake failed.
    #[error("session handshake failed: {0}")]
    Session(#[from] sentinelfs_session::SessionError),
}
