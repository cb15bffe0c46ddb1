use thiserror::Error;

use sentinelfs_delta::DeltaError;

/// Failure in the sync pipeline's bookkeeping or reconstruction.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A delta transfer was decided on but no base-file signatures were
    /// supplied to compute it against.
    #[error("delta transfer requires base signatures but none were provided")]
    MissingSignatures,
    /// A delta transfer's reconstruction needs the base file content, which
    /// was not retained by the receiver pipeline.
    #[error("delta apply requires the base file content but none was retained")]
    MissingBase,
    /// The encoded delta-op stream is truncated or malformed.
    #[error("malformed delta op stream at byte offset {offset}")]
    MalformedOps {
        /// Byte offset into the op stream where decoding failed.
        offset: usize,
    },
    /// Reassembly did not receive every chunk it expected.
    #[error("expected {expected} chunks, have {received}")]
    IncompleteTransfer {
        /// Total chunks the transfer was declared to have.
        expected: u32,
        /// Chunks actually received.
        received: u32,
    },
    /// The reconstructed content's digest does not match the announced one.
    #[error("reconstructed content hash does not match the announced file hash")]
    HashMismatch,
    /// Applying a delta op stream against the base file failed.
    #[error(transparent)]
    Delta(#[from] DeltaError),
}
