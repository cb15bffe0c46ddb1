use thiserror::Error;

/// Errors raised while applying a [`crate::DeltaResult`] to a base file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum DeltaError {
    /// A `BlockRef` named a range outside the bounds of the base file.
    #[error("delta block reference at offset {offset} (len {len}) falls outside the base file")]
    InvalidBlockRef {
        /// Offset named by the out-of-bounds reference.
        offset: u64,
        /// Length named by the out-of-bounds reference.
        len: u32,
    },
}
