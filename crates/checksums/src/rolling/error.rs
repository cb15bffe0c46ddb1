use thiserror::Error;

/// Errors that can occur while updating the rolling checksum state.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RollingError {
    /// The checksum window is empty, preventing the rolling update from making progress.
    #[error("rolling checksum requires a non-empty window")]
    EmptyWindow,
    /// The checksum window length exceeds what can be represented in 32 bits.
    #[error("rolling checksum window of {len} bytes exceeds 32-bit limit")]
    WindowTooLarge {
        /// Number of bytes present in the rolling window when the error was raised.
        len: usize,
    },
    /// The number of outgoing bytes does not match the number of incoming bytes.
    #[error(
        "rolling checksum requires outgoing ({outgoing}) and incoming ({incoming}) slices to have the same length"
    )]
    MismatchedSliceLength {
        /// Number of bytes being removed from the rolling window.
        outgoing: usize,
        /// Number of bytes being appended to the rolling window.
        incoming: usize,
    },
}

/// Error returned when reconstructing a rolling checksum digest from a byte slice of the wrong length.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("rolling checksum digest requires {} bytes, received {len}", Self::EXPECTED_LEN)]
pub struct RollingSliceError {
    len: usize,
}

impl RollingSliceError {
    /// Number of bytes required to decode a rolling checksum digest.
    pub const EXPECTED_LEN: usize = 4;

    /// Number of bytes the caller supplied when the error was raised.
    #[must_use]
    pub const fn len(self) -> usize {
        self.len
    }

    /// Reports whether the provided slice was empty when the error occurred.
    ///
    /// # Examples
    ///
    /// ```
    /// use sentinelfs_checksums::{RollingDigest, RollingSliceError};
    ///
    /// let err = RollingDigest::from_le_slice(&[], 0).unwrap_err();
    /// assert!(err.is_empty());
    /// ```
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    pub(crate) const fn new(len: usize) -> Self {
        Self { len }
    }
}
