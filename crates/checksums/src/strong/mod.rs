//! Strong cryptographic checksum used to confirm a rolling-checksum match.
//!
//! The delta codec only trusts a candidate block once its strong digest
//! agrees with the base block's recorded digest, so the implementation here
//! must be collision-resistant rather than merely fast. SHA-256 is the
//! algorithm named by the data model's `strong_32B` / `file_hash_32B` fields.

mod sha256;

pub use sha256::Sha256;

/// Trait implemented by strong checksum algorithms.
///
/// Implementors provide a streaming interface: callers feed data
/// incrementally via [`Self::update`] and then obtain the final digest
/// through [`Self::finalize`]. The associated [`DIGEST_LEN`](Self::DIGEST_LEN)
/// constant exposes the byte width of the resulting hash so higher layers can
/// size buffers without hard-coding algorithm-specific knowledge.
///
/// # Examples
///
/// ```
/// use sentinelfs_checksums::strong::{Sha256, StrongDigest};
///
/// let mut hasher = Sha256::new();
/// hasher.update(b"example");
/// let digest = hasher.finalize();
/// assert_eq!(digest.as_ref().len(), Sha256::DIGEST_LEN);
/// ```
pub trait StrongDigest: Sized {
    /// Type used to parameterise a new digest instance.
    type Seed: Default;

    /// Type returned when finalising the digest.
    type Digest: AsRef<[u8]> + Copy;

    /// Length of the final digest in bytes.
    const DIGEST_LEN: usize;

    /// Creates a new hasher with an empty state.
    fn new() -> Self {
        Self::with_seed(Self::Seed::default())
    }

    /// Creates a new hasher using the provided seed value.
    fn with_seed(seed: Self::Seed) -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;

    /// Convenience helper that hashes `data` in a single call.
    fn digest(data: &[u8]) -> Self::Digest {
        Self::digest_with_seed(Self::Seed::default(), data)
    }

    /// Convenience helper that hashes `data` using an explicit seed value.
    fn digest_with_seed(seed: Self::Seed, data: &[u8]) -> Self::Digest {
        let mut hasher = Self::with_seed(seed);
        hasher.update(data);
        hasher.finalize()
    }
}
