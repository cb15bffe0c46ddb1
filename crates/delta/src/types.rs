/// Signature of one non-overlapping block of a base file.
///
/// Produced by [`crate::signatures`], consumed by [`crate::delta`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSignature {
    /// Zero-based position of this block among the base file's blocks.
    pub index: u32,
    /// Byte offset of the block's first byte within the base file.
    pub offset: u64,
    /// Adler-32-class rolling checksum of the block.
    pub weak: u32,
    /// 256-bit strong digest of the block, confirming a weak-checksum match.
    pub strong: [u8; 32],
}

/// One instruction in the sequence that reconstructs new file content from a base file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaOp {
    /// Bytes with no matching base block; copied verbatim.
    Literal(Vec<u8>),
    /// A byte range copied from the base file.
    BlockRef {
        /// Index of the matched base block (see [`BlockSignature::index`]).
        base_index: u32,
        /// Offset of the matched range within the base file.
        offset: u64,
        /// Length of the matched range in bytes.
        len: u32,
    },
}

/// Size, in bytes, a [`DeltaOp::BlockRef`] is estimated to cost on the wire:
/// `base_index` (4) + `offset` (8) + `len` (4).
pub const BLOCK_REF_OVERHEAD_BYTES: u64 = 16;

/// Aggregate counters describing one [`delta`](crate::delta) computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaStats {
    /// Size of the new file the delta was computed against.
    pub original_size: u64,
    /// Estimated size of the delta on the wire (literal bytes plus block-ref overhead).
    pub delta_size: u64,
    /// Number of blocks copied from the base file via [`DeltaOp::BlockRef`].
    pub matched_block_count: u32,
    /// Number of bytes copied verbatim via [`DeltaOp::Literal`].
    pub literal_byte_count: u64,
}

/// Result of computing a delta: the op sequence plus summary statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeltaResult {
    /// Ordered instructions that reconstruct the new file from the base file.
    pub ops: Vec<DeltaOp>,
    /// Summary counters over `ops`.
    pub stats: DeltaStats,
}
