use rustc_hash::FxHashMap;
use sentinelfs_checksums::{RollingChecksum, Sha256, StrongDigest};

use crate::error::DeltaError;
use crate::types::{BlockSignature, DeltaOp, DeltaResult, DeltaStats, BLOCK_REF_OVERHEAD_BYTES};

/// Splits `bytes` into non-overlapping `block_size` blocks (the last may be
/// short) and records the weak and strong hash of each.
pub fn signatures(bytes: &[u8], block_size: u32) -> Vec<BlockSignature> {
    let block_size = block_size.max(1) as usize;
    let mut out = Vec::with_capacity(bytes.len().div_ceil(block_size));

    let mut offset = 0usize;
    let mut index = 0u32;
    while offset < bytes.len() {
        let len = block_size.min(bytes.len() - offset);
        let chunk = &bytes[offset..offset + len];

        let mut weak_state = RollingChecksum::new();
        weak_state.update(chunk);

        out.push(BlockSignature {
            index,
            offset: offset as u64,
            weak: weak_state.value(),
            strong: Sha256::digest(chunk),
        });

        offset += len;
        index += 1;
    }

    out
}

fn index_by_weak(base_signatures: &[BlockSignature]) -> FxHashMap<u32, Vec<BlockSignature>> {
    let mut map: FxHashMap<u32, Vec<BlockSignature>> = FxHashMap::default();
    for sig in base_signatures {
        map.entry(sig.weak).or_default().push(*sig);
    }
    map
}

fn find_match<'a>(
    candidates: &'a [BlockSignature],
    window: &[u8],
    strong_cache: &mut Option<[u8; 32]>,
) -> Option<&'a BlockSignature> {
    let strong = *strong_cache.get_or_insert_with(|| Sha256::digest(window));
    candidates.iter().find(|sig| sig.strong == strong)
}

/// Computes a [`DeltaResult`] that reconstructs `new_bytes` from a base file
/// described by `base_signatures`, using a sliding window of `block_size`
/// bytes maintained via an O(1) rolling-checksum update.
pub fn delta(new_bytes: &[u8], base_signatures: &[BlockSignature], block_size: u32) -> DeltaResult {
    let block_size = block_size.max(1) as usize;
    let n = new_bytes.len();
    let mut stats = DeltaStats {
        original_size: n as u64,
        ..DeltaStats::default()
    };

    if n == 0 {
        return DeltaResult {
            ops: Vec::new(),
            stats,
        };
    }

    let base_map = index_by_weak(base_signatures);
    let mut ops = Vec::new();
    let mut literal: Vec<u8> = Vec::new();

    let mut pos = 0usize;
    let mut window_len = block_size.min(n);
    let mut rolling = RollingChecksum::new();
    rolling.update(&new_bytes[pos..pos + window_len]);

    loop {
        let window = &new_bytes[pos..pos + window_len];
        let mut strong_cache = None;
        let matched = base_map
            .get(&rolling.value())
            .and_then(|candidates| find_match(candidates, window, &mut strong_cache))
            .copied();

        if let Some(sig) = matched {
            if !literal.is_empty() {
                ops.push(DeltaOp::Literal(std::mem::take(&mut literal)));
            }
            ops.push(DeltaOp::BlockRef {
                base_index: sig.index,
                offset: sig.offset,
                len: window_len as u32,
            });
            stats.matched_block_count += 1;

            pos += window_len;
            if pos >= n {
                break;
            }
            window_len = block_size.min(n - pos);
            rolling.reset();
            rolling.update(&new_bytes[pos..pos + window_len]);
            continue;
        }

        literal.push(new_bytes[pos]);
        stats.literal_byte_count += 1;
        pos += 1;
        if pos >= n {
            break;
        }

        if pos + window_len <= n {
            let outgoing = new_bytes[pos - 1];
            let incoming = new_bytes[pos + window_len - 1];
            rolling
                .roll(outgoing, incoming)
                .expect("window_len is non-zero by loop invariant");
        } else {
            window_len = n - pos;
            if window_len == 0 {
                break;
            }
            rolling.reset();
            rolling.update(&new_bytes[pos..pos + window_len]);
        }
    }

    if !literal.is_empty() {
        ops.push(DeltaOp::Literal(literal));
    }

    stats.delta_size = stats.literal_byte_count
        + u64::from(stats.matched_block_count) * BLOCK_REF_OVERHEAD_BYTES;

    DeltaResult { ops, stats }
}

/// Reconstructs new file content by replaying `delta`'s ops against `base_bytes`.
///
/// # Errors
///
/// Returns [`DeltaError::InvalidBlockRef`] if any `BlockRef` names a range
/// outside `base_bytes`.
pub fn apply(base_bytes: &[u8], delta: &DeltaResult) -> Result<Vec<u8>, DeltaError> {
    let mut out = Vec::with_capacity(delta.stats.original_size as usize);

    for op in &delta.ops {
        match op {
            DeltaOp::Literal(bytes) => out.extend_from_slice(bytes),
            DeltaOp::BlockRef { offset, len, .. } => {
                let start = usize::try_from(*offset).unwrap_or(usize::MAX);
                let end = start.saturating_add(*len as usize);
                let slice = base_bytes
                    .get(start..end)
                    .ok_or(DeltaError::InvalidBlockRef {
                        offset: *offset,
                        len: *len,
                    })?;
                out.extend_from_slice(slice);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_split_into_expected_block_count() {
        let sigs = signatures(b"0123456789", 4);
        assert_eq!(sigs.len(), 3);
        assert_eq!(sigs[0].offset, 0);
        assert_eq!(sigs[2].offset, 8);
    }

    #[test]
    fn delta_of_identical_bytes_is_all_block_refs() {
        let base = b"the quick brown fox jumps over the lazy dog again";
        let sigs = signatures(base, 8);
        let result = delta(base, &sigs, 8);
        assert!(result.ops.iter().all(|op| matches!(op, DeltaOp::BlockRef { .. })));
        assert_eq!(result.stats.literal_byte_count, 0);
    }

    #[test]
    fn delta_round_trip_reconstructs_modified_content() {
        let base = b"the quick brown fox jumps over the lazy dog";
        let new = b"the slow brown fox jumps over a sleepy dog!";
        let sigs = signatures(base, 8);
        let result = delta(new, &sigs, 8);
        let reconstructed = apply(base, &result).unwrap();
        assert_eq!(reconstructed, new);
    }

    #[test]
    fn delta_round_trip_with_empty_new_bytes() {
        let base = b"some base content";
        let sigs = signatures(base, 4);
        let result = delta(b"", &sigs, 4);
        assert!(result.ops.is_empty());
        assert_eq!(apply(base, &result).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn delta_round_trip_with_empty_base() {
        let sigs = signatures(b"", 4);
        assert!(sigs.is_empty());
        let result = delta(b"brand new content", &sigs, 4);
        assert!(result.ops.iter().all(|op| matches!(op, DeltaOp::Literal(_))));
        assert_eq!(apply(b"", &result).unwrap(), b"brand new content");
    }

    #[test]
    fn apply_rejects_out_of_bounds_block_ref() {
        let result = DeltaResult {
            ops: vec![DeltaOp::BlockRef {
                base_index: 0,
                offset: 100,
                len: 4,
            }],
            stats: DeltaStats::default(),
        };
        let err = apply(b"short", &result).unwrap_err();
        assert!(matches!(err, DeltaError::InvalidBlockRef { offset: 100, len: 4 }));
    }

    #[test]
    fn delta_efficiency_bounds_literal_bytes_for_localized_edits() {
        // Ten modified 4KiB blocks in a 1MiB file of uniform content, as in
        // end-to-end scenario 2: literal bytes should stay within the
        // window-slack bound from the testable-properties list.
        const BLOCK: usize = 4096;
        let base: Vec<u8> = (0..1 << 20).map(|i| (i % 2 == 0) as u8).collect();
        let mut new = base.clone();
        for block in 0..10 {
            let start = block * BLOCK * 10;
            for byte in new.iter_mut().skip(start).take(BLOCK) {
                *byte ^= 0xFF;
            }
        }

        let sigs = signatures(&base, BLOCK as u32);
        let result = delta(&new, &sigs, BLOCK as u32);

        let bound = 10 * BLOCK as u64 + 2 * (BLOCK as u64 - 1);
        assert!(
            result.stats.literal_byte_count <= bound,
            "literal_byte_count {} exceeded bound {}",
            result.stats.literal_byte_count,
            bound
        );
        assert!(result.stats.matched_block_count >= 246);
        assert_eq!(apply(&base, &result).unwrap(), new);
    }
}
