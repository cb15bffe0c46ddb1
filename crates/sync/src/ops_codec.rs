use sentinelfs_delta::DeltaOp;

use crate::error::SyncError;

const TAG_LITERAL: u8 = 0;
const TAG_BLOCK_REF: u8 = 1;

/// Serializes a delta op stream so it can be split into `BLOCK_DATA` chunks
/// and sent over the wire. Each op is tag-prefixed: `0` for `Literal` (then
/// a `u32` length and the bytes), `1` for `BlockRef` (then `base_index`,
/// `offset`, `len`).
#[must_use]
pub fn encode_ops(ops: &[DeltaOp]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        match op {
            DeltaOp::Literal(bytes) => {
                out.push(TAG_LITERAL);
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(bytes);
            }
            DeltaOp::BlockRef { base_index, offset, len } => {
                out.push(TAG_BLOCK_REF);
                out.extend_from_slice(&base_index.to_le_bytes());
                out.extend_from_slice(&offset.to_le_bytes());
                out.extend_from_slice(&len.to_le_bytes());
            }
        }
    }
    out
}

/// Inverse of [`encode_ops`].
///
/// # Errors
///
/// Returns [`SyncError::MalformedOps`] if `bytes` ends mid-record or carries
/// an unrecognised tag.
pub fn decode_ops(bytes: &[u8]) -> Result<Vec<DeltaOp>, SyncError> {
    let mut ops = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let tag = bytes[pos];
        pos += 1;
        match tag {
            TAG_LITERAL => {
                let len_bytes = bytes
                    .get(pos..pos + 4)
                    .ok_or(SyncError::MalformedOps { offset: pos })?;
                let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
                pos += 4;
                let data = bytes
                    .get(pos..pos + len)
                    .ok_or(SyncError::MalformedOps { offset: pos })?;
                ops.push(DeltaOp::Literal(data.to_vec()));
                pos += len;
            }
            TAG_BLOCK_REF => {
                let field_bytes = bytes
                    .get(pos..pos + 16)
                    .ok_or(SyncError::MalformedOps { offset: pos })?;
                let base_index = u32::from_le_bytes(field_bytes[0..4].try_into().unwrap());
                let offset = u64::from_le_bytes(field_bytes[4..12].try_into().unwrap());
                let len = u32::from_le_bytes(field_bytes[12..16].try_into().unwrap());
                ops.push(DeltaOp::BlockRef { base_index, offset, len });
                pos += 16;
            }
            _ => return Err(SyncError::MalformedOps { offset: pos - 1 }),
        }
    }

    Ok(ops)
}

/// Splits `payload` into fixed-size chunks no larger than `chunk_size`
/// (the last chunk may be shorter). Used to turn an encoded delta-op
/// stream, or a whole file's bytes, into `BLOCK_DATA` payloads.
#[must_use]
pub fn chunk_bytes(payload: &[u8], chunk_size: u32) -> Vec<Vec<u8>> {
    let chunk_size = chunk_size.max(1) as usize;
    if payload.is_empty() {
        return vec![Vec::new()];
    }
    payload.chunks(chunk_size).map(<[u8]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_round_trip_through_encode_decode() {
        let ops = vec![
            DeltaOp::Literal(b"hello".to_vec()),
            DeltaOp::BlockRef {
                base_index: 3,
                offset: 1024,
                len: 512,
            },
            DeltaOp::Literal(Vec::new()),
        ];
        let encoded = encode_ops(&ops);
        let decoded = decode_ops(&encoded).unwrap();
        assert_eq!(decoded, ops);
    }

    #[test]
    fn decode_rejects_truncated_literal() {
        let mut bytes = vec![TAG_LITERAL];
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(b"short"); // declared 10 bytes, only 5 present
        assert!(matches!(decode_ops(&bytes), Err(SyncError::MalformedOps { .. })));
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let bytes = vec![0xFF];
        assert!(matches!(decode_ops(&bytes), Err(SyncError::MalformedOps { .. })));
    }

    #[test]
    fn chunk_bytes_reassembles_to_the_original() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let chunks = chunk_bytes(&payload, 64);
        assert_eq!(chunks.len(), 16);
        let reassembled: Vec<u8> = chunks.into_iter().flatten().collect();
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn chunk_bytes_on_empty_payload_yields_one_empty_chunk() {
        let chunks = chunk_bytes(&[], 64);
        assert_eq!(chunks, vec![Vec::<u8>::new()]);
    }
}
