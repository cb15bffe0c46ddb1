use std::collections::BTreeMap;

use sentinelfs_checksums::Sha256;
use sentinelfs_delta::{apply, delta, signatures, BlockSignature, DeltaResult};
use sentinelfs_wire::AckType;

use crate::error::SyncError;
use crate::ops_codec::{chunk_bytes, decode_ops, encode_ops};
use crate::window::SlidingWindow;

/// Default block size used to compute delta signatures.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Lifecycle state of a [`SenderPipeline`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SenderState {
    /// Waiting for the receiver's `FILE_META_ACK`.
    AwaitingAck,
    /// Streaming `BLOCK_DATA` chunks within the sliding window.
    Transferring,
    /// Every chunk sent and acknowledged; `TRANSFER_COMPLETE` can be sent.
    Done,
    /// The receiver already has this content; nothing to transfer.
    UpToDate,
}

/// Sender side of one file transfer: decides whether to send nothing, a
/// full file, or a delta, and paces `BLOCK_DATA` chunks through a
/// [`SlidingWindow`].
#[derive(Debug)]
pub struct SenderPipeline {
    state: SenderState,
    chunks: Vec<Vec<u8>>,
    window: SlidingWindow,
}

impl SenderPipeline {
    /// Creates a pipeline with no work yet planned; call
    /// [`on_file_meta_ack`](Self::on_file_meta_ack) to plan the transfer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SenderState::AwaitingAck,
            chunks: Vec::new(),
            window: SlidingWindow::new(0, 1),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &SenderState {
        &self.state
    }

    /// Total `BLOCK_DATA` chunks this transfer will send.
    #[must_use]
    pub fn total_chunks(&self) -> u32 {
        self.chunks.len() as u32
    }

    /// Plans the transfer once the receiver's ack type is known.
    ///
    /// `NeedDelta` computes a delta against `base_signatures` (supplied by
    /// the receiver's `SIGNATURE_LIST`) and sends the encoded op stream;
    /// `NeedFull` sends `new_content` verbatim; `UpToDate` sends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingSignatures`] if `ack == NeedDelta` but
    /// `base_signatures` is `None`.
    pub fn on_file_meta_ack(
        &mut self,
        ack: AckType,
        new_content: &[u8],
        base_signatures: Option<&[BlockSignature]>,
        chunk_size: u32,
        window_size: u32,
    ) -> Result<(), SyncError> {
        match ack {
            AckType::UpToDate => {
                self.state = SenderState::UpToDate;
                Ok(())
            }
            AckType::NeedFull => {
                self.plan_transfer(new_content.to_vec(), chunk_size, window_size);
                Ok(())
            }
            AckType::NeedDelta => {
                let base_signatures = base_signatures.ok_or(SyncError::MissingSignatures)?;
                let result = delta(new_content, base_signatures, DEFAULT_BLOCK_SIZE);
                let encoded = encode_ops(&result.ops);
                self.plan_transfer(encoded, chunk_size, window_size);
                Ok(())
            }
        }
    }

    fn plan_transfer(&mut self, payload: Vec<u8>, chunk_size: u32, window_size: u32) {
        self.chunks = chunk_bytes(&payload, chunk_size);
        self.window = SlidingWindow::new(self.chunks.len() as u32, window_size);
        self.state = SenderState::Transferring;
    }

    /// Drains the window, returning every chunk newly admitted for sending
    /// as `(chunk_index, bytes)`.
    pub fn drain_sendable(&mut self) -> Vec<(u32, Vec<u8>)> {
        let mut out = Vec::new();
        while let Some(index) = self.window.admit_next() {
            out.push((index, self.chunks[index as usize].clone()));
        }
        out
    }

    /// Records a `BLOCK_ACK`, transitioning to [`SenderState::Done`] once
    /// every chunk has been acknowledged.
    pub fn on_block_ack(&mut self, chunk_index: u32) {
        self.window.ack(chunk_index);
        if self.window.is_complete() {
            self.state = SenderState::Done;
        }
    }
}

impl Default for SenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a [`ReceiverPipeline`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReceiverState {
    /// Waiting for `FILE_META` to arrive.
    AwaitingMeta,
    /// `UP_TO_DATE` was decided; nothing further to receive.
    UpToDate,
    /// Receiving `BLOCK_DATA` chunks.
    ReceivingChunks,
    /// Every chunk received and successfully reconstructed.
    Committed,
}

/// Receiver side of one file transfer: decides the ack type, collects
/// `BLOCK_DATA` chunks out of order, and reconstructs the final content.
#[derive(Debug)]
pub struct ReceiverPipeline {
    state: ReceiverState,
    is_delta: bool,
    base_content: Option<Vec<u8>>,
    total_chunks: Option<u32>,
    received: BTreeMap<u32, Vec<u8>>,
}

impl ReceiverPipeline {
    /// Creates a pipeline with no decision made yet; call
    /// [`decide_ack`](Self::decide_ack) first.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ReceiverState::AwaitingMeta,
            is_delta: false,
            base_content: None,
            total_chunks: None,
            received: BTreeMap::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &ReceiverState {
        &self.state
    }

    /// Compares the sender's announced hash against any local copy and
    /// decides which [`AckType`] to send back. Retains `local_content` for
    /// delta reconstruction if a delta transfer is requested.
    pub fn decide_ack(&mut self, remote_hash: [u8; 32], local_content: Option<&[u8]>) -> AckType {
        match local_content {
            None => {
                self.state = ReceiverState::ReceivingChunks;
                self.is_delta = false;
                AckType::NeedFull
            }
            Some(local) => {
                let local_hash = Sha256::digest(local);
                if local_hash == remote_hash {
                    self.state = ReceiverState::UpToDate;
                    AckType::UpToDate
                } else {
                    self.base_content = Some(local.to_vec());
                    self.is_delta = true;
                    self.state = ReceiverState::ReceivingChunks;
                    AckType::NeedDelta
                }
            }
        }
    }

    /// Computes the block signatures to announce in `SIGNATURE_LIST`, using
    /// the local content retained by [`decide_ack`](Self::decide_ack).
    #[must_use]
    pub fn local_signatures(&self, block_size: u32) -> Vec<BlockSignature> {
        self.base_content
            .as_deref()
            .map(|content| signatures(content, block_size))
            .unwrap_or_default()
    }

    /// Records one received `BLOCK_DATA` chunk.
    pub fn on_block_data(&mut self, chunk_index: u32, total_chunks: u32, data: Vec<u8>) {
        self.total_chunks = Some(total_chunks);
        self.received.insert(chunk_index, data);
    }

    /// Number of distinct chunks received so far for this transfer.
    #[must_use]
    pub fn received_count(&self) -> u32 {
        self.received.len() as u32
    }

    /// `true` once every chunk declared by `total_chunks` has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self.total_chunks {
            Some(total) => self.received.len() as u32 == total,
            None => false,
        }
    }

    /// Reassembles the received chunks and reconstructs the final content,
    /// verifying it against `expected_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::IncompleteTransfer`] if not every chunk has
    /// arrived, [`SyncError::MissingBase`] if this was a delta transfer but
    /// no base content was retained, [`SyncError::MalformedOps`] if the
    /// delta op stream is corrupt, or [`SyncError::HashMismatch`] if the
    /// reconstructed content does not match `expected_hash`.
    pub fn reassemble(&mut self, expected_hash: [u8; 32]) -> Result<Vec<u8>, SyncError> {
        let total = self.total_chunks.unwrap_or(0);
        if self.received.len() as u32 != total {
            return Err(SyncError::IncompleteTransfer {
                expected: total,
                received: self.received.len() as u32,
            });
        }

        let payload: Vec<u8> = (0..total)
            .flat_map(|index| self.received.get(&index).cloned().unwrap_or_default())
            .collect();

        let content = if self.is_delta {
            let base = self.base_content.as_ref().ok_or(SyncError::MissingBase)?;
            let ops = decode_ops(&payload)?;
            apply(base, &DeltaResult { ops, stats: Default::default() })?
        } else {
            payload
        };

        let actual_hash = Sha256::digest(&content);
        if actual_hash != expected_hash {
            return Err(SyncError::HashMismatch);
        }

        self.state = ReceiverState::Committed;
        Ok(content)
    }
}

impl Default for ReceiverPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::DEFAULT_WINDOW_SIZE;

    #[test]
    fn full_transfer_round_trips_through_both_pipelines() {
        let content = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let hash = Sha256::digest(&content);

        let mut receiver = ReceiverPipeline::new();
        let ack = receiver.decide_ack(hash, None);
        assert_eq!(ack, AckType::NeedFull);

        let mut sender = SenderPipeline::new();
        sender.on_file_meta_ack(ack, &content, None, 64, DEFAULT_WINDOW_SIZE).unwrap();

        loop {
            let sendable = sender.drain_sendable();
            if sendable.is_empty() {
                break;
            }
            for (index, data) in sendable {
                receiver.on_block_data(index, sender.total_chunks(), data);
                sender.on_block_ack(index);
            }
        }

        assert_eq!(sender.state(), &SenderState::Done);
        assert!(receiver.is_complete());
        let reconstructed = receiver.reassemble(hash).unwrap();
        assert_eq!(reconstructed, content);
    }

    #[test]
    fn delta_transfer_round_trips_when_receiver_has_a_similar_base() {
        let base = b"AAAAAAAAAAAAAAAABBBBBBBBBBBBBBBBCCCCCCCCCCCCCCCC".to_vec();
        let mut new_content = base.clone();
        new_content.extend_from_slice(b"DDDDDDDDDDDDDDDD");
        let hash = Sha256::digest(&new_content);

        let mut receiver = ReceiverPipeline::new();
        let ack = receiver.decide_ack(hash, Some(&base));
        assert_eq!(ack, AckType::NeedDelta);

        let base_sigs = receiver.local_signatures(DEFAULT_BLOCK_SIZE);

        let mut sender = SenderPipeline::new();
        sender
            .on_file_meta_ack(ack, &new_content, Some(&base_sigs), 16, DEFAULT_WINDOW_SIZE)
            .unwrap();

        loop {
            let sendable = sender.drain_sendable();
            if sendable.is_empty() {
                break;
            }
            for (index, data) in sendable {
                receiver.on_block_data(index, sender.total_chunks(), data);
                sender.on_block_ack(index);
            }
        }

        let reconstructed = receiver.reassemble(hash).unwrap();
        assert_eq!(reconstructed, new_content);
    }

    #[test]
    fn up_to_date_content_needs_no_transfer() {
        let content = b"identical content".to_vec();
        let hash = Sha256::digest(&content);

        let mut receiver = ReceiverPipeline::new();
        let ack = receiver.decide_ack(hash, Some(&content));
        assert_eq!(ack, AckType::UpToDate);
        assert_eq!(receiver.state(), &ReceiverState::UpToDate);

        let mut sender = SenderPipeline::new();
        sender.on_file_meta_ack(ack, &content, None, 64, DEFAULT_WINDOW_SIZE).unwrap();
        assert_eq!(sender.state(), &SenderState::UpToDate);
        assert!(sender.drain_sendable().is_empty());
    }

    #[test]
    fn reassemble_rejects_an_incomplete_transfer() {
        let mut receiver = ReceiverPipeline::new();
        receiver.decide_ack([0u8; 32], None);
        receiver.on_block_data(0, 3, b"a".to_vec());
        let err = receiver.reassemble([0u8; 32]).unwrap_err();
        assert!(matches!(err, SyncError::IncompleteTransfer { expected: 3, received: 1 }));
    }

    #[test]
    fn reassemble_rejects_a_hash_mismatch() {
        let content = b"hello".to_vec();
        let mut receiver = ReceiverPipeline::new();
        receiver.decide_ack([0u8; 32], None);
        receiver.on_block_data(0, 1, content);
        let err = receiver.reassemble([0xFFu8; 32]).unwrap_err();
        assert!(matches!(err, SyncError::HashMismatch));
    }

    #[test]
    fn delta_needs_signatures_before_planning() {
        let mut sender = SenderPipeline::new();
        let err = sender
            .on_file_meta_ack(AckType::NeedDelta, b"content", None, 64, DEFAULT_WINDOW_SIZE)
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingSignatures));
    }
}
