use crate::error::WireError;
use crate::reader::{write_u16_prefixed, Reader};

/// Message type tag carried by a [`crate::Frame`]'s header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum MsgType {
    /// Client-to-server handshake opener.
    Hello = 0x01,
    /// Server's handshake acceptance.
    Welcome = 0x02,
    /// Server's handshake refusal.
    Reject = 0x03,
    /// Full-file metadata announcement.
    FileMeta = 0x10,
    /// Receiver's response to `FileMeta`.
    FileMetaAck = 0x11,
    /// Receiver-computed block signatures for the delta path.
    SignatureList = 0x12,
    /// One chunk of file content.
    BlockData = 0x13,
    /// Receiver's acknowledgement of one `BlockData` chunk.
    BlockAck = 0x14,
    /// Sender's expectation that the transfer has finished.
    TransferComplete = 0x15,
    /// Idempotent file deletion notice.
    DeleteFile = 0x16,
}

impl TryFrom<u16> for MsgType {
    type Error = WireError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Hello),
            0x02 => Ok(Self::Welcome),
            0x03 => Ok(Self::Reject),
            0x10 => Ok(Self::FileMeta),
            0x11 => Ok(Self::FileMetaAck),
            0x12 => Ok(Self::SignatureList),
            0x13 => Ok(Self::BlockData),
            0x14 => Ok(Self::BlockAck),
            0x15 => Ok(Self::TransferComplete),
            0x16 => Ok(Self::DeleteFile),
            other => Err(WireError::UnknownMsgType(other)),
        }
    }
}

/// Capability bits negotiated during the handshake.
pub mod capability {
    /// Peer supports rsync-style delta transfers.
    pub const DELTA_SYNC: u32 = 0x1;
    /// Peer supports resuming an interrupted transfer.
    pub const RESUME: u32 = 0x2;
    /// Peer supports payload compression.
    pub const COMPRESSION: u32 = 0x4;
    /// Peer supports an encrypted channel.
    pub const ENCRYPTION: u32 = 0x8;
}

/// Reason a [`Reject`] refused a handshake.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum RejectReason {
    /// HELLO's session code did not match the server's.
    SessionCodeMismatch = 0,
    /// Protocol versions are incompatible.
    VersionIncompatible = 1,
    /// The peer's TLS pin check failed.
    PinViolation = 2,
    /// The peer id is on the block list.
    PeerBlocked = 3,
    /// The server's bandwidth or connection-rate limit rejected the attempt.
    RateLimited = 4,
}

impl TryFrom<u16> for RejectReason {
    type Error = WireError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SessionCodeMismatch),
            1 => Ok(Self::VersionIncompatible),
            2 => Ok(Self::PinViolation),
            3 => Ok(Self::PeerBlocked),
            4 => Ok(Self::RateLimited),
            other => Err(WireError::UnknownRejectReason(other)),
        }
    }
}

/// `ack_type` carried by [`FileMetaAck`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum AckType {
    /// Receiver's file already matches; no transfer needed.
    UpToDate = 0,
    /// Both sides advertise `DELTA_SYNC`; proceed with the delta path.
    NeedDelta = 1,
    /// File is missing locally, or delta is unavailable; send the whole file.
    NeedFull = 2,
}

impl TryFrom<u8> for AckType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::UpToDate),
            1 => Ok(Self::NeedDelta),
            2 => Ok(Self::NeedFull),
            other => Err(WireError::UnknownAckType(other)),
        }
    }
}

/// `HELLO` payload: `{ protocol_version, local_peer_id, session_code, capability_bitset, proposed_chunk_size }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hello {
    /// Protocol version the client speaks.
    pub protocol_version: u16,
    /// Client's opaque peer identifier.
    pub peer_id: Vec<u8>,
    /// Shared-secret session code proving membership in the mesh.
    pub session_code: Vec<u8>,
    /// Bitset of [`capability`] flags the client supports.
    pub capabilities: u32,
    /// Chunk size the client proposes for block transfers.
    pub proposed_chunk_size: u32,
}

/// `WELCOME` payload: `{ protocol_version, local_peer_id, negotiated_capabilities, agreed_chunk_size }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Welcome {
    /// Protocol version the server speaks.
    pub protocol_version: u16,
    /// Server's opaque peer identifier.
    pub peer_id: Vec<u8>,
    /// Intersection of client and server capability bitsets.
    pub capabilities: u32,
    /// `min` of the client-proposed and server-max chunk sizes.
    pub agreed_chunk_size: u32,
}

/// `REJECT` payload: `{ reason_code }` plus a human-readable detail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reject {
    /// Machine-readable refusal reason.
    pub reason: RejectReason,
    /// Optional human-readable detail.
    pub message: Vec<u8>,
}

/// `FILE_META` payload: full-file metadata announcement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMeta {
    /// Size of the file in bytes.
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: u64,
    /// POSIX permission bits.
    pub permissions: u32,
    /// File type tag (regular file, symlink, ...); opaque to this crate.
    pub file_type: u8,
    /// Identifier of the hashing algorithm used for `hash` (0 = SHA-256).
    pub hash_algo: u8,
    /// Strong digest of the complete file.
    pub hash: [u8; 32],
    /// Path relative to the watched root.
    pub path: Vec<u8>,
}

/// `FILE_META_ACK` payload: the receiver's decision after comparing `FileMeta` to its local copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMetaAck {
    /// Receiver's decision for how to proceed.
    pub ack_type: AckType,
    /// Receiver's local strong digest (meaningful when the file exists locally).
    pub local_hash: [u8; 32],
    /// Path the acknowledgement refers to.
    pub path: Vec<u8>,
}

/// One signature record inside a [`SignatureList`] payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureEntry {
    /// Zero-based block index.
    pub index: u32,
    /// Rolling (weak) checksum of the block.
    pub weak: u32,
    /// Strong digest of the block.
    pub strong: [u8; 32],
}

/// `SIGNATURE_LIST` payload: the receiver's block signatures for the delta path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureList {
    /// Path the signatures describe.
    pub path: Vec<u8>,
    /// Ordered block signatures.
    pub entries: Vec<SignatureEntry>,
}

/// `BLOCK_DATA` payload: one chunk of file content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockData {
    /// Path the chunk belongs to.
    pub path: Vec<u8>,
    /// Zero-based chunk index within the transfer.
    pub chunk_index: u32,
    /// Total number of chunks in the transfer.
    pub total_chunks: u32,
    /// Chunk bytes.
    pub data: Vec<u8>,
}

/// `BLOCK_ACK` payload: the receiver's acknowledgement of one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockAck {
    /// Path the acknowledgement refers to.
    pub path: Vec<u8>,
    /// Index of the acknowledged chunk.
    pub chunk_index: u32,
    /// Total number of chunks received so far for this transfer.
    pub received_count: u32,
}

/// `TRANSFER_COMPLETE` payload: the receiver's final status for a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferComplete {
    /// Whether the transfer committed successfully.
    pub success: bool,
    /// Path the transfer refers to.
    pub path: Vec<u8>,
    /// Human-readable reason, populated on failure.
    pub reason: Vec<u8>,
}

/// `DELETE_FILE` payload: an idempotent deletion notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteFile {
    /// Path to remove.
    pub path: Vec<u8>,
}

/// A parsed message payload, tagged by the [`MsgType`] it was decoded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// See [`Hello`].
    Hello(Hello),
    /// See [`Welcome`].
    Welcome(Welcome),
    /// See [`Reject`].
    Reject(Reject),
    /// See [`FileMeta`].
    FileMeta(FileMeta),
    /// See [`FileMetaAck`].
    FileMetaAck(FileMetaAck),
    /// See [`SignatureList`].
    SignatureList(SignatureList),
    /// See [`BlockData`].
    BlockData(BlockData),
    /// See [`BlockAck`].
    BlockAck(BlockAck),
    /// See [`TransferComplete`].
    TransferComplete(TransferComplete),
    /// See [`DeleteFile`].
    DeleteFile(DeleteFile),
}

impl Message {
    /// Returns the [`MsgType`] tag this message would be framed with.
    #[must_use]
    pub const fn msg_type(&self) -> MsgType {
        match self {
            Self::Hello(_) => MsgType::Hello,
            Self::Welcome(_) => MsgType::Welcome,
            Self::Reject(_) => MsgType::Reject,
            Self::FileMeta(_) => MsgType::FileMeta,
            Self::FileMetaAck(_) => MsgType::FileMetaAck,
            Self::SignatureList(_) => MsgType::SignatureList,
            Self::BlockData(_) => MsgType::BlockData,
            Self::BlockAck(_) => MsgType::BlockAck,
            Self::TransferComplete(_) => MsgType::TransferComplete,
            Self::DeleteFile(_) => MsgType::DeleteFile,
        }
    }

    /// Serializes the message's payload per its [`MsgType`]'s fixed layout.
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::Hello(msg) => {
                out.extend_from_slice(&msg.protocol_version.to_le_bytes());
                write_u16_prefixed(&mut out, &msg.peer_id);
                write_u16_prefixed(&mut out, &msg.session_code);
                out.extend_from_slice(&msg.capabilities.to_le_bytes());
                out.extend_from_slice(&msg.proposed_chunk_size.to_le_bytes());
            }
            Self::Welcome(msg) => {
                out.extend_from_slice(&msg.protocol_version.to_le_bytes());
                write_u16_prefixed(&mut out, &msg.peer_id);
                out.extend_from_slice(&msg.capabilities.to_le_bytes());
                out.extend_from_slice(&msg.agreed_chunk_size.to_le_bytes());
            }
            Self::Reject(msg) => {
                out.extend_from_slice(&(msg.reason as u16).to_le_bytes());
                write_u16_prefixed(&mut out, &msg.message);
            }
            Self::FileMeta(msg) => {
                out.extend_from_slice(&msg.size.to_le_bytes());
                out.extend_from_slice(&msg.mtime.to_le_bytes());
                out.extend_from_slice(&msg.permissions.to_le_bytes());
                out.push(msg.file_type);
                out.push(msg.hash_algo);
                out.extend_from_slice(&msg.hash);
                write_u16_prefixed(&mut out, &msg.path);
            }
            Self::FileMetaAck(msg) => {
                out.push(msg.ack_type as u8);
                out.extend_from_slice(&msg.local_hash);
                write_u16_prefixed(&mut out, &msg.path);
            }
            Self::SignatureList(msg) => {
                write_u16_prefixed(&mut out, &msg.path);
                out.extend_from_slice(&(msg.entries.len() as u32).to_le_bytes());
                for entry in &msg.entries {
                    out.extend_from_slice(&entry.index.to_le_bytes());
                    out.extend_from_slice(&entry.weak.to_le_bytes());
                    out.extend_from_slice(&entry.strong);
                }
            }
            Self::BlockData(msg) => {
                out.extend_from_slice(&(msg.path.len() as u16).to_le_bytes());
                out.extend_from_slice(&msg.chunk_index.to_le_bytes());
                out.extend_from_slice(&msg.total_chunks.to_le_bytes());
                out.extend_from_slice(&(msg.data.len() as u32).to_le_bytes());
                out.extend_from_slice(&msg.path);
                out.extend_from_slice(&msg.data);
            }
            Self::BlockAck(msg) => {
                out.extend_from_slice(&(msg.path.len() as u16).to_le_bytes());
                out.extend_from_slice(&msg.chunk_index.to_le_bytes());
                out.extend_from_slice(&msg.received_count.to_le_bytes());
                out.extend_from_slice(&msg.path);
            }
            Self::TransferComplete(msg) => {
                out.push(u8::from(msg.success));
                write_u16_prefixed(&mut out, &msg.path);
                write_u16_prefixed(&mut out, &msg.reason);
            }
            Self::DeleteFile(msg) => {
                write_u16_prefixed(&mut out, &msg.path);
            }
        }
        out
    }

    /// Parses a payload according to the layout named by `msg_type`.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] if the payload is truncated or carries an
    /// unrecognised enum discriminant (reject reason, ack type).
    pub fn decode(msg_type: MsgType, payload: &[u8]) -> Result<Self, WireError> {
        let mut reader = Reader::new(payload);
        Ok(match msg_type {
            MsgType::Hello => {
                let protocol_version = reader.u16()?;
                let peer_id = reader.u16_prefixed()?;
                let session_code = reader.u16_prefixed()?;
                let capabilities = reader.u32()?;
                let proposed_chunk_size = reader.u32()?;
                Self::Hello(Hello {
                    protocol_version,
                    peer_id,
                    session_code,
                    capabilities,
                    proposed_chunk_size,
                })
            }
            MsgType::Welcome => {
                let protocol_version = reader.u16()?;
                let peer_id = reader.u16_prefixed()?;
                let capabilities = reader.u32()?;
                let agreed_chunk_size = reader.u32()?;
                Self::Welcome(Welcome {
                    protocol_version,
                    peer_id,
                    capabilities,
                    agreed_chunk_size,
                })
            }
            MsgType::Reject => {
                let reason = RejectReason::try_from(reader.u16()?)?;
                let message = reader.u16_prefixed()?;
                Self::Reject(Reject { reason, message })
            }
            MsgType::FileMeta => {
                let size = reader.u64()?;
                let mtime = reader.u64()?;
                let permissions = reader.u32()?;
                let file_type = reader.u8()?;
                let hash_algo = reader.u8()?;
                let hash = reader.array32()?;
                let path = reader.u16_prefixed()?;
                Self::FileMeta(FileMeta {
                    size,
                    mtime,
                    permissions,
                    file_type,
                    hash_algo,
                    hash,
                    path,
                })
            }
            MsgType::FileMetaAck => {
                let ack_type = AckType::try_from(reader.u8()?)?;
                let local_hash = reader.array32()?;
                let path = reader.u16_prefixed()?;
                Self::FileMetaAck(FileMetaAck {
                    ack_type,
                    local_hash,
                    path,
                })
            }
            MsgType::SignatureList => {
                let path = reader.u16_prefixed()?;
                let count = reader.u32()? as usize;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let index = reader.u32()?;
                    let weak = reader.u32()?;
                    let strong = reader.array32()?;
                    entries.push(SignatureEntry {
                        index,
                        weak,
                        strong,
                    });
                }
                Self::SignatureList(SignatureList { path, entries })
            }
            MsgType::BlockData => {
                let path_len = reader.u16()? as usize;
                let chunk_index = reader.u32()?;
                let total_chunks = reader.u32()?;
                let data_len = reader.u32()? as usize;
                let path = reader.bytes(path_len)?;
                let data = reader.bytes(data_len)?;
                Self::BlockData(BlockData {
                    path,
                    chunk_index,
                    total_chunks,
                    data,
                })
            }
            MsgType::BlockAck => {
                let path_len = reader.u16()? as usize;
                let chunk_index = reader.u32()?;
                let received_count = reader.u32()?;
                let path = reader.bytes(path_len)?;
                Self::BlockAck(BlockAck {
                    path,
                    chunk_index,
                    received_count,
                })
            }
            MsgType::TransferComplete => {
                let success = reader.u8()? != 0;
                let path = reader.u16_prefixed()?;
                let reason = reader.u16_prefixed()?;
                Self::TransferComplete(TransferComplete {
                    success,
                    path,
                    reason,
                })
            }
            MsgType::DeleteFile => {
                let path = reader.u16_prefixed()?;
                Self::DeleteFile(DeleteFile { path })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_round_trips() {
        let msg = Message::Hello(Hello {
            protocol_version: 1,
            peer_id: b"peer-a".to_vec(),
            session_code: b"secret".to_vec(),
            capabilities: capability::DELTA_SYNC | capability::RESUME,
            proposed_chunk_size: 4096,
        });
        let payload = msg.encode_payload();
        let decoded = Message::decode(MsgType::Hello, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn file_meta_round_trips() {
        let msg = Message::FileMeta(FileMeta {
            size: 11,
            mtime: 1_700_000_000,
            permissions: 0o644,
            file_type: 0,
            hash_algo: 0,
            hash: [7u8; 32],
            path: b"hi.txt".to_vec(),
        });
        let payload = msg.encode_payload();
        let decoded = Message::decode(MsgType::FileMeta, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn block_data_round_trips() {
        let msg = Message::BlockData(BlockData {
            path: b"big.bin".to_vec(),
            chunk_index: 3,
            total_chunks: 10,
            data: vec![0xAB; 256],
        });
        let payload = msg.encode_payload();
        let decoded = Message::decode(MsgType::BlockData, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn signature_list_round_trips_with_multiple_entries() {
        let msg = Message::SignatureList(SignatureList {
            path: b"file.bin".to_vec(),
            entries: vec![
                SignatureEntry {
                    index: 0,
                    weak: 123,
                    strong: [1u8; 32],
                },
                SignatureEntry {
                    index: 1,
                    weak: 456,
                    strong: [2u8; 32],
                },
            ],
        });
        let payload = msg.encode_payload();
        let decoded = Message::decode(MsgType::SignatureList, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn reject_round_trips() {
        let msg = Message::Reject(Reject {
            reason: RejectReason::PinViolation,
            message: b"untrusted cert".to_vec(),
        });
        let payload = msg.encode_payload();
        let decoded = Message::decode(MsgType::Reject, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let err = Message::decode(MsgType::FileMeta, &[0u8; 3]).unwrap_err();
        assert!(matches!(err, WireError::TruncatedPayload { .. }));
    }

    #[test]
    fn decode_rejects_unknown_ack_type() {
        let mut payload = Vec::new();
        payload.push(9u8); // invalid ack_type
        payload.extend_from_slice(&[0u8; 32]);
        payload.extend_from_slice(&0u16.to_le_bytes());
        let err = Message::decode(MsgType::FileMetaAck, &payload).unwrap_err();
        assert!(matches!(err, WireError::UnknownAckType(9)));
    }
}
