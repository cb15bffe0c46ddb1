use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use sentinelfs_antiloop::AntiLoopLedger;
use sentinelfs_bandwidth::BandwidthGovernor;
use sentinelfs_config::DaemonConfig;
use sentinelfs_conflict::{CandidateVersion, ConflictRecord, Resolution};
use sentinelfs_events::{Event, EventBus};
use sentinelfs_remesh::{RemeshConfig, RemeshStats};
use sentinelfs_session::{negotiate_defaults, server_handshake, PeerSession, SessionError};
use sentinelfs_store::VersionStore;
use sentinelfs_sync::{BlockSignature, DEFAULT_BLOCK_SIZE};
use sentinelfs_tlspin::PinStore;
use sentinelfs_wire::{
    capability, AckType, BlockAck, BlockData, DeleteFile, FileMeta, FileMetaAck, FrameCodec,
    Message, SignatureEntry, SignatureList, TransferComplete,
};

use crate::error::DaemonError;
use crate::registry::PeerRegistry;

const LOCAL_CAPABILITIES: u32 = capability::DELTA_SYNC | capability::RESUME | capability::COMPRESSION;

/// A file announced but not yet fully received from a peer.
struct PendingInbound {
    path: String,
    expected_hash: [u8; 32],
    mtime: u64,
}

/// A file this daemon announced to a peer and is waiting to plan the
/// transfer for, once `FILE_META_ACK` (and, for a delta, `SIGNATURE_LIST`)
/// arrives.
struct PendingOutbound {
    path: String,
    content: Vec<u8>,
}

/// The running daemon: owns every shared subsystem a connection handler or
/// the auto-remesh loop needs, behind an `Arc` so both can be cloned into
/// spawned tasks.
pub struct Daemon {
    /// This daemon's own peer id, presented during every handshake.
    pub local_peer_id: String,
    config: DaemonConfig,
    registry: PeerRegistry,
    events: EventBus,
    pins: PinStore,
    versions: VersionStore,
    bandwidth: BandwidthGovernor,
    antiloop: AntiLoopLedger,
    paused_folders: DashSet<String>,
    resolved_conflicts: DashSet<String>,
}

impl Daemon {
    /// Builds a daemon from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Store`] if the version store's root directory
    /// cannot be created.
    pub fn new(local_peer_id: String, config: DaemonConfig) -> Result<Self, DaemonError> {
        let versions_root = config.watched_root.join(".sentinel_versions");
        let versions = VersionStore::with_retention(versions_root, config.version_retention)?;

        let bandwidth = BandwidthGovernor::with_limits(
            config.upload_limit_bps.and_then(NonZeroU64::new).map(|limit| (limit, None)),
            config.download_limit_bps.and_then(NonZeroU64::new).map(|limit| (limit, None)),
        );

        Ok(Self {
            local_peer_id,
            config,
            registry: PeerRegistry::new(),
            events: EventBus::new(),
            pins: PinStore::new(),
            versions,
            bandwidth,
            antiloop: AntiLoopLedger::new(),
            paused_folders: DashSet::new(),
            resolved_conflicts: DashSet::new(),
        })
    }

    /// The peer registry, shared by the accept loop, the remesh loop, and
    /// IPC dispatch.
    #[must_use]
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// The event bus. Subscribe to observe daemon lifecycle events.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The certificate pin store.
    #[must_use]
    pub fn pins(&self) -> &PinStore {
        &self.pins
    }

    /// The version store.
    #[must_use]
    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    /// The bandwidth governor shared by every peer connection.
    #[must_use]
    pub fn bandwidth(&self) -> &BandwidthGovernor {
        &self.bandwidth
    }

    /// The anti-echo ledger shared by every peer worker: a worker marks a
    /// path here the instant it applies a remote write or delete, so the
    /// following local watcher event for that path is suppressed rather
    /// than broadcast back out as if it were a fresh local edit.
    #[must_use]
    pub fn antiloop(&self) -> &AntiLoopLedger {
        &self.antiloop
    }

    /// Whether sync activity for `folder` is currently paused.
    #[must_use]
    pub fn is_paused(&self, folder: &str) -> bool {
        self.paused_folders.contains(folder)
    }

    /// Decides which of two independently edited versions of `path` should
    /// win, publishing [`Event::ConflictDetected`] unless they turn out to
    /// be byte-identical.
    pub fn resolve_conflict(&self, path: &str, local: CandidateVersion, remote: CandidateVersion) -> ConflictRecord {
        let record = sentinelfs_conflict::detect(path, local, remote);
        if record.resolution != Resolution::Identical {
            self.events.publish(Event::ConflictDetected { path: path.to_string() });
        }
        record
    }

    pub(crate) fn pause_folder(&self, folder: String) {
        self.paused_folders.insert(folder);
    }

    pub(crate) fn resume_folder(&self, folder: &str) {
        self.paused_folders.remove(folder);
    }

    pub(crate) fn mark_conflict_resolved(&self, path: String) {
        self.resolved_conflicts.insert(path);
    }

    /// Accepts inbound peer connections on `config.listen_addr` until
    /// `cancellation` fires. Each accepted connection runs the session
    /// handshake and, on success, registers the peer and spawns its worker.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound.
    pub async fn run_accept_loop(self: &Arc<Self>, cancellation: CancellationToken) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        tracing::info!(target: "sentinelfs::daemon", addr = %self.config.listen_addr, "listening");

        loop {
            tokio::select! {
                () = cancellation.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(error) => {
                            tracing::warn!(target: "sentinelfs::daemon", %error, "accept failed");
                            continue;
                        }
                    };
                    let daemon = Arc::clone(self);
                    let peer_cancellation = cancellation.child_token();
                    tokio::spawn(async move {
                        tracing::debug!(target: "sentinelfs::daemon", %addr, "inbound connection");
                        daemon.handle_connection(stream, peer_cancellation).await;
                    });
                }
            }
        }
        Ok(())
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, cancellation: CancellationToken) {
        let local_peer_id = self.local_peer_id.clone();
        let session_code = self.config.session_code.clone();
        let max_chunk_size = self.config.chunk_size;

        let handshake = server_handshake(stream, &local_peer_id, session_code.as_bytes(), Duration::from_secs(10), |hello| {
            Ok(negotiate_defaults(hello.capabilities, LOCAL_CAPABILITIES, hello.proposed_chunk_size, max_chunk_size))
        })
        .await;

        let (mut framed, mut session) = match handshake {
            Ok(pair) => pair,
            Err(error) => {
                tracing::warn!(target: "sentinelfs::daemon", %error, "handshake failed");
                return;
            }
        };

        let peer_id = session.peer_id.clone();
        self.registry.insert(peer_id.clone(), session.capabilities, session.chunk_size, cancellation.clone());
        self.events.publish(Event::PeerConnected { peer_id: peer_id.clone() });

        let reason = self.run_session(&mut framed, &mut session, &peer_id, &cancellation).await;

        self.registry.remove(&peer_id);
        self.events.publish(Event::PeerDisconnected { peer_id, reason });
    }

    /// Drives one established session: reads frames until cancellation or a
    /// session reset, dispatching each decoded message to `dispatch_message`.
    /// Returns the human-readable reason the loop ended.
    async fn run_session(
        self: &Arc<Self>,
        framed: &mut Framed<TcpStream, FrameCodec>,
        session: &mut PeerSession,
        peer_id: &str,
        cancellation: &CancellationToken,
    ) -> String {
        let mut inbound: Option<PendingInbound> = None;
        let mut outbound: Option<PendingOutbound> = None;

        loop {
            tokio::select! {
                () = cancellation.cancelled() => return "session closed".to_string(),
                next = framed.next() => {
                    let frame = match next {
                        Some(Ok(frame)) => frame,
                        Some(Err(error)) => {
                            tracing::warn!(target: "sentinelfs::daemon", %peer_id, %error, "frame decode failed");
                            return error.to_string();
                        }
                        None => return "peer closed the connection".to_string(),
                    };

                    let decoded = self
                        .registry
                        .update_metrics(peer_id, |metrics| session.on_frame(frame, metrics, &self.events));
                    let message = match decoded {
                        Some(Ok(message)) => message,
                        Some(Err(SessionError::SequenceMismatch { expected, actual })) => {
                            tracing::warn!(target: "sentinelfs::daemon", %peer_id, expected, actual, "sequence mismatch, resetting session");
                            return "sequence mismatch".to_string();
                        }
                        Some(Err(error)) => {
                            tracing::warn!(target: "sentinelfs::daemon", %peer_id, %error, "session reset");
                            return error.to_string();
                        }
                        None => return "peer no longer registered".to_string(),
                    };

                    if let Err(error) = self
                        .dispatch_message(framed, session, peer_id, message, &mut inbound, &mut outbound)
                        .await
                    {
                        tracing::warn!(target: "sentinelfs::daemon", %peer_id, %error, "dispatch failed");
                    }
                }
            }
        }
    }

    /// Dispatches one decoded message: advances the receiver or sender
    /// pipeline for `peer_id` and writes whatever response the protocol
    /// calls for back over `framed`.
    async fn dispatch_message(
        self: &Arc<Self>,
        framed: &mut Framed<TcpStream, FrameCodec>,
        session: &mut PeerSession,
        peer_id: &str,
        message: Message,
        inbound: &mut Option<PendingInbound>,
        outbound: &mut Option<PendingOutbound>,
    ) -> Result<(), SessionError> {
        match message {
            Message::FileMeta(meta) => self.on_file_meta(framed, session, peer_id, meta, inbound).await,
            Message::FileMetaAck(ack) => self.on_file_meta_ack(framed, session, peer_id, ack, outbound).await,
            Message::SignatureList(list) => self.on_signature_list(framed, session, peer_id, list, outbound).await,
            Message::BlockData(data) => self.on_block_data(framed, session, peer_id, data, inbound).await,
            Message::BlockAck(ack) => self.on_block_ack(framed, session, peer_id, ack).await,
            Message::TransferComplete(complete) => {
                self.on_transfer_complete(peer_id, complete);
                Ok(())
            }
            Message::DeleteFile(delete) => {
                self.on_delete_file(peer_id, delete);
                Ok(())
            }
            Message::Hello(_) | Message::Welcome(_) | Message::Reject(_) => Ok(()),
        }
    }

    fn local_content(&self, path: &str) -> Option<Vec<u8>> {
        let versions = self.versions.list_versions(path).ok()?;
        let latest = versions.last()?;
        self.versions.read_version(path, latest.version_id).ok()
    }

    async fn on_file_meta(
        self: &Arc<Self>,
        framed: &mut Framed<TcpStream, FrameCodec>,
        session: &mut PeerSession,
        peer_id: &str,
        meta: FileMeta,
        inbound: &mut Option<PendingInbound>,
    ) -> Result<(), SessionError> {
        let path = String::from_utf8_lossy(&meta.path).into_owned();
        if self.antiloop.should_suppress(&path) {
            tracing::debug!(target: "sentinelfs::daemon", %path, "suppressing echoed file meta");
            return Ok(());
        }

        let local = self.local_content(&path);
        let Some(ack_type) = self.registry.with_receiver(peer_id, |receiver| receiver.decide_ack(meta.hash, local.as_deref())) else {
            return Ok(());
        };

        self.events.publish(Event::SyncStarted { path: path.clone(), peer_id: peer_id.to_string() });

        let local_hash = local.as_deref().map(sentinelfs_checksums::Sha256::digest).unwrap_or([0u8; 32]);
        let ack = Message::FileMetaAck(FileMetaAck {
            ack_type,
            local_hash,
            path: meta.path.clone(),
        });
        session.send(framed, &self.bandwidth, &ack).await?;

        if ack_type == AckType::NeedDelta {
            let entries = self
                .registry
                .with_receiver(peer_id, |receiver| {
                    receiver
                        .local_signatures(DEFAULT_BLOCK_SIZE)
                        .into_iter()
                        .map(|sig| SignatureEntry {
                            index: sig.index,
                            weak: sig.weak,
                            strong: sig.strong,
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            let signatures = Message::SignatureList(SignatureList { path: meta.path.clone(), entries });
            session.send(framed, &self.bandwidth, &signatures).await?;
        }

        if ack_type != AckType::UpToDate {
            *inbound = Some(PendingInbound {
                path,
                expected_hash: meta.hash,
                mtime: meta.mtime,
            });
        }
        Ok(())
    }

    async fn on_file_meta_ack(
        self: &Arc<Self>,
        framed: &mut Framed<TcpStream, FrameCodec>,
        session: &mut PeerSession,
        peer_id: &str,
        ack: FileMetaAck,
        outbound: &mut Option<PendingOutbound>,
    ) -> Result<(), SessionError> {
        let Some(pending) = outbound.take() else {
            return Ok(());
        };
        if pending.path.as_bytes() != ack.path.as_slice() {
            *outbound = Some(pending);
            return Ok(());
        }

        match ack.ack_type {
            AckType::UpToDate => {
                self.events.publish(Event::SyncCompleted {
                    path: pending.path,
                    peer_id: peer_id.to_string(),
                    bytes_transferred: 0,
                });
                Ok(())
            }
            AckType::NeedFull => {
                self.registry.with_sender(peer_id, |sender| {
                    let _ = sender.on_file_meta_ack(ack.ack_type, &pending.content, None, self.config.chunk_size, self.config.block_window_size);
                });
                self.send_pending_chunks(framed, session, peer_id, &pending.path).await
            }
            AckType::NeedDelta => {
                *outbound = Some(pending);
                Ok(())
            }
        }
    }

    async fn on_signature_list(
        self: &Arc<Self>,
        framed: &mut Framed<TcpStream, FrameCodec>,
        session: &mut PeerSession,
        peer_id: &str,
        list: SignatureList,
        outbound: &mut Option<PendingOutbound>,
    ) -> Result<(), SessionError> {
        let Some(pending) = outbound.take() else {
            return Ok(());
        };
        if pending.path.as_bytes() != list.path.as_slice() {
            *outbound = Some(pending);
            return Ok(());
        }

        let base_signatures: Vec<BlockSignature> = list
            .entries
            .iter()
            .map(|entry| BlockSignature {
                index: entry.index,
                offset: u64::from(entry.index) * u64::from(DEFAULT_BLOCK_SIZE),
                weak: entry.weak,
                strong: entry.strong,
            })
            .collect();

        self.registry.with_sender(peer_id, |sender| {
            let _ = sender.on_file_meta_ack(AckType::NeedDelta, &pending.content, Some(&base_signatures), self.config.chunk_size, self.config.block_window_size);
        });
        self.send_pending_chunks(framed, session, peer_id, &pending.path).await
    }

    async fn send_pending_chunks(
        self: &Arc<Self>,
        framed: &mut Framed<TcpStream, FrameCodec>,
        session: &mut PeerSession,
        peer_id: &str,
        path: &str,
    ) -> Result<(), SessionError> {
        let sendable = self.registry.with_sender(peer_id, |sender| sender.drain_sendable()).unwrap_or_default();
        let total_chunks = self.registry.with_sender(peer_id, |sender| sender.total_chunks()).unwrap_or(0);
        for (chunk_index, data) in sendable {
            let frame = Message::BlockData(BlockData {
                path: path.as_bytes().to_vec(),
                chunk_index,
                total_chunks,
                data,
            });
            session.send(framed, &self.bandwidth, &frame).await?;
        }
        Ok(())
    }

    async fn on_block_data(
        self: &Arc<Self>,
        framed: &mut Framed<TcpStream, FrameCodec>,
        session: &mut PeerSession,
        peer_id: &str,
        data: BlockData,
        inbound: &mut Option<PendingInbound>,
    ) -> Result<(), SessionError> {
        let path = String::from_utf8_lossy(&data.path).into_owned();
        let chunk_index = data.chunk_index;

        let received_count = self
            .registry
            .with_receiver(peer_id, |receiver| {
                receiver.on_block_data(data.chunk_index, data.total_chunks, data.data);
                receiver.received_count()
            })
            .unwrap_or(0);

        let block_ack = Message::BlockAck(BlockAck {
            path: data.path.clone(),
            chunk_index,
            received_count,
        });
        session.send(framed, &self.bandwidth, &block_ack).await?;

        let complete = self.registry.with_receiver(peer_id, |receiver| receiver.is_complete()).unwrap_or(false);
        if !complete {
            return Ok(());
        }

        let Some(pending) = inbound.take() else {
            return Ok(());
        };
        if pending.path != path {
            *inbound = Some(pending);
            return Ok(());
        }

        let reassembled = self.registry.with_receiver(peer_id, |receiver| receiver.reassemble(pending.expected_hash));
        match reassembled {
            Some(Ok(content)) => {
                match self.versions.store_version(&path, &content, pending.mtime) {
                    Ok(_) => {
                        self.antiloop.mark(&path);
                        self.events.publish(Event::SyncCompleted {
                            path: path.clone(),
                            peer_id: peer_id.to_string(),
                            bytes_transferred: content.len() as u64,
                        });
                        let complete = Message::TransferComplete(TransferComplete {
                            success: true,
                            path: path.into_bytes(),
                            reason: Vec::new(),
                        });
                        session.send(framed, &self.bandwidth, &complete).await?;
                    }
                    Err(error) => {
                        self.events.publish(Event::SyncFailed {
                            path: path.clone(),
                            peer_id: peer_id.to_string(),
                            reason: error.to_string(),
                        });
                        let complete = Message::TransferComplete(TransferComplete {
                            success: false,
                            path: path.into_bytes(),
                            reason: error.to_string().into_bytes(),
                        });
                        session.send(framed, &self.bandwidth, &complete).await?;
                    }
                }
            }
            Some(Err(error)) => {
                self.events.publish(Event::SyncFailed {
                    path: path.clone(),
                    peer_id: peer_id.to_string(),
                    reason: error.to_string(),
                });
                let complete = Message::TransferComplete(TransferComplete {
                    success: false,
                    path: path.into_bytes(),
                    reason: error.to_string().into_bytes(),
                });
                session.send(framed, &self.bandwidth, &complete).await?;
            }
            None => {}
        }
        Ok(())
    }

    async fn on_block_ack(
        self: &Arc<Self>,
        framed: &mut Framed<TcpStream, FrameCodec>,
        session: &mut PeerSession,
        peer_id: &str,
        ack: BlockAck,
    ) -> Result<(), SessionError> {
        self.registry.with_sender(peer_id, |sender| sender.on_block_ack(ack.chunk_index));
        let path = String::from_utf8_lossy(&ack.path).into_owned();
        self.send_pending_chunks(framed, session, peer_id, &path).await
    }

    fn on_transfer_complete(self: &Arc<Self>, peer_id: &str, complete: TransferComplete) {
        let path = String::from_utf8_lossy(&complete.path).into_owned();
        if complete.success {
            return;
        }
        self.events.publish(Event::SyncFailed {
            path,
            peer_id: peer_id.to_string(),
            reason: String::from_utf8_lossy(&complete.reason).into_owned(),
        });
    }

    fn on_delete_file(self: &Arc<Self>, peer_id: &str, delete: DeleteFile) {
        let path = String::from_utf8_lossy(&delete.path).into_owned();
        if self.antiloop.should_suppress(&path) {
            return;
        }
        self.antiloop.mark(&path);
        tracing::debug!(target: "sentinelfs::daemon", %peer_id, %path, "peer deleted file");
        self.events.publish(Event::FileDeleted { path });
    }

    /// Spawns the cancellable auto-remesh loop over this daemon's peer
    /// registry, publishing [`Event::RemeshTriggered`] and disconnecting the
    /// peer for each drop the loop decides on.
    pub fn spawn_remesh(self: &Arc<Self>, cancellation: CancellationToken) -> JoinHandle<RemeshStats> {
        let remesh_config = RemeshConfig {
            period: Duration::from_secs(self.config.remesh_interval_secs),
            ..RemeshConfig::default()
        };
        let daemon = Arc::clone(self);
        let daemon_for_drop = Arc::clone(self);
        tokio::spawn(sentinelfs_remesh::run(
            remesh_config,
            cancellation,
            move || daemon.registry.scores(),
            move |dropped| {
                let _ = daemon_for_drop.registry.disconnect(&dropped.peer_id);
                daemon_for_drop.events.publish(Event::RemeshTriggered {
                    added: Vec::new(),
                    dropped: vec![dropped.peer_id.clone()],
                });
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> DaemonConfig {
        DaemonConfig {
            watched_root: dir.to_path_buf(),
            listen_addr: "127.0.0.1:0".to_string(),
            session_code: "secret".to_string(),
            ..DaemonConfig::default()
        }
    }

    #[test]
    fn new_creates_the_version_store_root() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = Daemon::new("local".to_string(), test_config(dir.path())).unwrap();
        assert!(dir.path().join(".sentinel_versions").is_dir());
        assert_eq!(daemon.registry().len(), 0);
    }

    #[test]
    fn pause_and_resume_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = Daemon::new("local".to_string(), test_config(dir.path())).unwrap();
        assert!(!daemon.is_paused("docs"));
        daemon.pause_folder("docs".to_string());
        assert!(daemon.is_paused("docs"));
        daemon.resume_folder("docs");
        assert!(!daemon.is_paused("docs"));
    }

    fn candidate(mtime: u64, hash_byte: u8, peer_id: &str) -> CandidateVersion {
        CandidateVersion {
            mtime,
            content_hash: [hash_byte; 32],
            peer_id: peer_id.to_string(),
        }
    }

    #[test]
    fn resolving_a_real_conflict_publishes_conflict_detected() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = Daemon::new("local".to_string(), test_config(dir.path())).unwrap();
        let mut events = daemon.events().subscribe();

        let record = daemon.resolve_conflict("notes.txt", candidate(100, 1, "peer-a"), candidate(200, 2, "peer-b"));

        assert_eq!(record.resolution, sentinelfs_conflict::Resolution::KeepRemote);
        let event = events.try_recv().unwrap();
        assert!(matches!(event, Event::ConflictDetected { path } if path == "notes.txt"));
    }

    #[test]
    fn resolving_identical_content_does_not_publish_an_event() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = Daemon::new("local".to_string(), test_config(dir.path())).unwrap();
        let mut events = daemon.events().subscribe();

        let record = daemon.resolve_conflict("notes.txt", candidate(100, 9, "peer-a"), candidate(200, 9, "peer-b"));

        assert_eq!(record.resolution, sentinelfs_conflict::Resolution::Identical);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn antiloop_suppresses_the_write_it_just_marked() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = Daemon::new("local".to_string(), test_config(dir.path())).unwrap();
        assert!(!daemon.antiloop().should_suppress("notes.txt"));
        daemon.antiloop().mark("notes.txt");
        assert!(daemon.antiloop().should_suppress("notes.txt"));
    }
}
