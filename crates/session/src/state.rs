use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use sentinelfs_bandwidth::{BandwidthGovernor, Direction};
use sentinelfs_events::{Event, EventBus};
use sentinelfs_netmetrics::PeerMetrics;
use sentinelfs_wire::{Frame, FrameCodec, Message, MsgType};

use crate::error::SessionError;

/// Lifecycle state of a [`PeerSession`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    /// The handshake is in progress.
    Handshaking,
    /// The handshake completed; the session may carry sync traffic.
    Established,
    /// Shutdown has been requested; in-flight transfers should wind down.
    Closing,
    /// The session's transport has been torn down.
    Closed,
}

/// A negotiated session with one peer.
///
/// Holds the handshake's outcome (negotiated capabilities and chunk size),
/// a monotonically increasing sequence counter for outbound frames, and a
/// [`CancellationToken`] that callers observe to cooperatively shut the
/// session's worker tasks down: a reader loop, a writer loop, and any
/// in-flight transfer all poll the same token rather than being killed
/// outright.
#[derive(Debug)]
pub struct PeerSession {
    /// The remote peer's opaque identifier.
    pub peer_id: String,
    /// Bitset of [`sentinelfs_wire::capability`] flags both sides support.
    pub capabilities: u32,
    /// Chunk size agreed upon during the handshake.
    pub chunk_size: u32,
    state: SessionState,
    next_seq: AtomicU32,
    expected_rx_seq: u32,
    liveness_last_rx: Instant,
    cancellation: CancellationToken,
}

impl PeerSession {
    /// Constructs an established session from a completed handshake.
    #[must_use]
    pub fn new(peer_id: String, capabilities: u32, chunk_size: u32) -> Self {
        Self {
            peer_id,
            capabilities,
            chunk_size,
            state: SessionState::Established,
            next_seq: AtomicU32::new(0),
            expected_rx_seq: 0,
            liveness_last_rx: Instant::now(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the next outbound sequence number and advances the counter.
    pub fn next_seq(&self) -> u32 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// A clone of this session's cancellation token, for workers to observe.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Requests cooperative shutdown: moves to [`SessionState::Closing`] and
    /// cancels the token every worker task is polling.
    pub fn begin_close(&mut self) {
        self.state = SessionState::Closing;
        self.cancellation.cancel();
    }

    /// Marks the session fully torn down once every worker has observed the
    /// cancellation and exited.
    pub fn mark_closed(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Tests whether `bit` (one of [`sentinelfs_wire::capability`]'s
    /// constants) was negotiated by both peers.
    #[must_use]
    pub fn has_capability(&self, bit: u32) -> bool {
        self.capabilities & bit == bit
    }

    /// Sends `msg` over `framed`, blocking on `governor` until the upload
    /// direction has capacity for its encoded payload, then assigning the
    /// next outbound sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Bandwidth`] if the governor denies capacity,
    /// or a wire/I/O error if the frame cannot be written.
    pub async fn send<T>(
        &self,
        framed: &mut Framed<T, FrameCodec>,
        governor: &BandwidthGovernor,
        msg: &Message,
    ) -> Result<(), SessionError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let payload = msg.encode_payload();
        governor.acquire(payload.len(), Direction::Upload, None).await?;
        let seq = self.next_seq();
        let frame = Frame::new(msg.msg_type() as u16, seq, payload);
        framed.send(frame).await?;
        Ok(())
    }

    /// Validates and decodes one received frame.
    ///
    /// Enforces strict sequence numbering: a frame whose `seq` does not
    /// match `expected_rx_seq` resets the session (records a connection
    /// reset in `metrics` and publishes [`Event::PeerReset`]) rather than
    /// being dispatched. On success, advances `expected_rx_seq` and
    /// refreshes the liveness clock.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SequenceMismatch`] on a sequence violation,
    /// or a wire error if the payload fails to decode.
    pub fn on_frame(&mut self, frame: Frame, metrics: &mut PeerMetrics, events: &EventBus) -> Result<Message, SessionError> {
        if frame.seq != self.expected_rx_seq {
            let error = SessionError::SequenceMismatch {
                expected: self.expected_rx_seq,
                actual: frame.seq,
            };
            metrics.record_connection_reset();
            self.reset(events, error.to_string());
            return Err(error);
        }
        self.expected_rx_seq = self.expected_rx_seq.wrapping_add(1);
        self.liveness_last_rx = Instant::now();

        let msg_type = MsgType::try_from(frame.msg_type)?;
        Ok(Message::decode(msg_type, &frame.payload)?)
    }

    /// Checks whether a frame has arrived within `liveness_timeout` of now.
    /// A caller should poll this on an interval alongside `on_frame`; a
    /// timeout resets the session the same way a sequence violation does.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::LivenessTimeout`] if the timeout has elapsed.
    pub fn check_liveness(&mut self, liveness_timeout: Duration, metrics: &mut PeerMetrics, events: &EventBus) -> Result<(), SessionError> {
        if self.liveness_last_rx.elapsed() < liveness_timeout {
            return Ok(());
        }
        metrics.record_connection_reset();
        self.reset(events, "liveness timeout".to_string());
        Err(SessionError::LivenessTimeout)
    }

    fn reset(&mut self, events: &EventBus, reason: String) {
        self.state = SessionState::Closing;
        self.cancellation.cancel();
        events.publish(Event::PeerReset {
            peer_id: self.peer_id.clone(),
            reason,
        });
    }
}
