use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::Framed;

use sentinelfs_wire::{
    capability, Frame, FrameCodec, Hello, Message, MsgType, Reject, RejectReason, Welcome,
};

use crate::error::SessionError;
use crate::state::PeerSession;

/// Longest a handshake is allowed to take before [`SessionError::Timeout`].
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

async fn recv_message<T>(framed: &mut Framed<T, FrameCodec>) -> Result<Message, SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let frame = framed
        .next()
        .await
        .ok_or(SessionError::ConnectionClosed)??;
    let msg_type = MsgType::try_from(frame.msg_type)?;
    Ok(Message::decode(msg_type, &frame.payload)?)
}

async fn send_message<T>(framed: &mut Framed<T, FrameCodec>, seq: u32, msg: &Message) -> Result<(), SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let frame = Frame::new(msg.msg_type() as u16, seq, msg.encode_payload());
    framed.send(frame).await?;
    Ok(())
}

/// Runs the client side of the handshake: sends `HELLO`, then waits for
/// `WELCOME` or `REJECT`. On success, returns the transport wrapped in the
/// same `Framed<T, FrameCodec>` used for the handshake so the caller can
/// keep driving frames over it.
///
/// # Errors
///
/// Returns [`SessionError::Rejected`] if the server sends `REJECT`,
/// [`SessionError::Timeout`] if `WELCOME`/`REJECT` does not arrive within
/// `handshake_timeout`, or [`SessionError::UnexpectedMessage`] if the server
/// sends anything else.
pub async fn client_handshake<T>(
    io: T,
    local_peer_id: &str,
    session_code: &[u8],
    capabilities: u32,
    proposed_chunk_size: u32,
    handshake_timeout: Duration,
) -> Result<(Framed<T, FrameCodec>, PeerSession), SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(io, FrameCodec);

    let hello = Message::Hello(Hello {
        protocol_version: sentinelfs_wire::PROTOCOL_VERSION,
        peer_id: local_peer_id.as_bytes().to_vec(),
        session_code: session_code.to_vec(),
        capabilities,
        proposed_chunk_size,
    });
    send_message(&mut framed, 0, &hello).await?;

    let response = timeout(handshake_timeout, recv_message(&mut framed))
        .await
        .map_err(|_elapsed| SessionError::Timeout)??;

    match response {
        Message::Welcome(Welcome {
            peer_id,
            capabilities: negotiated,
            agreed_chunk_size,
            ..
        }) => Ok((
            framed,
            PeerSession::new(
                String::from_utf8_lossy(&peer_id).into_owned(),
                negotiated,
                agreed_chunk_size,
            ),
        )),
        Message::Reject(Reject { reason, message }) => Err(SessionError::Rejected {
            reason,
            detail: String::from_utf8_lossy(&message).into_owned(),
        }),
        other => Err(SessionError::UnexpectedMessage {
            expected: MsgType::Welcome,
            actual: other.msg_type(),
        }),
    }
}

/// Runs the server side of the handshake: waits for `HELLO`, checks the
/// session code, and replies with `WELCOME` or `REJECT`. On success,
/// returns the transport's `Framed<T, FrameCodec>` alongside the negotiated
/// `PeerSession` so the caller can keep driving frames over it.
///
/// `negotiate` computes the capability/chunk-size agreement (and may reject
/// outright, e.g. because the peer id is blocked) given the client's
/// proposed values; this keeps policy — pin checks, peer block lists, rate
/// limiting — out of this crate, which only knows about framing.
///
/// # Errors
///
/// Returns [`SessionError::Timeout`] if `HELLO` does not arrive in time, or
/// [`SessionError::UnexpectedMessage`] if the first frame is not `HELLO`.
pub async fn server_handshake<T>(
    io: T,
    local_peer_id: &str,
    expected_session_code: &[u8],
    handshake_timeout: Duration,
    negotiate: impl FnOnce(&Hello) -> Result<(u32, u32), RejectReason>,
) -> Result<(Framed<T, FrameCodec>, PeerSession), SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(io, FrameCodec);

    let request = timeout(handshake_timeout, recv_message(&mut framed))
        .await
        .map_err(|_elapsed| SessionError::Timeout)??;

    let hello = match request {
        Message::Hello(hello) => hello,
        other => {
            return Err(SessionError::UnexpectedMessage {
                expected: MsgType::Hello,
                actual: other.msg_type(),
            })
        }
    };

    let decision = if hello.session_code != expected_session_code {
        Err(RejectReason::SessionCodeMismatch)
    } else {
        negotiate(&hello)
    };

    match decision {
        Ok((capabilities, chunk_size)) => {
            let welcome = Message::Welcome(Welcome {
                protocol_version: sentinelfs_wire::PROTOCOL_VERSION,
                peer_id: local_peer_id.as_bytes().to_vec(),
                capabilities,
                agreed_chunk_size: chunk_size,
            });
            send_message(&mut framed, 0, &welcome).await?;
            Ok((
                framed,
                PeerSession::new(
                    String::from_utf8_lossy(&hello.peer_id).into_owned(),
                    capabilities,
                    chunk_size,
                ),
            ))
        }
        Err(reason) => {
            let reject = Message::Reject(Reject {
                reason,
                message: format!("{reason:?}").into_bytes(),
            });
            send_message(&mut framed, 0, &reject).await?;
            Err(SessionError::Rejected {
                reason,
                detail: format!("{reason:?}"),
            })
        }
    }
}

/// Computes the intersection of two capability bitsets and the smaller of
/// two proposed chunk sizes — the common negotiation rule for [`capability`]
/// flags and chunk size agreement.
#[must_use]
pub fn negotiate_defaults(proposed_capabilities: u32, local_capabilities: u32, proposed_chunk_size: u32, max_chunk_size: u32) -> (u32, u32) {
    (
        proposed_capabilities & local_capabilities,
        proposed_chunk_size.min(max_chunk_size),
    )
}
