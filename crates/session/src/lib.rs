//! Peer session handshake and lifecycle, built on `sentinelfs-wire`'s frame
//! codec.
//!
//! [`client_handshake`] and [`server_handshake`] drive the `HELLO` /
//! `WELCOME` / `REJECT` exchange over any `AsyncRead + AsyncWrite`
//! transport and return the live framed transport alongside an established
//! [`PeerSession`] holding the negotiated capability bitset, chunk size, and
//! a [`PeerSession::cancellation_token`] workers observe to shut down
//! cooperatively. [`PeerSession::send`]/[`PeerSession::on_frame`] then drive
//! that transport: assigning/validating sequence numbers, pacing writes
//! through a bandwidth governor, and resetting the session on a sequence
//! violation or liveness timeout.

mod error;
mod handshake;
mod state;

pub use error::SessionError;
pub use handshake::{client_handshake, negotiate_defaults, server_handshake, DEFAULT_HANDSHAKE_TIMEOUT};
pub use state::{PeerSession, SessionState};
