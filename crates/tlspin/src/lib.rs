//! SPKI (subject public key info) certificate pinning for peer TLS
//! connections.
//!
//! A pin is the SHA-256 digest of a certificate's DER-encoded SPKI, so a
//! certificate renewal that keeps the same keypair does not require
//! re-pinning. [`PinStore`] supports four verification modes:
//!
//! - [`PinMode::None`] — no verification; every SPKI is accepted.
//! - [`PinMode::Tofu`] — trust the first SPKI seen for a peer id and pin it;
//!   any later connection presenting a different SPKI is rejected.
//! - [`PinMode::Strict`] — the peer must already have a pin provisioned via
//!   [`PinStore::provision`] (by the operator, out of band); an unpinned
//!   peer is rejected outright, with no implicit trust-on-first-use.
//! - [`PinMode::SpkiOnly`] — like [`PinMode::Strict`], but a peer may have
//!   more than one provisioned SPKI at once, so a planned key rotation can
//!   register the new key before the old one is retired.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Verification policy applied by [`PinStore::verify`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PinMode {
    /// No pin checking.
    None,
    /// Trust-on-first-use.
    Tofu,
    /// Require an operator-provisioned pin; no implicit trust.
    Strict,
    /// Like `Strict`, but allows multiple concurrently valid pins per peer.
    SpkiOnly,
}

/// A single pinned SPKI fingerprint for one peer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificatePin {
    /// SHA-256 digest of the peer's DER-encoded SPKI.
    pub fingerprint: [u8; 32],
    /// Unix timestamp (seconds) the pin was first recorded.
    pub first_seen: u64,
    /// Unix timestamp (seconds) the pin was last successfully matched.
    pub last_verified: u64,
}

impl CertificatePin {
    /// Renders the fingerprint as the conventional `base64` pin string.
    #[must_use]
    pub fn fingerprint_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.fingerprint)
    }
}

/// Why a pin check failed.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum PinError {
    /// The presented SPKI does not match any pin on record for this peer.
    #[error("SPKI fingerprint for peer {peer_id} does not match the pinned certificate")]
    Mismatch {
        /// The peer whose certificate failed verification.
        peer_id: String,
    },
    /// `PinMode::Strict` or `PinMode::SpkiOnly` rejected a peer with no
    /// provisioned pin.
    #[error("peer {peer_id} has no provisioned pin and strict mode forbids trust-on-first-use")]
    NotProvisioned {
        /// The peer with no pin on record.
        peer_id: String,
    },
}

fn spki_fingerprint(spki_der: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(spki_der);
    hasher.finalize().into()
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Holds pinned SPKI fingerprints for every peer the daemon has connected to.
pub struct PinStore {
    pins: DashMap<String, Vec<CertificatePin>>,
}

impl PinStore {
    /// Creates an empty pin store.
    #[must_use]
    pub fn new() -> Self {
        Self { pins: DashMap::new() }
    }

    /// Registers a pin for `peer_id` ahead of time, as required before a
    /// successful [`verify`](Self::verify) under [`PinMode::Strict`] or
    /// [`PinMode::SpkiOnly`].
    pub fn provision(&self, peer_id: &str, spki_der: &[u8]) {
        let fingerprint = spki_fingerprint(spki_der);
        let now = now_unix();
        self.pins.entry(peer_id.to_string()).or_default().push(CertificatePin {
            fingerprint,
            first_seen: now,
            last_verified: now,
        });
    }

    /// Verifies a freshly observed SPKI for `peer_id` under `mode`, pinning
    /// it (under [`PinMode::Tofu`]) if this is the first time the peer has
    /// been seen.
    ///
    /// # Errors
    ///
    /// Returns [`PinError::Mismatch`] if the SPKI does not match any pin on
    /// record, or [`PinError::NotProvisioned`] under strict modes when no
    /// pin exists yet.
    pub fn verify(&self, peer_id: &str, spki_der: &[u8], mode: PinMode) -> Result<(), PinError> {
        if mode == PinMode::None {
            return Ok(());
        }

        let fingerprint = spki_fingerprint(spki_der);
        let mut entry = self.pins.entry(peer_id.to_string()).or_default();

        if let Some(pin) = entry.iter_mut().find(|pin| pin.fingerprint == fingerprint) {
            pin.last_verified = now_unix();
            return Ok(());
        }

        match mode {
            PinMode::None => unreachable!("handled above"),
            PinMode::Tofu if entry.is_empty() => {
                let now = now_unix();
                entry.push(CertificatePin {
                    fingerprint,
                    first_seen: now,
                    last_verified: now,
                });
                Ok(())
            }
            PinMode::Tofu => Err(PinError::Mismatch {
                peer_id: peer_id.to_string(),
            }),
            PinMode::Strict | PinMode::SpkiOnly if entry.is_empty() => Err(PinError::NotProvisioned {
                peer_id: peer_id.to_string(),
            }),
            PinMode::Strict | PinMode::SpkiOnly => Err(PinError::Mismatch {
                peer_id: peer_id.to_string(),
            }),
        }
    }

    /// Returns the pins currently on record for `peer_id`, if any.
    #[must_use]
    pub fn pins_for(&self, peer_id: &str) -> Vec<CertificatePin> {
        self.pins.get(peer_id).map(|entry| entry.clone()).unwrap_or_default()
    }

    /// Removes a specific pin, e.g. once a rotated-out key is fully retired.
    pub fn revoke(&self, peer_id: &str, fingerprint: [u8; 32]) {
        if let Some(mut entry) = self.pins.get_mut(peer_id) {
            entry.retain(|pin| pin.fingerprint != fingerprint);
        }
    }
}

impl Default for PinStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_mode_accepts_anything() {
        let store = PinStore::new();
        assert!(store.verify("peer-a", b"cert-1", PinMode::None).is_ok());
        assert!(store.verify("peer-a", b"cert-2", PinMode::None).is_ok());
    }

    #[test]
    fn tofu_pins_on_first_use_then_enforces_it() {
        let store = PinStore::new();
        assert!(store.verify("peer-a", b"cert-1", PinMode::Tofu).is_ok());
        assert!(store.verify("peer-a", b"cert-1", PinMode::Tofu).is_ok());
        let err = store.verify("peer-a", b"cert-2", PinMode::Tofu).unwrap_err();
        assert_eq!(
            err,
            PinError::Mismatch {
                peer_id: "peer-a".to_string()
            }
        );
    }

    #[test]
    fn strict_rejects_unprovisioned_peer() {
        let store = PinStore::new();
        let err = store.verify("peer-a", b"cert-1", PinMode::Strict).unwrap_err();
        assert_eq!(
            err,
            PinError::NotProvisioned {
                peer_id: "peer-a".to_string()
            }
        );
    }

    #[test]
    fn strict_accepts_provisioned_peer() {
        let store = PinStore::new();
        store.provision("peer-a", b"cert-1");
        assert!(store.verify("peer-a", b"cert-1", PinMode::Strict).is_ok());
    }

    #[test]
    fn spki_only_allows_two_concurrent_pins_during_rotation() {
        let store = PinStore::new();
        store.provision("peer-a", b"old-cert");
        store.provision("peer-a", b"new-cert");
        assert!(store.verify("peer-a", b"old-cert", PinMode::SpkiOnly).is_ok());
        assert!(store.verify("peer-a", b"new-cert", PinMode::SpkiOnly).is_ok());
    }

    #[test]
    fn revoke_removes_a_pin() {
        let store = PinStore::new();
        store.provision("peer-a", b"old-cert");
        let fingerprint = spki_fingerprint(b"old-cert");
        store.revoke("peer-a", fingerprint);
        let err = store.verify("peer-a", b"old-cert", PinMode::Strict).unwrap_err();
        assert_eq!(
            err,
            PinError::NotProvisioned {
                peer_id: "peer-a".to_string()
            }
        );
    }
}
