//! Reconstruct-then-sign flow for split custody keys.
//!
//! This simulates multi-party signing, it is not the real thing:
//! [`sign_with_shares`] rebuilds the full private key in this process's
//! memory before signing, so a compromised host sees the whole key at that
//! moment. A true threshold signature scheme never materializes the key
//! anywhere and is the right tool when the trust model demands it. What this
//! module does guarantee is hygiene: the reconstructed bytes live only in
//! zeroizing containers and are wiped before the call returns.

use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use crate::error::{KeyshardError, Result};
use crate::shamir::{self, Share};

/// A recoverable secp256k1 ECDSA signature in the 65-byte `r || s || v`
/// wire layout, where `v` is the raw recovery id (0 or 1), not the legacy
/// 27/28 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    bytes: [u8; 65],
}

impl RecoverableSignature {
    /// The full 65-byte wire form.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.bytes
    }

    /// The 32-byte `r` component.
    pub fn r(&self) -> &[u8] {
        &self.bytes[..32]
    }

    /// The 32-byte `s` component.
    pub fn s(&self) -> &[u8] {
        &self.bytes[32..64]
    }

    /// The recovery id (0 or 1).
    pub fn recovery_id(&self) -> u8 {
        self.bytes[64]
    }
}

/// Keccak-256 digest of a payload, the prehash that gets signed.
pub fn payload_digest(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

/// Sign `payload` with a raw 32-byte private key.
///
/// The payload is hashed with Keccak-256 and signed with deterministic
/// RFC 6979 ECDSA, so one key and one payload always produce one signature.
/// Key bytes that are not a valid secp256k1 scalar (zero, or at least the
/// group order) fail with [`KeyshardError::InvalidKey`].
pub fn sign_payload(private_key: &[u8; 32], payload: &[u8]) -> Result<RecoverableSignature> {
    let signing_key =
        SigningKey::from_slice(private_key).map_err(|_| KeyshardError::InvalidKey)?;
    let digest = payload_digest(payload);
    let (signature, recovery) = signing_key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| KeyshardError::CryptoUnavailable(format!("ecdsa signing failed: {e}")))?;

    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(signature.to_bytes().as_slice());
    bytes[64] = recovery.to_byte();
    Ok(RecoverableSignature { bytes })
    // signing_key wipes its scalar on drop here
}

/// Rebuild a private key from `shares` and sign `payload` with it.
///
/// Fails like [`shamir::combine`] on insufficient or inconsistent shares.
/// A reconstruction that is not exactly 32 bytes, or whose bytes are zero
/// or at least the group order, fails with [`KeyshardError::InvalidKey`].
/// That check is no safety net against mixed-origin share sets: those
/// almost always reconstruct some valid scalar, and the result is a real
/// signature under an unrelated key, as the module docs warn. The
/// reconstructed key exists in memory only between those checks and the
/// signature; both the combine output and the local copy are wiped on
/// return.
pub fn sign_with_shares(shares: &[Share], payload: &[u8]) -> Result<RecoverableSignature> {
    let recovered = shamir::combine(shares)?;
    if recovered.len() != 32 {
        return Err(KeyshardError::InvalidKey);
    }
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&recovered);
    sign_payload(&key, payload)
}
