//! keyshard: password-encrypted keystores and threshold share splitting for
//! raw 32-byte private keys.
//!
//! Two independent components and one composition:
//!
//! * [`keystore`] encrypts a key into the standard V3 JSON container
//!   (scrypt, AES-128-CTR, Keccak-256 MAC) and decrypts it back. The codec
//!   performs no file I/O; callers own persistence.
//! * [`shamir`] splits a byte secret into N shares with a reconstruction
//!   threshold T over GF(2^8) and combines T or more of them back.
//! * [`signer`] rebuilds a key from shares and signs a payload with it.
//!   Read its module docs first: the key is fully reconstructed in memory
//!   while signing.
//!
//! Secrets move through [`zeroize::Zeroizing`] containers throughout and are
//! wiped on drop.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod keystore;
pub mod shamir;
pub mod signer;

pub use error::{KeyshardError, Result};
pub use keystore::{decrypt_private_key, encrypt_private_key, Keystore};
pub use shamir::{combine, split, Share};
pub use signer::{sign_payload, sign_with_shares, RecoverableSignature};
