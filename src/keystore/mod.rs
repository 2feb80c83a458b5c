//! V3 keystore codec: scrypt key derivation, AES-128-CTR encryption, and a
//! Keccak-256 MAC, serialized as the standard JSON container.
//!
//! The codec never touches storage. [`encrypt_private_key`] returns a
//! [`Keystore`] value; [`Keystore::to_json`] and [`Keystore::from_json`]
//! move it to and from the document form, and where that document lives is
//! the caller's business. Parsing performs structural validation only; all
//! cryptographic checks happen in [`decrypt_private_key`].

use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{KeyshardError, Result};

/// AES-128 in CTR mode with a full 128-bit big-endian counter, the stream
/// construction OpenSSL and the V3 standard call `aes-128-ctr`.
type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

// ── Container constants ─────────────────────────────────────────────────────

/// Container format version. Only version 3 documents are supported.
const KEYSTORE_VERSION: u32 = 3;

/// Cipher identifier stored in the container.
const CIPHER_NAME: &str = "aes-128-ctr";

/// KDF identifier stored in the container.
const KDF_NAME: &str = "scrypt";

/// Default scrypt CPU/memory cost (N), stored in kdfparams on encryption.
const KDF_N: u32 = 8192;

/// Default scrypt block size (r), stored in kdfparams on encryption.
const KDF_R: u32 = 8;

/// Default scrypt parallelism (p), stored in kdfparams on encryption.
const KDF_P: u32 = 1;

/// Derived key length. The first 16 bytes become the AES key, the second 16
/// the MAC key material.
const KDF_DKLEN: u32 = 32;

/// Upper bound on scrypt's working memory, 128 * r * n bytes, set to 1 GiB.
///
/// The heaviest parameter set standard wallet tooling writes is n=262144,
/// r=8 (256 MiB). A document past the cap is hostile or corrupt, and
/// refusing it keeps one bad container from driving allocation until the
/// process dies.
const KDF_MAX_MEMORY: u128 = 1 << 30;

/// Salt length in bytes for containers this codec produces.
const SALT_LEN: usize = 32;

// ── Container types ─────────────────────────────────────────────────────────

/// A V3 keystore document.
///
/// Fields are declared in alphabetical order in every struct here;
/// serde_json emits keys in declaration order, which makes the serialized
/// document's key order canonical and byte-stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keystore {
    /// Cipher, KDF, and MAC material.
    pub crypto: CryptoSection,
    /// Opaque container identifier; a fresh v4 UUID on encryption, not
    /// validated on parse.
    pub id: String,
    /// Container format version; always 3.
    pub version: u32,
}

/// The `crypto` object of a V3 document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoSection {
    /// Cipher identifier; always `aes-128-ctr`.
    pub cipher: String,
    /// Cipher parameters (the CTR initialization vector).
    pub cipherparams: CipherParams,
    /// Encrypted private key, hex in the document.
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
    /// KDF identifier; always `scrypt`.
    pub kdf: String,
    /// KDF parameters as used for this container.
    pub kdfparams: KdfParams,
    /// Keccak-256 tag over the MAC key material and the ciphertext.
    #[serde(with = "hex::serde")]
    pub mac: Vec<u8>,
}

/// Cipher parameters: the 16-byte initial counter block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParams {
    /// AES-CTR initialization vector, hex in the document.
    #[serde(with = "hex::serde")]
    pub iv: [u8; 16],
}

/// scrypt parameters stored alongside the ciphertext.
///
/// Decryption always derives from these stored values, never from the
/// compiled-in defaults, so documents written under older or heavier cost
/// settings keep decrypting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Derived key length in bytes; always 32.
    pub dklen: u32,
    /// CPU/memory cost; must be a power of two.
    pub n: u32,
    /// Parallelism.
    pub p: u32,
    /// Block size.
    pub r: u32,
    /// Per-container random salt, hex in the document.
    #[serde(with = "hex::serde")]
    pub salt: Vec<u8>,
}

impl Keystore {
    /// Serialize to the compact canonical JSON document.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| KeyshardError::Format(e.to_string()))
    }

    /// Parse a V3 JSON document.
    ///
    /// Fails with [`KeyshardError::Format`] on missing or malformed fields
    /// (bad hex, wrong types, truncation). Unknown extra keys are tolerated;
    /// documents in the wild carry `address` and similar. No password or MAC
    /// checks happen here.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| KeyshardError::Format(e.to_string()))
    }
}

// ── Codec operations ────────────────────────────────────────────────────────

/// Encrypt a raw 32-byte private key under a password.
///
/// Generates a fresh random salt, IV, and container id for every call, so
/// encrypting the same key twice yields two entirely different documents
/// that both decrypt back to it. The scrypt parameters in use are written
/// into `kdfparams`; the MAC is Keccak-256 over the second half of the
/// derived key followed by the ciphertext.
pub fn encrypt_private_key(private_key: &[u8; 32], password: &str) -> Result<Keystore> {
    let mut salt = vec![0u8; SALT_LEN];
    fill_random(&mut salt)?;
    let mut iv = [0u8; 16];
    fill_random(&mut iv)?;

    let kdfparams = KdfParams {
        dklen: KDF_DKLEN,
        n: KDF_N,
        p: KDF_P,
        r: KDF_R,
        salt,
    };
    let dk = derive_key(password, &kdfparams)?;

    // Safety: dk is exactly 32 bytes, so the first half is exactly 16 bytes
    let cipher_key: &[u8; 16] = dk[..16].try_into().unwrap();

    let mut data = Zeroizing::new(*private_key);
    let mut cipher = Aes128Ctr::new(cipher_key.into(), (&iv).into());
    cipher.apply_keystream(data.as_mut());
    let ciphertext = data.to_vec();

    let mac = keystore_mac(&dk[16..32], &ciphertext);

    Ok(Keystore {
        crypto: CryptoSection {
            cipher: CIPHER_NAME.to_string(),
            cipherparams: CipherParams { iv },
            ciphertext,
            kdf: KDF_NAME.to_string(),
            kdfparams,
            mac: mac.to_vec(),
        },
        id: fresh_id()?,
        version: KEYSTORE_VERSION,
    })
}

/// Decrypt a keystore container back to the raw 32-byte private key.
///
/// Validates the structural fields, re-derives the key from the **stored**
/// kdfparams, and verifies the MAC in constant time before any decryption
/// runs. A tag mismatch is the single [`KeyshardError::Authentication`]
/// error: wrong password and corrupted container are indistinguishable by
/// design. The recovered key is wrapped in [`Zeroizing`] and wiped on drop.
///
/// A kdfparams set the KDF cannot honor, outside RFC 7914's
/// log2(n) < 16 * r bound or past the 1 GiB cost cap, is a
/// [`KeyshardError::Format`] rejection before any derivation or MAC work;
/// the password plays no part in it. The heavy r=1 set some old demo
/// documents carry (n=262144, r=1, p=8) is in that class.
pub fn decrypt_private_key(keystore: &Keystore, password: &str) -> Result<Zeroizing<[u8; 32]>> {
    if keystore.version != KEYSTORE_VERSION {
        return Err(KeyshardError::Format(format!(
            "unsupported keystore version {}",
            keystore.version
        )));
    }
    if keystore.crypto.cipher != CIPHER_NAME {
        return Err(KeyshardError::Format(format!(
            "unsupported cipher {:?}",
            keystore.crypto.cipher
        )));
    }
    if keystore.crypto.kdf != KDF_NAME {
        return Err(KeyshardError::Format(format!(
            "unsupported kdf {:?}",
            keystore.crypto.kdf
        )));
    }
    if keystore.crypto.ciphertext.len() != 32 {
        return Err(KeyshardError::Format(format!(
            "ciphertext is {} bytes, expected 32",
            keystore.crypto.ciphertext.len()
        )));
    }

    // Re-derive from the stored params, not the current defaults.
    let dk = derive_key(password, &keystore.crypto.kdfparams)?;

    // Verify the tag before anything is decrypted. The comparison runs in
    // constant time; a stored tag of the wrong length compares unequal.
    let expected = keystore_mac(&dk[16..32], &keystore.crypto.ciphertext);
    if !bool::from(expected.as_slice().ct_eq(keystore.crypto.mac.as_slice())) {
        return Err(KeyshardError::Authentication);
    }

    // Safety: dk is exactly 32 bytes, so the first half is exactly 16 bytes
    let cipher_key: &[u8; 16] = dk[..16].try_into().unwrap();

    let mut plain = Zeroizing::new([0u8; 32]);
    plain.copy_from_slice(&keystore.crypto.ciphertext);
    let mut cipher = Aes128Ctr::new(
        cipher_key.into(),
        (&keystore.crypto.cipherparams.iv).into(),
    );
    cipher.apply_keystream(plain.as_mut());
    Ok(plain)
}

// ── Internals ───────────────────────────────────────────────────────────────

/// Derive the 32-byte key from the password and a container's kdfparams.
///
/// Accepts the parameters as an argument so that decryption can pass the
/// values read from the document (forward compatibility when the defaults
/// change). Rejects parameter sets this codec cannot honor: a dklen other
/// than 32, a non-power-of-two n, an n outside RFC 7914's structural bound
/// (log2(n) must be < 16 * r; scrypt backends refuse to derive past it),
/// and cost settings above [`KDF_MAX_MEMORY`].
fn derive_key(password: &str, params: &KdfParams) -> Result<Zeroizing<[u8; 32]>> {
    if params.dklen != KDF_DKLEN {
        return Err(KeyshardError::Format(format!(
            "unsupported kdfparams.dklen {}, expected {}",
            params.dklen, KDF_DKLEN
        )));
    }
    if params.n < 2 || !params.n.is_power_of_two() {
        return Err(KeyshardError::Format(format!(
            "kdfparams.n {} is not a power of two",
            params.n
        )));
    }
    let log_n = params.n.trailing_zeros();
    if u64::from(log_n) >= 16 * u64::from(params.r) {
        return Err(KeyshardError::Format(format!(
            "kdfparams.n {} is out of range: RFC 7914 requires log2(n) < 16 * r, and r is {}",
            params.n, params.r
        )));
    }
    if 128u128 * u128::from(params.r) * u128::from(params.n) > KDF_MAX_MEMORY {
        return Err(KeyshardError::Format(format!(
            "kdfparams cost 128 * {} * {} exceeds the {} byte memory cap",
            params.r, params.n, KDF_MAX_MEMORY
        )));
    }
    let scrypt_params = scrypt::Params::new(log_n as u8, params.r, params.p, KDF_DKLEN as usize)
        .map_err(|e| KeyshardError::Format(format!("invalid scrypt parameters: {e}")))?;

    let mut dk = Zeroizing::new([0u8; 32]);
    scrypt::scrypt(password.as_bytes(), &params.salt, &scrypt_params, dk.as_mut())
        .map_err(|e| KeyshardError::Format(format!("scrypt failed: {e}")))?;
    Ok(dk)
}

/// Authentication tag: Keccak-256 over (MAC key material || ciphertext).
///
/// Keccak-256 is the hash the V3 standard prescribes. Tags computed with
/// NIST SHA3-256 (same sponge, different padding) do not verify here.
fn keystore_mac(mac_key: &[u8], ciphertext: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(mac_key);
    hasher.update(ciphertext);
    hasher.finalize().into()
}

/// Fill `buf` from the OS random source.
///
/// Any failure maps to [`KeyshardError::CryptoUnavailable`]; the codec never
/// falls back to a weaker generator.
fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| KeyshardError::CryptoUnavailable(e.to_string()))
}

/// Fresh v4 UUID built from OS randomness.
///
/// Goes through [`fill_random`] rather than `Uuid::new_v4()` so that id
/// generation shares the crate's single fallible RNG path instead of
/// panicking when the OS source fails.
fn fresh_id() -> Result<String> {
    let mut raw = [0u8; 16];
    fill_random(&mut raw)?;
    Ok(uuid::Builder::from_random_bytes(raw).into_uuid().to_string())
}
