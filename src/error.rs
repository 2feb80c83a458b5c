use thiserror::Error;

/// Errors surfaced by keystore, share, and signing operations.
///
/// Variants are matchable so callers can tell recoverable conditions (wrong
/// password, missing shares) apart from caller bugs (parameter violations)
/// and environment failures (no usable random source).
#[derive(Error, Debug)]
pub enum KeyshardError {
    /// A keystore document or share blob is structurally invalid: missing
    /// fields, bad hex, unsupported identifiers, or inconsistent lengths.
    #[error("malformed input: {0}")]
    Format(String),

    /// The stored MAC does not match the recomputed tag. Wrong password and
    /// corrupted container are deliberately indistinguishable.
    #[error("wrong password or corrupted keystore")]
    Authentication,

    /// `split` was called with a threshold/share-count pair outside
    /// 1 <= threshold <= total <= 255.
    #[error("invalid share parameters: threshold {threshold}, total {total}")]
    InvalidParameter {
        /// Requested minimum number of shares for reconstruction.
        threshold: usize,
        /// Requested total number of shares.
        total: usize,
    },

    /// `combine` was called with fewer shares than the set's threshold.
    #[error("insufficient shares: {provided} provided, {required} required")]
    InsufficientShares {
        /// Threshold recorded in the share set.
        required: usize,
        /// Number of shares actually supplied.
        provided: usize,
    },

    /// Two shares in a combine set carry the same x-coordinate.
    #[error("duplicate share index {0}")]
    DuplicateShareIndex(u8),

    /// Key bytes do not form a usable secp256k1 signing key.
    #[error("invalid secp256k1 private key")]
    InvalidKey,

    /// The OS secure random source failed. There is no fallback generator.
    #[error("secure randomness unavailable: {0}")]
    CryptoUnavailable(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, KeyshardError>;
