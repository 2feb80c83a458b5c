//! Byte-wise Shamir secret sharing over GF(2^8).
//!
//! Every byte position of the secret gets its own random polynomial of
//! degree `threshold - 1` whose constant term is the secret byte; share `i`
//! holds the evaluations of all those polynomials at x = i. Any `threshold`
//! distinct shares rebuild the secret by Lagrange interpolation at x = 0;
//! fewer carry no information about it. x = 0 is never issued as a share
//! index because the polynomials evaluate to the secret there.
//!
//! Splitting draws coefficients from the OS random source; combining is pure
//! arithmetic with no randomness at all.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{KeyshardError, Result};

mod gf256;

/// One share of a split secret.
///
/// `index` is the nonzero x-coordinate the share was evaluated at and
/// `threshold` records how many co-derived shares reconstruction needs;
/// every share of one split carries the same threshold. `data` holds one
/// evaluation byte per secret byte and is wiped when the share is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    #[zeroize(skip)]
    index: u8,
    #[zeroize(skip)]
    threshold: u8,
    data: Vec<u8>,
}

impl Share {
    /// The share's x-coordinate (1..=255, never 0).
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Minimum number of shares from this split needed to reconstruct.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// The per-byte polynomial evaluations.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encode as `[index, threshold, data...]`.
    ///
    /// The returned buffer is a transport copy outside the zeroize guarantee;
    /// the caller owns its lifetime.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.data.len());
        out.push(self.index);
        out.push(self.threshold);
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode the `to_bytes` layout.
    ///
    /// Rejects blobs shorter than three bytes (two header bytes plus at
    /// least one data byte), a zero index, and a zero threshold.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 3 {
            return Err(KeyshardError::Format(format!(
                "share blob too short: {} bytes, need at least 3",
                bytes.len()
            )));
        }
        let index = bytes[0];
        let threshold = bytes[1];
        if index == 0 {
            return Err(KeyshardError::Format("share index 0 is reserved".into()));
        }
        if threshold == 0 {
            return Err(KeyshardError::Format(
                "share threshold must be at least 1".into(),
            ));
        }
        Ok(Share {
            index,
            threshold,
            data: bytes[2..].to_vec(),
        })
    }

    /// Hex transport form of [`Share::to_bytes`].
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse the hex transport form. Wipes the intermediate decode buffer.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut raw = hex::decode(s)
            .map_err(|e| KeyshardError::Format(format!("invalid share hex: {e}")))?;
        let share = Self::from_bytes(&raw);
        raw.zeroize();
        share
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Share data is key material; never print it.
        write!(
            f,
            "Share {{ index: {}, threshold: {}, data: [redacted; {} bytes] }}",
            self.index,
            self.threshold,
            self.data.len()
        )
    }
}

/// Split `secret` into `total` shares, any `threshold` of which reconstruct it.
///
/// Evaluation points are x = 1..=total. Polynomial coefficients come from
/// the OS random source (`CryptoUnavailable` if it fails; there is no
/// fallback) and the coefficient buffer is wiped once all byte positions are
/// processed. An empty secret is rejected: its shares would carry nothing.
pub fn split(secret: &[u8], total: u8, threshold: u8) -> Result<Vec<Share>> {
    if threshold == 0 || threshold > total {
        return Err(KeyshardError::InvalidParameter {
            threshold: threshold as usize,
            total: total as usize,
        });
    }
    if secret.is_empty() {
        return Err(KeyshardError::Format("cannot split an empty secret".into()));
    }

    let mut shares: Vec<Share> = (1..=total)
        .map(|index| Share {
            index,
            threshold,
            data: Vec::with_capacity(secret.len()),
        })
        .collect();

    // One polynomial per secret byte, low-to-high coefficients, constant
    // term first. The buffer is reused across byte positions and wiped on
    // drop.
    let mut coeffs = Zeroizing::new(vec![0u8; threshold as usize]);
    for &byte in secret {
        coeffs[0] = byte;
        if threshold > 1 {
            OsRng
                .try_fill_bytes(&mut coeffs[1..])
                .map_err(|e| KeyshardError::CryptoUnavailable(e.to_string()))?;
        }
        for share in &mut shares {
            share.data.push(poly_eval(&coeffs, share.index));
        }
    }

    Ok(shares)
}

/// Reconstruct the secret from `shares`.
///
/// Needs at least as many distinct shares as the threshold recorded in the
/// set; extra shares participate in the interpolation and do not change the
/// result. Shares from different splits with consistent markers are not
/// detectable here and produce an arbitrary byte string rather than an
/// error, so callers must keep share sets apart. The result is wrapped in
/// [`Zeroizing`] and wiped on drop.
pub fn combine(shares: &[Share]) -> Result<Zeroizing<Vec<u8>>> {
    let first = shares.first().ok_or(KeyshardError::InsufficientShares {
        required: 1,
        provided: 0,
    })?;
    let threshold = first.threshold;
    let secret_len = first.data.len();

    if shares.len() < threshold as usize {
        return Err(KeyshardError::InsufficientShares {
            required: threshold as usize,
            provided: shares.len(),
        });
    }

    let mut seen = [false; 256];
    for share in shares {
        if share.index == 0 {
            return Err(KeyshardError::Format("share index 0 is reserved".into()));
        }
        if share.threshold != threshold {
            return Err(KeyshardError::Format(
                "shares disagree on threshold".into(),
            ));
        }
        if share.data.len() != secret_len {
            return Err(KeyshardError::Format(
                "shares disagree on secret length".into(),
            ));
        }
        if seen[share.index as usize] {
            return Err(KeyshardError::DuplicateShareIndex(share.index));
        }
        seen[share.index as usize] = true;
    }

    // Lagrange basis evaluated at x = 0 depends only on the x-coordinates,
    // so compute the weights once and reuse them for every byte position.
    // In a char-2 field, 0 - x_j is x_j and x_j - x_i is x_j ^ x_i.
    let weights: Vec<u8> = shares
        .iter()
        .map(|si| {
            let mut num = 1u8;
            let mut den = 1u8;
            for sj in shares {
                if sj.index == si.index {
                    continue;
                }
                num = gf256::mul(num, sj.index);
                den = gf256::mul(den, gf256::add(sj.index, si.index));
            }
            // den is a product of nonzero differences; never zero here.
            gf256::div(num, den)
        })
        .collect();

    let mut secret = Zeroizing::new(vec![0u8; secret_len]);
    for (pos, out) in secret.iter_mut().enumerate() {
        let mut acc = 0u8;
        for (share, &weight) in shares.iter().zip(&weights) {
            acc = gf256::add(acc, gf256::mul(weight, share.data[pos]));
        }
        *out = acc;
    }

    Ok(secret)
}

/// Evaluate a polynomial (coefficients low-to-high) at x by Horner's rule.
fn poly_eval(coeffs: &[u8], x: u8) -> u8 {
    let mut acc = 0u8;
    for &c in coeffs.iter().rev() {
        acc = gf256::add(gf256::mul(acc, x), c);
    }
    acc
}
