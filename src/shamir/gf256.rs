//! Arithmetic in GF(2^8) with the AES reduction polynomial
//! x^8 + x^4 + x^3 + x + 1 (0x11b).
//!
//! Addition is XOR. Multiplication is carry-less shift-and-add with masked
//! reduction, so there are no lookup tables and no secret-dependent branches.
//! Inversion uses Fermat's little theorem (a^254). Everything operates on
//! plain bytes; there is deliberately no floating point anywhere near this
//! code.

/// AES field modulus, kept in 9 bits so the reduction can be applied with a
/// single XOR while the working value still holds its overflow bit.
const MODULUS: u16 = 0x11b;

/// Field addition. Subtraction is the same operation.
#[inline]
pub(crate) fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Field multiplication (shift-and-add, reduced modulo 0x11b).
///
/// Each round conditionally folds `a` into the accumulator and conditionally
/// reduces the shifted `a`, both via all-ones/all-zero masks rather than
/// branches.
pub(crate) fn mul(a: u8, b: u8) -> u8 {
    let mut a = u16::from(a);
    let mut b = u16::from(b);
    let mut acc: u16 = 0;
    for _ in 0..8 {
        acc ^= a & (b & 1).wrapping_neg();
        b >>= 1;
        let carry = (a >> 7) & 1;
        a = (a << 1) ^ (MODULUS & carry.wrapping_neg());
    }
    acc as u8
}

/// Multiplicative inverse via a^254.
///
/// 254 = 0b11111110, so the inverse is the product of a^2, a^4, ... a^128.
/// `inv(0)` returns 0; callers are responsible for never dividing by zero.
pub(crate) fn inv(a: u8) -> u8 {
    let a2 = mul(a, a);
    let a4 = mul(a2, a2);
    let a8 = mul(a4, a4);
    let a16 = mul(a8, a8);
    let a32 = mul(a16, a16);
    let a64 = mul(a32, a32);
    let a128 = mul(a64, a64);
    let mut out = mul(a128, a64);
    out = mul(out, a32);
    out = mul(out, a16);
    out = mul(out, a8);
    out = mul(out, a4);
    mul(out, a2)
}

/// Field division: a * inv(b). Caller must ensure b != 0.
#[inline]
pub(crate) fn div(a: u8, b: u8) -> u8 {
    mul(a, inv(b))
}
