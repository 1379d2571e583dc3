//! Arithmetic in GF(2^163) with the B-163 reduction polynomial
//! `f(x) = x^163 + x^7 + x^6 + x^3 + 1`.
//!
//! Elements are three little-endian `u64` limbs; only the low 35 bits of the
//! top limb are used. The serialized form is 24 little-endian bytes, which
//! is what the band firmware expects on the wire.

use crate::core::FIELD_ELEMENT_SIZE;

/// Field degree.
pub(crate) const DEGREE: usize = 163;

/// Bits of the top limb that belong to an element.
const TOP_MASK: u64 = (1 << (DEGREE - 128)) - 1;

/// `x^7 + x^6 + x^3 + 1`, the image of `x^163` after reduction.
const REDUCTION: u64 = 0xC9;

/// Element of GF(2^163).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) struct Gf163(pub(crate) [u64; 3]);

impl Gf163 {
    pub(crate) const ZERO: Gf163 = Gf163([0, 0, 0]);
    pub(crate) const ONE: Gf163 = Gf163([1, 0, 0]);

    /// Parse 24 little-endian bytes.
    ///
    /// Returns `None` if any bit at or above the field degree is set.
    pub(crate) fn from_bytes(bytes: &[u8; FIELD_ELEMENT_SIZE]) -> Option<Self> {
        let limbs = limbs_from_bytes(bytes);
        (limbs[2] & !TOP_MASK == 0).then_some(Gf163(limbs))
    }

    /// Serialize to 24 little-endian bytes.
    pub(crate) fn to_bytes(self) -> [u8; FIELD_ELEMENT_SIZE] {
        let mut out = [0u8; FIELD_ELEMENT_SIZE];
        for (chunk, limb) in out.chunks_exact_mut(8).zip(self.0) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }

    /// Field addition (XOR).
    pub(crate) fn add(self, rhs: Gf163) -> Gf163 {
        Gf163([
            self.0[0] ^ rhs.0[0],
            self.0[1] ^ rhs.0[1],
            self.0[2] ^ rhs.0[2],
        ])
    }

    /// Multiply by `x`, reducing modulo `f`.
    fn mul_x(self) -> Gf163 {
        let [l0, l1, l2] = self.0;
        let mut out = [l0 << 1, (l1 << 1) | (l0 >> 63), (l2 << 1) | (l1 >> 63)];
        if out[2] & (1 << (DEGREE - 128)) != 0 {
            out[2] &= TOP_MASK;
            out[0] ^= REDUCTION;
        }
        Gf163(out)
    }

    fn bit(&self, index: usize) -> bool {
        (self.0[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Field multiplication (shift-and-add).
    pub(crate) fn mul(self, rhs: Gf163) -> Gf163 {
        let mut acc = Gf163::ZERO;
        let mut shifted = self;
        for i in 0..DEGREE {
            if rhs.bit(i) {
                acc = acc.add(shifted);
            }
            shifted = shifted.mul_x();
        }
        acc
    }

    pub(crate) fn square(self) -> Gf163 {
        self.mul(self)
    }

    /// Multiplicative inverse via `a^(2^163 - 2)`.
    ///
    /// The inverse of zero is zero.
    pub(crate) fn invert(self) -> Gf163 {
        let mut power = self;
        let mut acc = Gf163::ONE;
        for _ in 1..DEGREE {
            power = power.square();
            acc = acc.mul(power);
        }
        acc
    }

    pub(crate) fn div(self, rhs: Gf163) -> Gf163 {
        self.mul(rhs.invert())
    }
}

/// Split 24 little-endian bytes into limbs.
pub(crate) fn limbs_from_bytes(bytes: &[u8; FIELD_ELEMENT_SIZE]) -> [u64; 3] {
    let mut limbs = [0u64; 3];
    for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }
    limbs
}
