//! B-163 ECDH key management.
//!
//! Key material uses the tiny-ECDH byte layout the band firmware speaks:
//! a 24-byte little-endian scalar, and points serialized as `x || y`.

use rand::{RngCore, rngs::OsRng};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::curve::Point;
use super::field::{DEGREE, Gf163, limbs_from_bytes};
use crate::core::{
    AUTH_KEY_SIZE, CryptoError, FIELD_ELEMENT_SIZE, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE,
    SESSION_KEY_SECRET_OFFSET, SHARED_SECRET_SIZE,
};

/// Scalars with fewer significant bits than this are redrawn.
const MIN_SCALAR_BITS: usize = DEGREE / 2;

/// Bits of the scalar kept after clamping.
const SCALAR_BITS: usize = DEGREE - 1;

/// Attempts before giving up on drawing a usable scalar.
const MAX_DRAWS: usize = 16;

/// Private scalar. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; PRIVATE_KEY_SIZE]);

impl PrivateKey {
    /// Get the raw scalar bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_SIZE] {
        &self.0
    }

    fn scalar(&self) -> [u64; 3] {
        limbs_from_bytes(&self.0)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// Public point, `x || y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Get the serialized point.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Parse and validate a peer key.
    ///
    /// The key must be exactly 48 bytes, both coordinates canonical, and the
    /// point on the curve.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; PUBLIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::KeyAgreement("public key must be 48 bytes"))?;
        let key = PublicKey(bytes);
        key.point()?;
        Ok(key)
    }

    fn point(&self) -> Result<Point, CryptoError> {
        let (x, y) = self.0.split_at(FIELD_ELEMENT_SIZE);
        let x = coordinate(x)?;
        let y = coordinate(y)?;
        if x.is_zero() && y.is_zero() {
            return Err(CryptoError::KeyAgreement("public key is the identity"));
        }
        let point = Point::Affine { x, y };
        if !point.is_on_curve() {
            return Err(CryptoError::KeyAgreement("public key is not on the curve"));
        }
        Ok(point)
    }

    fn from_point(point: Point) -> Option<Self> {
        let Point::Affine { x, y } = point else {
            return None;
        };
        Some(PublicKey(encode_point(x, y)))
    }
}

/// Agreed point, `x || y`. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_SIZE]);

impl SharedSecret {
    /// Get the raw secret.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }

    /// Mix the secret with the static auth key: `secret[8..24] XOR auth_key`.
    pub fn session_key(&self, auth_key: &[u8; AUTH_KEY_SIZE]) -> [u8; AUTH_KEY_SIZE] {
        let mut key = [0u8; AUTH_KEY_SIZE];
        let window = &self.0[SESSION_KEY_SECRET_OFFSET..SESSION_KEY_SECRET_OFFSET + AUTH_KEY_SIZE];
        for ((out, s), a) in key.iter_mut().zip(window).zip(auth_key) {
            *out = s ^ a;
        }
        key
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Ephemeral keypair for one handshake.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS random source.
    pub fn generate() -> Result<Self, CryptoError> {
        for _ in 0..MAX_DRAWS {
            let mut bytes = [0u8; PRIVATE_KEY_SIZE];
            OsRng
                .try_fill_bytes(&mut bytes)
                .map_err(|e| CryptoError::RandomSource(e.to_string()))?;
            let result = Self::from_private(bytes);
            bytes.zeroize();
            match result {
                Ok(pair) => return Ok(pair),
                Err(CryptoError::KeyAgreement(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CryptoError::RandomSource(
            "no usable scalar after repeated draws".into(),
        ))
    }

    /// Build a keypair from raw scalar bytes.
    ///
    /// Bits from 162 up are cleared first. Scalars left with fewer than 81
    /// significant bits are rejected.
    pub fn from_private(mut bytes: [u8; PRIVATE_KEY_SIZE]) -> Result<Self, CryptoError> {
        clamp(&mut bytes);
        let private = PrivateKey(bytes);
        bytes.zeroize();

        if significant_bits(&private.scalar()) < MIN_SCALAR_BITS {
            return Err(CryptoError::KeyAgreement("private scalar too small"));
        }
        let public = PublicKey::from_point(Point::GENERATOR.mul(&private.scalar()))
            .ok_or(CryptoError::KeyAgreement("public key is the identity"))?;
        Ok(Self { private, public })
    }

    /// Get the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Get the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Agree on a shared point with a peer key.
    pub fn diffie_hellman(&self, peer: &PublicKey) -> Result<SharedSecret, CryptoError> {
        derive_shared_secret(&self.private, peer)
    }
}

/// Generate a fresh keypair.
pub fn generate_key_pair() -> Result<KeyPair, CryptoError> {
    KeyPair::generate()
}

/// Multiply a validated peer point by our scalar.
pub fn derive_shared_secret(
    private: &PrivateKey,
    peer: &PublicKey,
) -> Result<SharedSecret, CryptoError> {
    let shared = peer.point()?.mul(&private.scalar());
    let Point::Affine { x, y } = shared else {
        return Err(CryptoError::KeyAgreement("shared point is the identity"));
    };
    Ok(SharedSecret(encode_point(x, y)))
}

fn coordinate(bytes: &[u8]) -> Result<Gf163, CryptoError> {
    let bytes: &[u8; FIELD_ELEMENT_SIZE] = bytes
        .try_into()
        .map_err(|_| CryptoError::KeyAgreement("coordinate must be 24 bytes"))?;
    Gf163::from_bytes(bytes).ok_or(CryptoError::KeyAgreement("coordinate out of range"))
}

fn encode_point(x: Gf163, y: Gf163) -> [u8; PUBLIC_KEY_SIZE] {
    let mut out = [0u8; PUBLIC_KEY_SIZE];
    out[..FIELD_ELEMENT_SIZE].copy_from_slice(&x.to_bytes());
    out[FIELD_ELEMENT_SIZE..].copy_from_slice(&y.to_bytes());
    out
}

fn clamp(bytes: &mut [u8; PRIVATE_KEY_SIZE]) {
    let byte = SCALAR_BITS / 8;
    bytes[byte] &= (1u8 << (SCALAR_BITS % 8)) - 1;
    for b in &mut bytes[byte + 1..] {
        *b = 0;
    }
}

fn significant_bits(scalar: &[u64; 3]) -> usize {
    scalar
        .iter()
        .enumerate()
        .rev()
        .find(|(_, limb)| **limb != 0)
        .map(|(i, limb)| i * 64 + (64 - limb.leading_zeros() as usize))
        .unwrap_or(0)
}
