//! Crypto layer for band authentication.
//!
//! - **Key agreement**: ephemeral ECDH over NIST B-163 ([`KeyPair`])
//! - **Session key**: [`SharedSecret::session_key`] mixes the agreed point
//!   with the static auth key
//! - **Proofs**: [`aes_cbc_encrypt`], AES-128-CBC with a zero IV
//!
//! No registry crate implements B-163, so the field and curve arithmetic
//! live in private submodules. They are variable time; the keys are
//! ephemeral and never leave the host.

mod cipher;
mod curve;
mod field;
mod keys;

pub use cipher::aes_cbc_encrypt;
pub use keys::*;
