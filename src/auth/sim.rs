//! In-memory band used by the handshake and session tests.

use crate::core::{AUTH_KEY_SIZE, PUBLIC_KEY_PREFIX};
use crate::crypto::{KeyPair, PublicKey, aes_cbc_encrypt};

/// Answers the band side of the handshake with fixed key material.
pub(crate) struct SimulatedBand {
    auth_key: [u8; AUTH_KEY_SIZE],
    key_pair: KeyPair,
    random: [u8; 16],
    session_key: Option<[u8; 16]>,
}

impl SimulatedBand {
    pub(crate) fn new(auth_key: [u8; AUTH_KEY_SIZE]) -> Self {
        let mut scalar = [0u8; 24];
        for (i, b) in scalar.iter_mut().enumerate() {
            *b = 0xC3 ^ (i as u8).wrapping_mul(29);
        }
        Self {
            auth_key,
            key_pair: KeyPair::from_private(scalar).expect("fixed band scalar"),
            random: *b"band-random-0001",
            session_key: None,
        }
    }

    /// Reply to the host's announcement with `10 04 01 | random | pub`.
    pub(crate) fn answer_public_key(&mut self, announcement: &[u8]) -> Option<Vec<u8>> {
        let host_key = announcement.strip_prefix(&PUBLIC_KEY_PREFIX[..])?;
        let host_key = PublicKey::from_slice(host_key).ok()?;
        let secret = self.key_pair.diffie_hellman(&host_key).ok()?;
        self.session_key = Some(secret.session_key(&self.auth_key));

        let mut reply = vec![0x10, 0x04, 0x01];
        reply.extend_from_slice(&self.random);
        reply.extend_from_slice(self.key_pair.public_key().as_bytes());
        Some(reply)
    }

    /// Check both proofs; reply `10 05 01` on success, `10 05 04` otherwise.
    pub(crate) fn answer_confirmation(&self, confirmation: &[u8]) -> Vec<u8> {
        let ok = self.session_key.is_some_and(|session_key| {
            let c1 = aes_cbc_encrypt(&self.auth_key, &self.random).expect("one block");
            let c2 = aes_cbc_encrypt(&session_key, &self.random).expect("one block");
            confirmation.len() == 33
                && confirmation[0] == 0x05
                && confirmation[1..17] == c1[..]
                && confirmation[17..] == c2[..]
        });
        vec![0x10, 0x05, if ok { 0x01 } else { 0x04 }]
    }
}
