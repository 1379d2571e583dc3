//! AES-128-CBC with a zero IV, as the band uses for its auth proofs.

use aes::Aes128;
use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::NoPadding};

use crate::core::{AES_BLOCK_SIZE, AUTH_KEY_SIZE, CryptoError};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;

/// Encrypt whole blocks under `key` with an all-zero IV. No padding is added.
pub fn aes_cbc_encrypt(key: &[u8; AUTH_KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let len = plaintext.len();
    if len % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidBlockLength(len));
    }

    let iv = [0u8; AES_BLOCK_SIZE];
    let mut buffer = plaintext.to_vec();
    Aes128CbcEnc::new(key.into(), &iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
        .map_err(|_| CryptoError::InvalidBlockLength(len))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];

    #[test]
    fn test_single_block_known_answer() {
        let plaintext = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let ciphertext = aes_cbc_encrypt(&KEY, &plaintext).unwrap();
        assert_eq!(hex::encode(ciphertext), "69c4e0d86a7b0430d8cdb78070b4c55a");
    }

    #[test]
    fn test_blocks_are_chained() {
        let p1 = [0x11u8; 16];
        let p2 = [0x22u8; 16];
        let both = [p1, p2].concat();

        let chained = aes_cbc_encrypt(&KEY, &both).unwrap();
        let c1 = aes_cbc_encrypt(&KEY, &p1).unwrap();
        assert_eq!(&chained[..16], &c1[..]);

        let mixed: Vec<u8> = c1.iter().zip(p2).map(|(c, p)| c ^ p).collect();
        let c2 = aes_cbc_encrypt(&KEY, &mixed).unwrap();
        assert_eq!(&chained[16..], &c2[..]);
    }

    #[test]
    fn test_rejects_partial_blocks() {
        assert_eq!(
            aes_cbc_encrypt(&KEY, &[0u8; 15]),
            Err(CryptoError::InvalidBlockLength(15))
        );
        assert_eq!(aes_cbc_encrypt(&KEY, &[]).unwrap(), Vec::<u8>::new());
    }
}
