//! Message Cipher
//!
//! AES-256-CBC over PKCS#7 padded plaintext, keyed by a single ratchet
//! message key. The authentication key from the same expansion is exposed
//! so that a MAC can be attached outside the cipher.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use super::{
    message_kdf, pkcs7_pad, pkcs7_unpad, CryptoError, CryptoResult, MessageKeys, SymmetricKey,
    AES_BLOCK_SIZE,
};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Cipher bound to one message key.
pub struct MessageCipher {
    keys: MessageKeys,
}

impl MessageCipher {
    /// Expand `message_key` into cipher and authentication keys.
    pub fn new(message_key: &SymmetricKey) -> CryptoResult<Self> {
        Ok(Self {
            keys: message_kdf(message_key)?,
        })
    }

    /// Encrypt a plaintext
    ///
    /// # Returns
    /// The CBC ciphertext, always a non-empty multiple of 16 bytes
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut buf = pkcs7_pad(plaintext, AES_BLOCK_SIZE)?;
        let len = buf.len();

        Aes256CbcEnc::new_from_slices(self.keys.encryption.as_bytes(), &self.keys.iv)
            .map_err(|_| CryptoError::KeyDerivationFailed)?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(|_| CryptoError::InvalidPadding)?;

        Ok(buf)
    }

    /// Decrypt a ciphertext and strip its padding
    pub fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidPadding);
        }

        let mut buf = ciphertext.to_vec();
        Aes256CbcDec::new_from_slices(self.keys.encryption.as_bytes(), &self.keys.iv)
            .map_err(|_| CryptoError::KeyDerivationFailed)?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|_| CryptoError::InvalidPadding)?;

        let plaintext = pkcs7_unpad(&buf, AES_BLOCK_SIZE)?.to_vec();
        zeroize::Zeroize::zeroize(&mut buf);
        Ok(plaintext)
    }

    /// Authentication key derived alongside the encryption key
    pub fn auth_key(&self) -> &SymmetricKey {
        &self.keys.authentication
    }
}
