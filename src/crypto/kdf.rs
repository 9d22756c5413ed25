//! Key Derivation Functions
//!
//! HKDF-SHA256 based derivations for the key agreement, the root chain
//! and the per-message key material.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};
use super::{CryptoError, CryptoResult, SymmetricKey, AES_BLOCK_SIZE, KEY_LENGTH};

/// HKDF info for the key agreement output
const X3DH_INFO: &[u8] = &[0xff];

/// HKDF info for the root chain
const ROOT_CHAIN_INFO: &[u8] = b"OMEMO Root Chain";

/// HKDF info for message key expansion
const MESSAGE_KEY_INFO: &[u8] = b"OMEMO Message Key Material";

/// HKDF Extract and Expand
///
/// Single-step key derivation from input keying material.
///
/// # Arguments
/// * `salt` - Optional salt value
/// * `ikm` - Input keying material
/// * `info` - Context information
/// * `okm` - Output buffer, filled completely
pub fn hkdf_derive(salt: Option<&[u8]>, ikm: &[u8], info: &[u8], okm: &mut [u8]) -> CryptoResult<()> {
    let hkdf = Hkdf::<Sha256>::new(salt, ikm);
    hkdf.expand(info, okm)
        .map_err(|_| CryptoError::KeyDerivationFailed)
}

/// Derive the 32-byte session seed from concatenated DH outputs.
///
/// The input keying material is prefixed with 32 zero bytes and the salt is
/// 32 zero bytes.
pub fn x3dh_kdf(dh_material: &[u8]) -> CryptoResult<SymmetricKey> {
    let mut ikm = Zeroizing::new(Vec::with_capacity(KEY_LENGTH + dh_material.len()));
    ikm.extend_from_slice(&[0u8; KEY_LENGTH]);
    ikm.extend_from_slice(dh_material);

    let mut out = [0u8; KEY_LENGTH];
    hkdf_derive(Some(&[0u8; KEY_LENGTH]), &ikm, X3DH_INFO, &mut out)?;
    let key = SymmetricKey::from_bytes(out);
    out.zeroize();
    Ok(key)
}

/// Root chain KDF: `(root_key, dh_out) -> (new_root_key, chain_key)`.
pub fn root_kdf(root_key: &SymmetricKey, dh_out: &SymmetricKey) -> CryptoResult<(SymmetricKey, SymmetricKey)> {
    let mut okm = Zeroizing::new([0u8; 2 * KEY_LENGTH]);
    hkdf_derive(Some(root_key.as_bytes()), dh_out.as_bytes(), ROOT_CHAIN_INFO, &mut okm[..])?;

    let new_root = SymmetricKey::from_slice(&okm[..KEY_LENGTH])?;
    let chain = SymmetricKey::from_slice(&okm[KEY_LENGTH..])?;
    Ok((new_root, chain))
}

/// Keys expanded from a single message key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MessageKeys {
    /// AES-256 key
    pub encryption: SymmetricKey,
    /// HMAC-SHA256 key handed to the caller
    pub authentication: SymmetricKey,
    /// CBC initialization vector
    pub iv: [u8; AES_BLOCK_SIZE],
}

/// Expand a message key into encryption key, authentication key and IV.
pub fn message_kdf(message_key: &SymmetricKey) -> CryptoResult<MessageKeys> {
    let mut okm = Zeroizing::new([0u8; 2 * KEY_LENGTH + AES_BLOCK_SIZE]);
    hkdf_derive(Some(&[0u8; KEY_LENGTH]), message_key.as_bytes(), MESSAGE_KEY_INFO, &mut okm[..])?;

    let mut iv = [0u8; AES_BLOCK_SIZE];
    iv.copy_from_slice(&okm[2 * KEY_LENGTH..]);

    Ok(MessageKeys {
        encryption: SymmetricKey::from_slice(&okm[..KEY_LENGTH])?,
        authentication: SymmetricKey::from_slice(&okm[KEY_LENGTH..2 * KEY_LENGTH])?,
        iv,
    })
}
