//! PKCS#7 Padding
//!
//! Block-alignment padding (RFC 5652) applied before AES-CBC. The trailer
//! check runs over a full block without data-dependent early exits.

use subtle::{ConstantTimeEq, ConstantTimeLess};
use super::{CryptoError, CryptoResult};

/// Pad `data` up to the next multiple of `block_size`.
///
/// A full block of padding is appended when `data` is already aligned.
pub fn pkcs7_pad(data: &[u8], block_size: usize) -> CryptoResult<Vec<u8>> {
    if block_size == 0 || block_size > 255 {
        return Err(CryptoError::InvalidPadding);
    }

    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    Ok(padded)
}

/// Strip and validate a PKCS#7 trailer, returning the unpadded prefix.
pub fn pkcs7_unpad(padded: &[u8], block_size: usize) -> CryptoResult<&[u8]> {
    if block_size == 0 || block_size > 255 {
        return Err(CryptoError::InvalidPadding);
    }
    if padded.is_empty() || padded.len() % block_size != 0 {
        return Err(CryptoError::InvalidPadding);
    }

    let pad_byte = padded[padded.len() - 1];
    let pad_len = pad_byte as usize;

    // 1 <= pad_len <= block_size
    let mut valid = !pad_byte.ct_eq(&0);
    valid &= !(block_size as u8).ct_lt(&pad_byte);

    let last_block = &padded[padded.len() - block_size..];
    for (i, byte) in last_block.iter().rev().enumerate() {
        let in_padding = (i as u8).ct_lt(&pad_byte);
        valid &= !in_padding | byte.ct_eq(&pad_byte);
    }

    if !bool::from(valid) {
        return Err(CryptoError::InvalidPadding);
    }

    Ok(&padded[..padded.len() - pad_len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_lengths() {
        assert_eq!(pkcs7_pad(b"", 16).unwrap(), vec![16u8; 16]);
        assert_eq!(pkcs7_pad(&[0u8; 15], 16).unwrap().len(), 16);
        assert_eq!(pkcs7_pad(&[0u8; 16], 16).unwrap().len(), 32);

        let padded = pkcs7_pad(b"YELLOW SUBMARINE!", 16).unwrap();
        assert_eq!(&padded[17..], &[15u8; 15][..]);
    }

    #[test]
    fn test_unpad_strips_trailer() {
        let padded = pkcs7_pad(b"hello", 16).unwrap();
        assert_eq!(pkcs7_unpad(&padded, 16).unwrap(), b"hello");

        let full = pkcs7_pad(&[7u8; 32], 16).unwrap();
        assert_eq!(pkcs7_unpad(&full, 16).unwrap(), &[7u8; 32][..]);
    }

    #[test]
    fn test_unpad_rejects_malformed() {
        // Unaligned
        assert_eq!(pkcs7_unpad(&[1u8; 15], 16), Err(CryptoError::InvalidPadding));
        // Empty
        assert_eq!(pkcs7_unpad(&[], 16), Err(CryptoError::InvalidPadding));
        // Zero pad byte
        let mut zero = [0u8; 16];
        zero[15] = 0;
        assert_eq!(pkcs7_unpad(&zero, 16), Err(CryptoError::InvalidPadding));
        // Pad length larger than a block
        let mut large = [17u8; 32];
        large[31] = 17;
        assert_eq!(pkcs7_unpad(&large, 16), Err(CryptoError::InvalidPadding));
        // Inconsistent trailer
        let mut mixed = pkcs7_pad(b"abc", 16).unwrap();
        mixed[10] ^= 0x01;
        assert_eq!(pkcs7_unpad(&mixed, 16), Err(CryptoError::InvalidPadding));
    }

    #[test]
    fn test_invalid_block_size() {
        assert!(pkcs7_pad(b"x", 0).is_err());
        assert!(pkcs7_pad(b"x", 256).is_err());
        assert!(pkcs7_unpad(&[1u8; 16], 0).is_err());
    }
}
