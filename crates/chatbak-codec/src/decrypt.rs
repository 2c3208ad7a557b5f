//! AES-256-GCM payload decryption
//!
//! Two trailer layouts exist in the wild and nothing in the header
//! discriminates them, so the layout is an explicit input rather than a
//! guess:
//!
//! ```text
//! Checksummed (single-file backups): [ciphertext][16-byte tag][16-byte checksum]
//! TagOnly     (streamed backups):    [ciphertext][16-byte tag]
//! ```
//!
//! The checksum bytes are carried by the container but not verified here;
//! the GCM tag already authenticates every ciphertext byte.

use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use serde::Serialize;

use crate::error::AuthError;
use crate::kdf::BackupKey;
use crate::{IV_SIZE, NONCE_SIZE, TAG_SIZE};

/// The two known trailer layouts (spelled out, never inferred).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrailerLayout {
    /// 16-byte GCM tag followed by a 16-byte checksum.
    Checksummed,
    /// 16-byte GCM tag only.
    TagOnly,
}

impl TrailerLayout {
    /// Total trailer bytes after the ciphertext.
    pub const fn trailer_len(self) -> usize {
        match self {
            Self::Checksummed => TAG_SIZE * 2,
            Self::TagOnly => TAG_SIZE,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checksummed => "checksummed",
            Self::TagOnly => "tag-only",
        }
    }
}

/// Decrypt the ciphertext region that follows the header.
///
/// `region` is everything from the end of the header to the end of the
/// buffer; the trailer is split off according to `layout`. The GCM nonce is
/// the first 12 bytes of the 16-byte header IV; no associated data.
///
/// A failed tag check is [`AuthError::TagMismatch`], the dominant real-world
/// failure (wrong key, or header boundaries that did not hold), and is never
/// folded into other error kinds.
pub fn decrypt_payload(
    key: &BackupKey,
    iv: &[u8; IV_SIZE],
    region: &[u8],
    layout: TrailerLayout,
) -> Result<Vec<u8>, AuthError> {
    let trailer = layout.trailer_len();
    if region.len() < trailer {
        return Err(AuthError::TruncatedTrailer { len: region.len(), trailer });
    }

    let ciphertext = &region[..region.len() - trailer];
    let tag = &region[region.len() - trailer..region.len() - trailer + TAG_SIZE];

    // the aead API consumes ciphertext with the tag appended
    let mut ct_with_tag = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    ct_with_tag.extend_from_slice(ciphertext);
    ct_with_tag.extend_from_slice(tag);

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&iv[..NONCE_SIZE]);

    cipher
        .decrypt(nonce, ct_with_tag.as_ref())
        .map_err(|_| AuthError::TagMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IV: [u8; IV_SIZE] = [7u8; IV_SIZE];

    fn test_key() -> BackupKey {
        BackupKey::from_bytes([0x42; 32])
    }

    /// `[ciphertext][tag]` plus an optional dummy checksum
    fn encrypt_region(key: &BackupKey, plaintext: &[u8], layout: TrailerLayout) -> Vec<u8> {
        let cipher = Aes256Gcm::new(key.as_bytes().into());
        let mut region = cipher
            .encrypt(Nonce::from_slice(&IV[..NONCE_SIZE]), plaintext)
            .unwrap();
        if layout == TrailerLayout::Checksummed {
            region.extend_from_slice(&[0xCC; TAG_SIZE]);
        }
        region
    }

    #[test]
    fn test_roundtrip_tag_only() {
        let region = encrypt_region(&test_key(), b"payload bytes", TrailerLayout::TagOnly);
        let plaintext =
            decrypt_payload(&test_key(), &IV, &region, TrailerLayout::TagOnly).unwrap();
        assert_eq!(plaintext, b"payload bytes");
    }

    #[test]
    fn test_roundtrip_checksummed() {
        let region = encrypt_region(&test_key(), b"payload bytes", TrailerLayout::Checksummed);
        let plaintext =
            decrypt_payload(&test_key(), &IV, &region, TrailerLayout::Checksummed).unwrap();
        assert_eq!(plaintext, b"payload bytes");
    }

    #[test]
    fn test_checksum_bytes_are_not_verified() {
        let mut region = encrypt_region(&test_key(), b"payload", TrailerLayout::Checksummed);
        let len = region.len();
        region[len - 1] ^= 0xFF;
        assert!(decrypt_payload(&test_key(), &IV, &region, TrailerLayout::Checksummed).is_ok());
    }

    #[test]
    fn test_tampered_tag() {
        let mut region = encrypt_region(&test_key(), b"payload", TrailerLayout::TagOnly);
        let len = region.len();
        region[len - 1] ^= 0x01;
        assert_eq!(
            decrypt_payload(&test_key(), &IV, &region, TrailerLayout::TagOnly).unwrap_err(),
            AuthError::TagMismatch
        );
    }

    #[test]
    fn test_tampered_ciphertext() {
        let mut region = encrypt_region(&test_key(), b"payload", TrailerLayout::TagOnly);
        region[0] ^= 0x01;
        assert_eq!(
            decrypt_payload(&test_key(), &IV, &region, TrailerLayout::TagOnly).unwrap_err(),
            AuthError::TagMismatch
        );
    }

    #[test]
    fn test_wrong_key() {
        let region = encrypt_region(&test_key(), b"payload", TrailerLayout::TagOnly);
        let other = BackupKey::from_bytes([0x43; 32]);
        assert_eq!(
            decrypt_payload(&other, &IV, &region, TrailerLayout::TagOnly).unwrap_err(),
            AuthError::TagMismatch
        );
    }

    #[test]
    fn test_wrong_layout_is_a_tag_mismatch() {
        // reading a tag-only region as checksummed shifts the tag window
        let region = encrypt_region(&test_key(), b"payload bytes here", TrailerLayout::TagOnly);
        assert_eq!(
            decrypt_payload(&test_key(), &IV, &region, TrailerLayout::Checksummed).unwrap_err(),
            AuthError::TagMismatch
        );
    }

    #[test]
    fn test_region_shorter_than_trailer() {
        assert_eq!(
            decrypt_payload(&test_key(), &IV, &[0u8; 20], TrailerLayout::Checksummed).unwrap_err(),
            AuthError::TruncatedTrailer { len: 20, trailer: 32 }
        );
    }

    #[test]
    fn test_empty_ciphertext_decrypts_to_empty() {
        let region = encrypt_region(&test_key(), b"", TrailerLayout::TagOnly);
        assert_eq!(region.len(), TAG_SIZE);
        let plaintext =
            decrypt_payload(&test_key(), &IV, &region, TrailerLayout::TagOnly).unwrap();
        assert!(plaintext.is_empty());
    }
}
