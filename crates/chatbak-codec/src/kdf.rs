//! Key derivation: root key → backup encryption key
//!
//! The format expands its 256-bit root key into purpose-bound keys with an
//! iterated HMAC-SHA256 loop: extract with a 32-byte seed, then counter-mode
//! expansion over a domain label. That construction is exactly HKDF-SHA256
//! with the seed as the extract salt, so it is implemented over the `hkdf`
//! crate; the pinned vectors in the tests guard bit-compatibility with
//! containers produced by deployed clients.
//!
//! Everything here is a pure function of its inputs: no I/O, no randomness,
//! no caching.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::InputError;
use crate::KEY_SIZE;

/// Domain label bound into the payload encryption key.
pub const BACKUP_ENCRYPTION_LABEL: &[u8] = b"backup encryption";

/// HKDF-SHA256 emits at most 255 blocks of 32 bytes per expansion.
const MAX_KEYSTREAM: usize = 255 * 32;

/// The caller-supplied 256-bit root key.
///
/// Held only for the duration of a decode call, zeroized on drop, and never
/// derived from a password inside this crate.
#[derive(Clone)]
pub struct RootKey {
    bytes: [u8; KEY_SIZE],
}

impl RootKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Parse a 64-character hex string. Anything else (wrong length,
    /// non-hex characters) is rejected before conversion.
    pub fn from_hex(s: &str) -> Result<Self, InputError> {
        if s.len() != 2 * KEY_SIZE {
            return Err(InputError::InvalidKeyFormat);
        }
        let decoded = hex::decode(s).map_err(|_| InputError::InvalidKeyFormat)?;
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for RootKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootKey").field("bytes", &"[REDACTED]").finish()
    }
}

/// The 256-bit key the payload cipher actually uses. Zeroized on drop.
#[derive(Clone)]
pub struct BackupKey {
    bytes: [u8; KEY_SIZE],
}

impl BackupKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for BackupKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for BackupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupKey").field("bytes", &"[REDACTED]").finish()
    }
}

/// Requested keystream exceeds a single HKDF-SHA256 expansion.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("keystream length {0} exceeds the HKDF-SHA256 limit of 8160 bytes")]
pub struct KeystreamTooLong(pub usize);

/// Expand the root key into `out_len` bytes of keystream bound to `label`.
///
/// `seed` is the extract salt; containers in the wild always use the
/// all-zero seed, which is what `None` selects.
pub fn expand_key(
    root: &RootKey,
    label: &[u8],
    out_len: usize,
    seed: Option<&[u8; KEY_SIZE]>,
) -> Result<Vec<u8>, KeystreamTooLong> {
    if out_len > MAX_KEYSTREAM {
        return Err(KeystreamTooLong(out_len));
    }
    let hk = Hkdf::<Sha256>::new(seed.map(|s| s.as_slice()), root.as_bytes());
    let mut out = vec![0u8; out_len];
    hk.expand(label, &mut out)
        .expect("length checked against the HKDF-SHA256 limit");
    Ok(out)
}

/// Derive the payload encryption key: fixed `"backup encryption"` label,
/// 32-byte output, zero seed.
pub fn derive_backup_key(root: &RootKey) -> BackupKey {
    let mut key = [0u8; KEY_SIZE];
    Hkdf::<Sha256>::new(None, root.as_bytes())
        .expand(BACKUP_ENCRYPTION_LABEL, &mut key)
        .expect("32 bytes is within the HKDF-SHA256 limit");
    BackupKey::from_bytes(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_root() -> RootKey {
        let mut bytes = [0u8; KEY_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        RootKey::from_bytes(bytes)
    }

    // Vectors computed from the reference expansion loop; these pin
    // bit-compatibility with containers produced by deployed clients.

    #[test]
    fn test_reference_vector_zero_root() {
        let key = derive_backup_key(&RootKey::from_bytes([0u8; KEY_SIZE]));
        assert_eq!(
            hex::encode(key.as_bytes()),
            "000cd53075979ccd61531727d933d4c1aa747ff468f65b8bdf89ffa174e7e757"
        );
    }

    #[test]
    fn test_reference_vector_pattern_root() {
        let key = derive_backup_key(&pattern_root());
        assert_eq!(
            hex::encode(key.as_bytes()),
            "4e54c0777a7214dfdf0af5b6e153acfa2fbdac603fea6fd1630b824e5c29eef5"
        );
    }

    #[test]
    fn test_reference_vector_two_blocks() {
        // 64-byte expansion: first block matches the 32-byte vector, the
        // loop chains correctly into the second
        let out = expand_key(
            &RootKey::from_bytes([0u8; KEY_SIZE]),
            BACKUP_ENCRYPTION_LABEL,
            64,
            None,
        )
        .unwrap();
        assert_eq!(
            hex::encode(&out),
            "000cd53075979ccd61531727d933d4c1aa747ff468f65b8bdf89ffa174e7e757\
             1cbd1b4b5eed94a0919ae8d2c60919ac26e19f1284d3eda99aed7c64ba1899e0"
        );
    }

    #[test]
    fn test_reference_vector_nonzero_seed() {
        let out = expand_key(
            &RootKey::from_bytes([0u8; KEY_SIZE]),
            BACKUP_ENCRYPTION_LABEL,
            32,
            Some(&[0x01; KEY_SIZE]),
        )
        .unwrap();
        assert_eq!(
            hex::encode(&out),
            "48c743427e9fcc69709e7e2c35561197dbca30919a11b1d86994b2afbcbc162d"
        );
    }

    #[test]
    fn test_derivation_is_pure() {
        let a = derive_backup_key(&pattern_root());
        let b = derive_backup_key(&pattern_root());
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_root_byte_avalanche() {
        let base = derive_backup_key(&pattern_root());
        let mut flipped = *pattern_root().as_bytes();
        flipped[17] ^= 0x01;
        let other = derive_backup_key(&RootKey::from_bytes(flipped));
        assert_ne!(base.as_bytes(), other.as_bytes());
    }

    #[test]
    fn test_label_avalanche() {
        let root = pattern_root();
        let a = expand_key(&root, b"backup encryption", 32, None).unwrap();
        let b = expand_key(&root, b"backup encryptioN", 32, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_keystream_limit() {
        let root = RootKey::from_bytes([0u8; KEY_SIZE]);
        assert!(expand_key(&root, b"x", 8160, None).is_ok());
        assert_eq!(
            expand_key(&root, b"x", 8161, None),
            Err(KeystreamTooLong(8161))
        );
    }

    #[test]
    fn test_from_hex() {
        let hex64 = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
        let key = RootKey::from_hex(hex64).unwrap();
        assert_eq!(key.as_bytes(), pattern_root().as_bytes());

        // mixed case is still hex
        assert!(RootKey::from_hex(&hex64.to_uppercase()).is_ok());
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert_eq!(RootKey::from_hex("").unwrap_err(), InputError::InvalidKeyFormat);
        assert_eq!(RootKey::from_hex("abcd").unwrap_err(), InputError::InvalidKeyFormat);
        // right length, wrong charset
        let bad = "zz0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
        assert_eq!(RootKey::from_hex(bad).unwrap_err(), InputError::InvalidKeyFormat);
        // 63 and 65 chars
        let hex64 = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
        assert_eq!(
            RootKey::from_hex(&hex64[..63]).unwrap_err(),
            InputError::InvalidKeyFormat
        );
        assert_eq!(
            RootKey::from_hex(&format!("{hex64}0")).unwrap_err(),
            InputError::InvalidKeyFormat
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let root = pattern_root();
        let debug = format!("{root:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("01"));
    }
}
