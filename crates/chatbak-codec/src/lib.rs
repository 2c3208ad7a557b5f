//! chatbak-codec: codec for encrypted messenger database backups
//!
//! Decodes crypt14/crypt15-style backup containers: a length-prefixed binary
//! header carrying the IV, an AES-256-GCM payload, and a short trailer.
//!
//! Container layout:
//! ```text
//! [1 byte:  embedded record size (0-255)]
//! [0/1 byte: 0x01 feature-flag byte]
//! [N bytes: embedded record, holding the 16-byte IV behind the `0a 10`
//!           marker and, in salted variants, a 16-byte salt behind `12 10`]
//! [M bytes: AES-256-GCM ciphertext]
//! [16 bytes: GCM tag]
//! [0/16 bytes: trailing checksum (single-file backups only)]
//! ```
//!
//! Pipeline: raw bytes → header parse → key expansion (fixed
//! `"backup encryption"` label) → AEAD decrypt → optional zlib inflate →
//! SQLite signature check. Each stage fails with a typed error so callers
//! can tell a wrong key from a corrupt container.
//!
//! The crate is pure and synchronous: no I/O, no shared state, safe to call
//! concurrently on independent buffers.

pub mod codec;
pub mod decrypt;
pub mod error;
pub mod header;
pub mod kdf;
pub mod postprocess;

pub use codec::{decode, decode_hex, decode_with, DecodeOptions, DecodeStats, DecodedBackup};
pub use decrypt::{decrypt_payload, TrailerLayout};
pub use error::{AuthError, DecodeError, DecodeResult, FormatError, HeaderError, InputError};
pub use header::{parse_header, BackupHeader};
pub use kdf::{derive_backup_key, expand_key, BackupKey, RootKey, BACKUP_ENCRYPTION_LABEL};
pub use postprocess::{finalize, SQLITE_SIGNATURE};

/// Size of a root or derived key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the IV embedded in the container header
pub const IV_SIZE: usize = 16;

/// Bytes of the IV actually consumed as the GCM nonce (96-bit convention)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Smallest buffer worth parsing; shorter inputs are rejected before any parse
pub const MIN_BACKUP_SIZE: usize = 100;
