//! Decode facade: one linear pass over a backup container
//!
//! Start → header parsed → key derived → decrypted → validated, with typed
//! failure edges out of every stage. The only branching is the enumerated
//! trailer-layout fallback, and only when the caller did not pin a layout;
//! there is never a search over header sizes or IV offsets.

use serde::Serialize;
use tracing::{debug, warn};

use crate::decrypt::{decrypt_payload, TrailerLayout};
use crate::error::{DecodeError, InputError};
use crate::header::parse_header;
use crate::kdf::{derive_backup_key, RootKey};
use crate::postprocess::{finalize, ZLIB_MARKER};
use crate::MIN_BACKUP_SIZE;

/// Caller-side knobs for one decode call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Pin the trailer layout. `None` tries [`TrailerLayout::Checksummed`]
    /// then [`TrailerLayout::TagOnly`], the two known container revisions,
    /// in that order.
    pub trailer: Option<TrailerLayout>,
}

/// Summary of a successful decode, serializable for tooling.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeStats {
    pub input_len: usize,
    pub header_size: usize,
    pub plaintext_len: usize,
    pub compressed: bool,
    pub trailer: TrailerLayout,
}

/// A recovered database plus how it was recovered.
#[derive(Debug)]
pub struct DecodedBackup {
    pub database: Vec<u8>,
    pub stats: DecodeStats,
}

/// Decode a backup container with default options.
///
/// Deterministic: identical inputs always yield byte-identical plaintext.
pub fn decode(raw: &[u8], key: &RootKey) -> Result<DecodedBackup, DecodeError> {
    decode_with(raw, key, &DecodeOptions::default())
}

/// Convenience entry point for callers holding the key as a hex string.
pub fn decode_hex(raw: &[u8], key_hex: &str) -> Result<DecodedBackup, DecodeError> {
    let key = RootKey::from_hex(key_hex)?;
    decode(raw, &key)
}

/// Decode a backup container.
///
/// The pipeline is strictly linear: size gate → header → key → decrypt →
/// inflate/validate. Every failure is returned as a typed [`DecodeError`];
/// hostile input never panics and never crashes the host.
pub fn decode_with(
    raw: &[u8],
    key: &RootKey,
    opts: &DecodeOptions,
) -> Result<DecodedBackup, DecodeError> {
    if raw.len() < MIN_BACKUP_SIZE {
        return Err(InputError::BufferTooSmall(raw.len()).into());
    }

    let header = parse_header(raw)?;
    let backup_key = derive_backup_key(key);
    let region = &raw[header.header_size..];

    let (raw_plaintext, trailer) = match opts.trailer {
        Some(layout) => (decrypt_payload(&backup_key, &header.iv, region, layout)?, layout),
        None => {
            // enumerated fallback across the two known revisions; the
            // checksummed layout is primary, so its error is the one
            // reported when both fail
            match decrypt_payload(&backup_key, &header.iv, region, TrailerLayout::Checksummed) {
                Ok(plaintext) => (plaintext, TrailerLayout::Checksummed),
                Err(primary) => {
                    match decrypt_payload(&backup_key, &header.iv, region, TrailerLayout::TagOnly)
                    {
                        Ok(plaintext) => {
                            debug!("checksummed trailer failed, tag-only layout decrypted");
                            (plaintext, TrailerLayout::TagOnly)
                        }
                        Err(_) => {
                            warn!(%primary, "authentication failed under both trailer layouts");
                            return Err(primary.into());
                        }
                    }
                }
            }
        }
    };

    let compressed = raw_plaintext.first() == Some(&ZLIB_MARKER);
    let database = finalize(raw_plaintext)?;

    let stats = DecodeStats {
        input_len: raw.len(),
        header_size: header.header_size,
        plaintext_len: database.len(),
        compressed,
        trailer,
    };
    debug!(
        input_len = stats.input_len,
        plaintext_len = stats.plaintext_len,
        compressed,
        trailer = trailer.as_str(),
        "backup decoded"
    );

    Ok(DecodedBackup { database, stats })
}
