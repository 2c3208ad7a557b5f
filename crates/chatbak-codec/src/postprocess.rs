//! Post-decryption processing: zlib unwrap and structural signature check

use std::io::Write;

use flate2::write::ZlibDecoder;
use tracing::debug;

use crate::error::FormatError;

/// Leading byte of a zlib stream.
pub const ZLIB_MARKER: u8 = 0x78;

/// Every recovered payload must begin with this 15-byte signature.
pub const SQLITE_SIGNATURE: &[u8; 15] = b"SQLite format 3";

/// Validate a decrypted payload, inflating the zlib wrapper when present.
///
/// Once the leading byte announces compression there is no uncompressed
/// branch left, so an inflate failure is terminal. The signature check is
/// defense in depth: a tag can verify under a wrong framing assumption, but
/// the result still has to be a database.
pub fn finalize(raw: Vec<u8>) -> Result<Vec<u8>, FormatError> {
    let plaintext = if raw.first() == Some(&ZLIB_MARKER) {
        debug!(compressed_len = raw.len(), "inflating zlib-wrapped payload");
        let mut decoder = ZlibDecoder::new(Vec::new());
        decoder.write_all(&raw).map_err(FormatError::Decompression)?;
        decoder.finish().map_err(FormatError::Decompression)?
    } else {
        raw
    };

    if !plaintext.starts_with(SQLITE_SIGNATURE) {
        return Err(FormatError::SignatureMismatch);
    }
    Ok(plaintext)
}
