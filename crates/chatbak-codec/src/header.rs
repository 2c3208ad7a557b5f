//! Backup container header parsing
//!
//! The header is a one-byte size prefix, an optional feature-flag byte, and
//! an embedded record of tag/length/value fields (a narrow, fixed subset of
//! protobuf wire framing, deliberately parsed with a small explicit walk
//! rather than a general protobuf library):
//!
//! ```text
//! offset  size   field
//!  0       1     embedded record size (0-255)
//!  1       0/1   feature-flag byte, present iff equal to 0x01
//!  ..      N     embedded record:
//!                  0a 10 <16 bytes>   the IV (field 1)
//!                  12 10 <16 bytes>   the server salt (field 2, salted
//!                                     variants only), either at top level
//!                                     or one nesting level deep
//! ```
//!
//! `header_size` (the offset of the first ciphertext byte) is the flag
//! offset plus the record size, even when the record itself is damaged.

use tracing::debug;

use crate::error::HeaderError;
use crate::{IV_SIZE, TAG_SIZE};

/// Marker for a 16-byte field-1 value: the backup IV.
const IV_MARKER: [u8; 2] = [0x0a, 0x10];

/// Marker for a 16-byte field-2 value: the server salt in salted variants.
const SALT_MARKER: [u8; 2] = [0x12, 0x10];

/// Window scanned over the whole buffer when the embedded record yields no
/// IV (seen in containers that misreport the record size).
const FALLBACK_SCAN: usize = 200;

/// Parsed header fields of a backup container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupHeader {
    /// Offset of the first ciphertext byte.
    pub header_size: usize,
    /// The 16-byte IV; the cipher consumes only its first 12 bytes.
    pub iv: [u8; IV_SIZE],
    /// The 16-byte server salt carried by older, salted container variants.
    pub salt: Option<[u8; IV_SIZE]>,
    /// Whether the feature-flag byte followed the size byte.
    pub feature_flag: bool,
}

/// Parse the container header and locate the IV (and salt, when present).
///
/// Fails with [`HeaderError::Truncated`] when the buffer cannot hold the
/// declared header plus a minimum 16-byte trailer, and with
/// [`HeaderError::NoIvFound`] when no IV marker exists in the record or the
/// fallback window. A record size of zero is not special-cased: the IV
/// search simply runs over whatever bytes are available and usually fails.
pub fn parse_header(buf: &[u8]) -> Result<BackupHeader, HeaderError> {
    let record_size = match buf.first() {
        Some(&size) => size as usize,
        None => return Err(HeaderError::Truncated { len: 0, header_size: 1 }),
    };

    let mut offset = 1;
    let feature_flag = buf.get(offset) == Some(&0x01);
    if feature_flag {
        offset += 1;
    }
    let header_size = offset + record_size;

    if buf.len() < header_size + TAG_SIZE {
        return Err(HeaderError::Truncated { len: buf.len(), header_size });
    }

    let record = &buf[offset..header_size];

    let salt = scan_record(record, SALT_MARKER);
    let iv = scan_record(record, IV_MARKER)
        .or_else(|| scan_flat(&buf[..buf.len().min(FALLBACK_SCAN)], IV_MARKER))
        .ok_or(HeaderError::NoIvFound)?;

    debug!(header_size, feature_flag, has_salt = salt.is_some(), "parsed backup header");

    Ok(BackupHeader { header_size, iv, salt, feature_flag })
}

/// Walk the record's tag/length/value fields looking for `marker` (a tag
/// byte plus the `0x10` length byte announcing a 16-byte value).
/// Length-delimited fields are also searched one nesting level deep; the
/// first match scanning forward wins.
fn scan_record(record: &[u8], marker: [u8; 2]) -> Option<[u8; IV_SIZE]> {
    walk(record, marker, 1)
}

fn walk(buf: &[u8], marker: [u8; 2], depth: u8) -> Option<[u8; IV_SIZE]> {
    let mut pos = 0;
    while pos + 2 <= buf.len() {
        let tag = buf[pos];
        let len = buf[pos + 1] as usize;

        if [tag, buf[pos + 1]] == marker && pos + 2 + IV_SIZE <= buf.len() {
            return Some(take16(&buf[pos + 2..]));
        }

        // length-delimited field (wire type 2): search it one level deep,
        // then step over it; anything else advances a byte to resynchronize
        if tag & 0x07 == 2 && pos + 2 + len <= buf.len() {
            if depth > 0 {
                if let Some(found) = walk(&buf[pos + 2..pos + 2 + len], marker, depth - 1) {
                    return Some(found);
                }
            }
            pos += 2 + len;
        } else {
            pos += 1;
        }
    }
    None
}

/// Plain forward byte scan for `marker` over a window, no field structure
/// assumed. Used as the last-resort IV search.
fn scan_flat(window: &[u8], marker: [u8; 2]) -> Option<[u8; IV_SIZE]> {
    window
        .windows(2)
        .enumerate()
        .find_map(|(i, pair)| {
            (pair == marker.as_slice() && i + 2 + IV_SIZE <= window.len())
                .then(|| take16(&window[i + 2..]))
        })
}

fn take16(buf: &[u8]) -> [u8; IV_SIZE] {
    let mut out = [0u8; IV_SIZE];
    out.copy_from_slice(&buf[..IV_SIZE]);
    out
}
