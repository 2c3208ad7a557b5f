use thiserror::Error;

pub type DecodeResult<T> = Result<T, DecodeError>;

/// The error type returned by the decode facade.
///
/// Each variant wraps the error of one pipeline stage, so callers can match
/// on the category (was the key wrong, or the container corrupt?) or drill
/// into the precise reason. A decode failure is always a returned value,
/// never a panic, and never retried internally.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error("header error: {0}")]
    Header(#[from] HeaderError),

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

/// Malformed or missing arguments. A caller mistake, reported before any
/// parsing or cryptography runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// The root key string is not exactly 64 hex characters.
    #[error("root key must be exactly 64 hex characters")]
    InvalidKeyFormat,

    /// The buffer is too short to be any known container revision.
    #[error("backup buffer too small: {0} bytes (minimum 100)")]
    BufferTooSmall(usize),
}

/// Container framing could not be parsed: corrupt data or an unsupported
/// container revision.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// No `0a 10` IV marker inside the embedded record or the fallback
    /// scan window.
    #[error("no IV marker (0a 10) found in header")]
    NoIvFound,

    /// The declared header does not leave room for a 16-byte trailer.
    #[error("backup truncated: {len} bytes cannot hold a {header_size}-byte header plus a 16-byte trailer")]
    Truncated { len: usize, header_size: usize },
}

/// AEAD verification failed. Almost always a wrong root key, or an IV/trailer
/// assumption that does not match the container; the single most diagnostic
/// signal for "wrong key supplied upstream".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication tag mismatch (wrong key, or wrong IV/trailer assumption)")]
    TagMismatch,

    /// The ciphertext region cannot hold the trailer the layout demands.
    #[error("ciphertext region too short: {len} bytes cannot hold a {trailer}-byte trailer")]
    TruncatedTrailer { len: usize, trailer: usize },
}

/// Decryption verified, but the payload is not the expected database format.
/// Indicates wrong framing that coincidentally authenticated, or a genuinely
/// corrupted payload.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The payload announced a zlib wrapper (leading `0x78`) but did not
    /// inflate cleanly.
    #[error("zlib decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    /// The recovered plaintext does not begin with the SQLite signature.
    #[error("plaintext does not start with the SQLite signature")]
    SignatureMismatch,
}
