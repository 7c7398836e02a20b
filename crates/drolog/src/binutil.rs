//! Utilities used by the codec: error type and byte readers/writers.
use std::fmt;

/// Error type returned by the parsing and editing APIs of this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroError {
    /// The 8-byte file magic did not match `"DBRAWOPL"`.
    ///
    /// The contained array is the raw 8 bytes that were read.
    InvalidHeader([u8; 8]),

    /// The file declares a `(major, minor)` version pair the codec does
    /// not understand. Supported pairs are `(0,1)`, `(1,0)` and `(2,0)`.
    UnsupportedVersion { major: u16, minor: u16 },

    /// A v2 header field selects a feature the codec does not implement
    /// (non-zero `format` or `compression`).
    ///
    /// - `field` names the offending header field.
    /// - `value` is the raw byte that was read.
    UnsupportedFeature { field: &'static str, value: u8 },

    /// The file structure is inconsistent with its own header: truncated
    /// or leftover body bytes, an oversized codemap, an out-of-range
    /// hardware type, or an instruction overrunning the declared body.
    ///
    /// The contained `String` is a human-readable description.
    CorruptFile(String),

    /// A logical instruction index was outside the stream.
    ///
    /// - `index` is the index that was requested.
    /// - `len` is the stream length in instructions.
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for DroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DroError::InvalidHeader(magic) => {
                write!(f, "not a DRO file (invalid magic: {:?})", magic)
            }
            DroError::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported DRO version: ({}, {})", major, minor)
            }
            DroError::UnsupportedFeature { field, value } => {
                write!(f, "unsupported DRO v2 {}: {}", field, value)
            }
            DroError::CorruptFile(msg) => write!(f, "corrupt DRO file: {}", msg),
            DroError::IndexOutOfRange { index, len } => {
                write!(f, "instruction index {} out of range (length {})", index, len)
            }
        }
    }
}

impl std::error::Error for DroError {}

fn truncated(what: &str, off: usize, needed: usize, available: usize) -> DroError {
    DroError::CorruptFile(format!(
        "truncated while reading {} at offset 0x{:X} (needed {} bytes, available {})",
        what, off, needed, available
    ))
}

/// Read a 32-bit little-endian unsigned integer from `bytes` at `off`.
///
/// Returns `Err(DroError::CorruptFile)` when the buffer is too short.
pub fn read_u32_le_at(bytes: &[u8], off: usize, what: &str) -> Result<u32, DroError> {
    if bytes.len() < off + 4 {
        return Err(truncated(what, off, 4, bytes.len()));
    }
    let mut tmp: [u8; 4] = [0; 4];
    tmp.copy_from_slice(&bytes[off..off + 4]);
    Ok(u32::from_le_bytes(tmp))
}

/// Read a 16-bit little-endian unsigned integer from `bytes` at `off`.
///
/// Returns `Err(DroError::CorruptFile)` when the buffer is too short.
pub fn read_u16_le_at(bytes: &[u8], off: usize, what: &str) -> Result<u16, DroError> {
    if bytes.len() < off + 2 {
        return Err(truncated(what, off, 2, bytes.len()));
    }
    let mut tmp: [u8; 2] = [0; 2];
    tmp.copy_from_slice(&bytes[off..off + 2]);
    Ok(u16::from_le_bytes(tmp))
}

/// Read a single byte from `bytes` at `off`.
pub fn read_u8_at(bytes: &[u8], off: usize, what: &str) -> Result<u8, DroError> {
    if bytes.len() <= off {
        return Err(truncated(what, off, 1, bytes.len()));
    }
    Ok(bytes[off])
}

/// Return a borrowed slice of length `len` starting at `off` from `bytes`.
pub fn read_slice<'a>(
    bytes: &'a [u8],
    off: usize,
    len: usize,
    what: &str,
) -> Result<&'a [u8], DroError> {
    if bytes.len() < off + len {
        return Err(truncated(what, off, len, bytes.len().saturating_sub(off)));
    }
    Ok(&bytes[off..off + len])
}

/// Write a 32-bit little-endian unsigned integer `v` into `buf` at `off`.
///
/// Used to patch the v1 header totals in place. It does not perform
/// bounds checking; callers must ensure the destination range is valid.
pub fn write_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}
