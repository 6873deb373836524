//! Reversible mapping between raw binary column values and the
//! transport-safe hexadecimal text used in the interchange document.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedEncoding {
    #[error("hex string has odd length {0}")]
    OddLength(usize),
    #[error("invalid hex digit {found:?} at position {position}")]
    InvalidDigit { found: char, position: usize },
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Encodes bytes as lowercase hex, two characters per byte, no separators.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Exact inverse of [`encode`]. Accepts upper- or lowercase digits; fails
/// on odd length or any non-hex character.
pub fn decode(text: &str) -> Result<Vec<u8>, MalformedEncoding> {
    if text.len() % 2 != 0 {
        return Err(MalformedEncoding::OddLength(text.len()));
    }

    let mut out = Vec::with_capacity(text.len() / 2);
    let mut chars = text.char_indices();
    while let Some((pos, hi)) = chars.next() {
        let (lo_pos, lo) = chars.next().ok_or(MalformedEncoding::OddLength(text.len()))?;
        let hi = hi.to_digit(16).ok_or(MalformedEncoding::InvalidDigit {
            found: hi,
            position: pos,
        })?;
        let lo = lo.to_digit(16).ok_or(MalformedEncoding::InvalidDigit {
            found: lo,
            position: lo_pos,
        })?;
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}
