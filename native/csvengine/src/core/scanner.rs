// Run scanning for the parser hot loop.
//
// Inside a field most bytes are plain data. These helpers find the length
// of the leading run that needs no per-byte state transition, so the
// parser can copy it in one go. memchr does the SIMD work.

use memchr::{memchr, memchr2, memchr3};

/// Length of the leading run of `bytes` that is plain data inside an
/// unquoted field: stops at the delimiter, CR, LF or the escape byte.
#[inline]
pub fn unquoted_run(bytes: &[u8], delimiter: u8, escape: Option<u8>) -> usize {
    match escape {
        None => memchr3(delimiter, b'\n', b'\r', bytes).unwrap_or(bytes.len()),
        Some(esc) => bytes
            .iter()
            .position(|&b| b == delimiter || b == esc || b == b'\n' || b == b'\r')
            .unwrap_or(bytes.len()),
    }
}

/// Length of the leading run of `bytes` that is plain data inside a
/// quoted field: stops at the quote or the escape byte.
#[inline]
pub fn quoted_run(bytes: &[u8], quote: u8, escape: Option<u8>) -> usize {
    let hit = match escape {
        None => memchr(quote, bytes),
        Some(esc) => memchr2(quote, esc, bytes),
    };
    hit.unwrap_or(bytes.len())
}

/// Length of the leading run of a comment line: stops at CR or LF.
#[inline]
pub fn line_run(bytes: &[u8]) -> usize {
    memchr2(b'\n', b'\r', bytes).unwrap_or(bytes.len())
}
