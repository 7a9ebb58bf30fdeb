// Field encoding: quoting decisions and escaping
//
// The writer stages each row into its Buffer through these helpers.
// Scanning ("does this field need quoting?") uses memchr; quoting wraps
// the field in quote bytes and escapes embedded quote bytes the way the
// dialect says.

use crate::core::{Buffer, Dialect, Escaping};
use memchr::{memchr, memchr2, memchr3};

// ==========================================================================
// Quoting: wrap field in quote bytes, escape embedded quotes
// ==========================================================================

/// Write `field` wrapped in quote bytes.
///
/// Doubled dialects double embedded quote bytes; escape-byte dialects
/// prefix embedded quote and escape bytes with the escape byte.
#[inline]
pub fn write_quoted_field(out: &mut Buffer, field: &[u8], quote: u8, escaping: Escaping) {
    out.push(quote);
    let mut rest = field;
    match escaping {
        Escaping::Doubled => {
            while let Some(i) = memchr(quote, rest) {
                out.extend(&rest[..=i]);
                out.push(quote);
                rest = &rest[i + 1..];
            }
        }
        Escaping::Byte(esc) => {
            while let Some(i) = memchr2(quote, esc, rest) {
                out.extend(&rest[..i]);
                out.push(esc);
                out.push(rest[i]);
                rest = &rest[i + 1..];
            }
        }
    }
    out.extend(rest);
    out.push(quote);
}

// ==========================================================================
// Scanning
// ==========================================================================

/// Whether the field content holds a byte that only survives quoted:
/// the delimiter, quote byte, escape byte, CR or LF.
#[inline]
pub fn field_needs_quoting(field: &[u8], dialect: &Dialect) -> bool {
    if memchr3(dialect.delimiter(), dialect.quote(), b'\n', field).is_some() {
        return true;
    }
    match dialect.escape() {
        Some(esc) => memchr2(b'\r', esc, field).is_some(),
        None => memchr(b'\r', field).is_some(),
    }
}

/// Full quoting decision for one field. `first` marks the first field of
/// its row. A lone empty field is handled by the writer at row end.
#[inline]
pub fn must_quote(field: &[u8], first: bool, dialect: &Dialect) -> bool {
    let Some(&lead) = field.first() else {
        return dialect.quote_empty_fields();
    };
    field_needs_quoting(field, dialect)
        || (dialect.skip_initial_space() && lead == b' ')
        || (first && dialect.comment() == Some(lead))
}

/// Encode one field (no delimiter). Returns true when it was quoted.
#[inline]
pub fn encode_field(out: &mut Buffer, field: &[u8], first: bool, dialect: &Dialect) -> bool {
    if must_quote(field, first, dialect) {
        write_quoted_field(out, field, dialect.quote(), dialect.escaping());
        true
    } else {
        out.extend(field);
        false
    }
}

// ==========================================================================
// Tests
// ==========================================================================
