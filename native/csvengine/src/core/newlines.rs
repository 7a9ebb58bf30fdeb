// Line terminator policy and matching

use serde::{Deserialize, Serialize};

/// Line terminator policy.
///
/// `Lf` and `Crlf` recognise exactly one terminator on read. `Auto`
/// accepts both `\r\n` and `\n` (a bare `\r` stays data) and writes `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    Lf,
    Crlf,
    #[default]
    Auto,
}

impl LineTerminator {
    /// Bytes emitted after each row by the writer.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineTerminator::Crlf => b"\r\n",
            LineTerminator::Lf | LineTerminator::Auto => b"\n",
        }
    }

    /// Whether a bare `\n` ends a row.
    #[inline]
    pub fn accepts_lf(self) -> bool {
        !matches!(self, LineTerminator::Crlf)
    }

    /// Whether `\r` may start a `\r\n` terminator.
    #[inline]
    pub fn accepts_crlf(self) -> bool {
        !matches!(self, LineTerminator::Lf)
    }
}

/// Returns length of the terminator at `pos`, or 0 if none matches.
///
/// A `\r` at the very end of `input` does not match; callers that stream
/// must wait for the next byte before deciding.
#[inline]
pub fn match_terminator(input: &[u8], pos: usize, policy: LineTerminator) -> usize {
    match input[pos] {
        b'\n' if policy.accepts_lf() => 1,
        b'\r' if policy.accepts_crlf() && input.get(pos + 1) == Some(&b'\n') => 2,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_matches_both_terminators() {
        let t = LineTerminator::Auto;
        assert_eq!(match_terminator(b"abc\r\ndef", 3, t), 2);
        assert_eq!(match_terminator(b"abc\ndef", 3, t), 1);
        // Bare \r is data
        assert_eq!(match_terminator(b"abc\rdef", 3, t), 0);
        assert_eq!(t.as_bytes(), b"\n");
    }

    #[test]
    fn test_fixed_policies() {
        assert_eq!(match_terminator(b"a\nb", 1, LineTerminator::Crlf), 0);
        assert_eq!(match_terminator(b"a\r\nb", 1, LineTerminator::Crlf), 2);
        assert_eq!(match_terminator(b"a\r\nb", 1, LineTerminator::Lf), 0);
        assert_eq!(match_terminator(b"a\r\nb", 2, LineTerminator::Lf), 1);
        assert_eq!(LineTerminator::Crlf.as_bytes(), b"\r\n");
    }

    #[test]
    fn test_trailing_cr_does_not_match() {
        assert_eq!(match_terminator(b"ab\r", 2, LineTerminator::Auto), 0);
    }

    #[test]
    fn test_serde_names() {
        let t: LineTerminator = serde_json::from_str("\"crlf\"").unwrap();
        assert_eq!(t, LineTerminator::Crlf);
        assert_eq!(serde_json::to_string(&LineTerminator::Auto).unwrap(), "\"auto\"");
    }
}
