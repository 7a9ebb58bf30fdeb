// Error types shared by the reader, writer and dialect validation

use std::io;
use thiserror::Error;

/// Errors reported by the engine.
///
/// Position-carrying variants keep the absolute byte offset into the
/// source and the 1-based row index so host bindings can surface them
/// unchanged.
#[derive(Error, Debug)]
pub enum CsvError {
    /// Invalid dialect options, raised before any I/O happens
    #[error("invalid dialect: {0}")]
    Config(String),

    /// Unterminated quoted field, or a byte that may not follow a closing quote
    #[error("malformed quote at byte {byte_offset} (row {row_index})")]
    MalformedQuote { byte_offset: u64, row_index: u64 },

    /// Row field count differs from the first row's with `strict_field_count` set
    #[error("row {row_index} has {found} fields, expected {expected} (byte {byte_offset})")]
    InconsistentFieldCount {
        expected: usize,
        found: usize,
        row_index: u64,
        byte_offset: u64,
    },

    /// Byte source failure, propagated from `fill`
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Byte sink failure; output drained before the failure is not retracted
    #[error("write failed after {rows_written} rows: {source}")]
    Write {
        rows_written: u64,
        #[source]
        source: io::Error,
    },
}

/// Copyable discriminant of [`CsvError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    MalformedQuote,
    InconsistentFieldCount,
    Io,
    Write,
}

impl CsvError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        CsvError::Config(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CsvError::Config(_) => ErrorKind::Config,
            CsvError::MalformedQuote { .. } => ErrorKind::MalformedQuote,
            CsvError::InconsistentFieldCount { .. } => ErrorKind::InconsistentFieldCount,
            CsvError::Io(_) => ErrorKind::Io,
            CsvError::Write { .. } => ErrorKind::Write,
        }
    }

    /// Byte offset for parse errors
    pub fn byte_offset(&self) -> Option<u64> {
        match self {
            CsvError::MalformedQuote { byte_offset, .. }
            | CsvError::InconsistentFieldCount { byte_offset, .. } => Some(*byte_offset),
            _ => None,
        }
    }

    /// Row index for parse errors
    pub fn row_index(&self) -> Option<u64> {
        match self {
            CsvError::MalformedQuote { row_index, .. }
            | CsvError::InconsistentFieldCount { row_index, .. } => Some(*row_index),
            _ => None,
        }
    }

    /// Shift the position of a parse error found in a sub-range of the input.
    pub(crate) fn rebase(self, offset_base: u64, row_base: u64) -> Self {
        match self {
            CsvError::MalformedQuote {
                byte_offset,
                row_index,
            } => CsvError::MalformedQuote {
                byte_offset: byte_offset + offset_base,
                row_index: row_index + row_base,
            },
            CsvError::InconsistentFieldCount {
                expected,
                found,
                row_index,
                byte_offset,
            } => CsvError::InconsistentFieldCount {
                expected,
                found,
                row_index: row_index + row_base,
                byte_offset: byte_offset + offset_base,
            },
            other => other,
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, CsvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CsvError::MalformedQuote {
            byte_offset: 2,
            row_index: 1,
        };
        assert_eq!(err.to_string(), "malformed quote at byte 2 (row 1)");

        let err = CsvError::config("delimiter must not be NUL");
        assert_eq!(err.to_string(), "invalid dialect: delimiter must not be NUL");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "source closed");
        let err: CsvError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("IO error"));
        assert_eq!(err.byte_offset(), None);
    }

    #[test]
    fn test_rebase_moves_positions() {
        let err = CsvError::InconsistentFieldCount {
            expected: 2,
            found: 3,
            row_index: 1,
            byte_offset: 4,
        }
        .rebase(100, 10);
        assert_eq!(err.row_index(), Some(11));
        assert_eq!(err.byte_offset(), Some(104));

        let err = CsvError::config("x").rebase(100, 10);
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
