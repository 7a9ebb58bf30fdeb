// Parallel whole-buffer reader using Rayon
//
// Strategy:
// 1. Single-threaded: walk the input with a structural copy of the parser
//    states (no field copying) and record row starts, at most one per
//    `min_piece` bytes
// 2. Parallel: parse each piece with its own streaming session
// 3. Sequential: rebase piece-local positions and apply the field-count
//    check across the whole input
//
// Workers only produce owned rows; host terms are built by the caller.

use crate::core::scanner::{quoted_run, unquoted_run};
use crate::core::{match_terminator, ByteClass, Dialect, Escaping};
use crate::error::{CsvError, Result};
use crate::reader::Reader;
use rayon::prelude::*;
use tracing::debug;

/// Smallest piece handed to a worker by [`read_all_parallel`].
pub const DEFAULT_MIN_PIECE: usize = 256 * 1024;

/// Rows of one piece, each with its piece-local start offset.
type Piece = Vec<(u64, Vec<Vec<u8>>)>;

/// Parse a complete in-memory input on the rayon pool.
///
/// Produces the same rows as a sequential [`Reader`]. The first error in
/// input order is returned, with positions relative to the whole input.
pub fn read_all_parallel(input: &[u8], dialect: &Dialect) -> Result<Vec<Vec<Vec<u8>>>> {
    let threads = rayon::current_num_threads().max(1);
    let min_piece = (input.len() / (threads * 4)).max(DEFAULT_MIN_PIECE);
    read_all_parallel_with(input, dialect, min_piece)
}

/// [`read_all_parallel`] with an explicit minimum piece size in bytes.
pub fn read_all_parallel_with(
    input: &[u8],
    dialect: &Dialect,
    min_piece: usize,
) -> Result<Vec<Vec<Vec<u8>>>> {
    let starts = piece_starts(input, dialect, min_piece.max(1));
    let ranges: Vec<(usize, usize)> = starts
        .iter()
        .zip(starts.iter().skip(1).copied().chain(std::iter::once(input.len())))
        .map(|(&start, end)| (start, end))
        .collect();
    debug!(bytes = input.len(), pieces = ranges.len(), "parallel read");

    let local = dialect.without_strict_field_count();
    let pieces: Vec<(Piece, Option<CsvError>)> = ranges
        .par_iter()
        .map(|&(start, end)| parse_piece(&input[start..end], &local))
        .collect();

    let strict = dialect.strict_field_count();
    let mut rows = Vec::new();
    let mut offsets = Vec::new();
    for ((piece, error), &(start, _)) in pieces.into_iter().zip(&ranges) {
        let base = rows.len() as u64;
        for (offset, row) in piece {
            offsets.push(offset + start as u64);
            rows.push(row);
        }
        if let Some(e) = error {
            // A field-count mismatch in an earlier row comes first
            if strict {
                check_field_counts(&rows, &offsets)?;
            }
            return Err(e.rebase(start as u64, base));
        }
    }

    if strict {
        check_field_counts(&rows, &offsets)?;
    }
    Ok(rows)
}

/// Rows parsed from one piece, plus the error that stopped it. Rows read
/// before the error are kept for the field-count check.
fn parse_piece(piece: &[u8], dialect: &Dialect) -> (Piece, Option<CsvError>) {
    let mut reader = Reader::from_slice(piece, dialect.clone());
    let mut rows = Vec::new();
    loop {
        match reader.next_row() {
            Ok(Some(row)) => {
                let row = row.to_vec();
                rows.push((reader.row_offset(), row));
            }
            Ok(None) => return (rows, None),
            Err(e) => return (rows, Some(e)),
        }
    }
}

fn check_field_counts(rows: &[Vec<Vec<u8>>], offsets: &[u64]) -> Result<()> {
    let Some(expected) = rows.first().map(Vec::len) else {
        return Ok(());
    };
    match rows.iter().position(|row| row.len() != expected) {
        Some(i) => Err(CsvError::InconsistentFieldCount {
            expected,
            found: rows[i].len(),
            row_index: i as u64 + 1,
            byte_offset: offsets[i],
        }),
        None => Ok(()),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    RowStart,
    FieldStart,
    Unquoted,
    Quoted,
    QuoteSeen,
    Comment,
}

/// Offsets where pieces begin: always 0, then row starts at least
/// `min_piece` bytes apart. Stops early at a malformed quote; the piece
/// holding it reports the error.
fn piece_starts(input: &[u8], dialect: &Dialect, min_piece: usize) -> Vec<usize> {
    let mut starts = vec![0];
    let policy = dialect.line_terminator();
    let escape = dialect.escape();
    let mut state = Scan::RowStart;
    let mut pos = 0;

    while pos < input.len() {
        match state {
            Scan::Unquoted => pos += unquoted_run(&input[pos..], dialect.delimiter(), escape),
            Scan::Quoted => pos += quoted_run(&input[pos..], dialect.quote(), escape),
            _ => {}
        }
        if pos >= input.len() {
            break;
        }

        let byte = input[pos];
        let class = dialect.class_of(byte);

        if state == Scan::Quoted {
            match class {
                ByteClass::Quote => state = Scan::QuoteSeen,
                // The escaped byte is skipped with the escape
                ByteClass::Escape => pos += 1,
                _ => {}
            }
            pos += 1;
            continue;
        }

        let term = match_terminator(input, pos, policy);
        if term > 0 {
            pos += term;
            state = Scan::RowStart;
            if pos < input.len() && pos - starts[starts.len() - 1] >= min_piece {
                starts.push(pos);
            }
            continue;
        }
        if state == Scan::Comment {
            pos += 1;
            continue;
        }

        state = match (state, class) {
            (Scan::RowStart, ByteClass::Comment) => Scan::Comment,
            (_, ByteClass::Escape) => {
                pos += 1;
                Scan::Unquoted
            }
            (Scan::RowStart | Scan::FieldStart, ByteClass::Quote) => Scan::Quoted,
            (Scan::RowStart | Scan::FieldStart, ByteClass::Space) => Scan::FieldStart,
            (_, ByteClass::Delimiter) => Scan::FieldStart,
            (Scan::QuoteSeen, ByteClass::Quote) => match dialect.escaping() {
                Escaping::Doubled => Scan::Quoted,
                Escaping::Byte(_) => Scan::Unquoted,
            },
            (Scan::QuoteSeen, _) if dialect.escaping() == Escaping::Doubled => break,
            _ => Scan::Unquoted,
        };
        pos += 1;
    }
    starts
}
