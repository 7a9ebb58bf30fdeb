// Cross-strategy conformance tests
//
// Each scenario runs through every read path: the slice reader, a reader
// over a one-byte-per-read source, the push parser fed in small chunks,
// and the parallel reader split at every row. Failures pinpoint which
// path diverges.

use csvengine::{
    read_all_parallel_with, Dialect, DialectOptions, ErrorKind, LineTerminator, Reader,
    RowStatus, StreamingParser,
};
use std::io::{self, Read};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Position-carrying error summary
type Failure = (ErrorKind, Option<u64>, Option<u64>);

/// Rows read until end of input or the first error
type Outcome = (Vec<Vec<String>>, Option<Failure>);

fn to_string(field: &[u8]) -> String {
    String::from_utf8_lossy(field).to_string()
}

fn owned_to_strings(rows: Vec<Vec<Vec<u8>>>) -> Vec<Vec<String>> {
    rows.into_iter()
        .map(|row| row.iter().map(|f| to_string(f)).collect())
        .collect()
}

fn failure(e: &csvengine::CsvError) -> Failure {
    (e.kind(), e.byte_offset(), e.row_index())
}

/// Source that yields a single byte per read
struct OneByte<'a>(&'a [u8]);

impl Read for OneByte<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.split_first() {
            Some((&b, rest)) if !buf.is_empty() => {
                buf[0] = b;
                self.0 = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

fn reader_outcome<S: csvengine::ByteSource>(mut reader: Reader<S>) -> Outcome {
    let mut rows = Vec::new();
    loop {
        match reader.next_row() {
            Ok(Some(row)) => rows.push(row.iter().map(|f| to_string(f.as_bytes())).collect()),
            Ok(None) => return (rows, None),
            Err(e) => return (rows, Some(failure(&e))),
        }
    }
}

fn push_outcome(input: &[u8], dialect: &Dialect, chunk: usize) -> Outcome {
    let mut parser = StreamingParser::new(dialect.clone());
    let mut rows = Vec::new();
    let mut chunks = input.chunks(chunk);
    loop {
        match parser.poll_row() {
            Ok(RowStatus::Ready) => rows.push(parser.row().iter().map(|f| to_string(f.as_bytes())).collect()),
            Ok(RowStatus::NeedInput) => match chunks.next() {
                Some(c) => parser.feed(c),
                None => parser.finish(),
            },
            Ok(RowStatus::End) => return (rows, None),
            Err(e) => return (rows, Some(failure(&e))),
        }
    }
}

fn check(input: &[u8], options: DialectOptions, expected: Vec<Vec<&str>>, error: Option<Failure>) {
    let dialect = options.build().unwrap();
    let expected: Vec<Vec<String>> = expected
        .iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect();
    let want = (expected.clone(), error);

    // Slice reader
    let slice = reader_outcome(Reader::from_slice(input, dialect.clone()));
    assert_eq!(slice, want, "FAILED: slice reader");

    // One byte per source read, smallest buffer
    let trickle = reader_outcome(Reader::with_capacity(OneByte(input), dialect.clone(), 1));
    assert_eq!(trickle, want, "FAILED: one-byte reader");

    // Push parser, several chunk sizes
    for chunk in [1, 2, 3, 7, 64] {
        let push = push_outcome(input, &dialect, chunk);
        assert_eq!(push, want, "FAILED: push parser, chunk {}", chunk);
    }

    // Parallel, one piece per row
    match read_all_parallel_with(input, &dialect, 1) {
        Ok(rows) => {
            assert_eq!(error, None, "FAILED: parallel missed an error");
            assert_eq!(owned_to_strings(rows), expected, "FAILED: parallel");
        }
        Err(e) => assert_eq!(Some(failure(&e)), error, "FAILED: parallel error"),
    }
}

// ---------------------------------------------------------------------------
// Conformance macro
// ---------------------------------------------------------------------------

/// Runs a scenario through all read paths and asserts they all produce
/// `expected`, then the optional error `(kind, byte_offset, row_index)`.
macro_rules! conformance {
    ($name:ident, input: $input:expr, dialect: $dialect:expr, expected: $expected:expr) => {
        #[test]
        fn $name() {
            check($input, $dialect, $expected, None);
        }
    };
    ($name:ident, input: $input:expr, dialect: $dialect:expr, expected: $expected:expr,
     error: ($kind:expr, $offset:expr, $row:expr)) => {
        #[test]
        fn $name() {
            check($input, $dialect, $expected, Some(($kind, Some($offset), Some($row))));
        }
    };
}

fn default() -> DialectOptions {
    DialectOptions::new()
}

// ---------------------------------------------------------------------------
// Scenario: basic shapes
// ---------------------------------------------------------------------------

conformance!(
    simple_two_rows,
    input: b"a,b,c\n1,2,3\n",
    dialect: default(),
    expected: vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]
);

conformance!(
    no_trailing_newline,
    input: b"a,b\nc,d",
    dialect: default(),
    expected: vec![vec!["a", "b"], vec!["c", "d"]]
);

conformance!(
    empty_input,
    input: b"",
    dialect: default(),
    expected: vec![]
);

conformance!(
    trailing_empty_field,
    input: b"a,b,\n",
    dialect: default(),
    expected: vec![vec!["a", "b", ""]]
);

conformance!(
    empty_lines_kept,
    input: b"a\n\nb\n",
    dialect: default(),
    expected: vec![vec!["a"], vec![""], vec!["b"]]
);

conformance!(
    empty_lines_skipped,
    input: b"\na\n\r\n\nb\n\n",
    dialect: default().with_skip_blank_lines(true),
    expected: vec![vec!["a"], vec!["b"]]
);

// ---------------------------------------------------------------------------
// Scenario: quoting
// ---------------------------------------------------------------------------

conformance!(
    quoted_field_with_comma,
    input: b"a,\"b,c\",d\n",
    dialect: default(),
    expected: vec![vec!["a", "b,c", "d"]]
);

conformance!(
    escaped_doubled_quotes,
    input: b"\"a\"\"b\",c\n",
    dialect: default(),
    expected: vec![vec!["a\"b", "c"]]
);

conformance!(
    multiline_quoted_field,
    input: b"a,\"line1\r\nline2\",c\n",
    dialect: default(),
    expected: vec![vec!["a", "line1\r\nline2", "c"]]
);

conformance!(
    quote_inside_unquoted_field_is_data,
    input: b"ab\"c,d\n",
    dialect: default(),
    expected: vec![vec!["ab\"c", "d"]]
);

conformance!(
    quoted_empty_fields,
    input: b"\"\",\"\"\n\"\"\n",
    dialect: default(),
    expected: vec![vec!["", ""], vec![""]]
);

conformance!(
    unterminated_quote,
    input: b"a,\"unterminated",
    dialect: default(),
    expected: vec![],
    error: (ErrorKind::MalformedQuote, 2, 1)
);

conformance!(
    garbage_after_closing_quote,
    input: b"x\n\"ab\"c,d\ny\n",
    dialect: default(),
    expected: vec![vec!["x"]],
    error: (ErrorKind::MalformedQuote, 6, 2)
);

// ---------------------------------------------------------------------------
// Scenario: line terminators
// ---------------------------------------------------------------------------

conformance!(
    crlf_line_endings,
    input: b"a,b\r\nc,d\n",
    dialect: default(),
    expected: vec![vec!["a", "b"], vec!["c", "d"]]
);

conformance!(
    bare_cr_is_data,
    input: b"a\rb,c\r",
    dialect: default(),
    expected: vec![vec!["a\rb", "c\r"]]
);

conformance!(
    lf_only_policy,
    input: b"a\r\nb\n",
    dialect: default().with_line_terminator(LineTerminator::Lf),
    expected: vec![vec!["a\r"], vec!["b"]]
);

conformance!(
    crlf_only_policy,
    input: b"a\nb\r\nc\r\n",
    dialect: default().with_line_terminator(LineTerminator::Crlf),
    expected: vec![vec!["a\nb"], vec!["c"]]
);

// ---------------------------------------------------------------------------
// Scenario: dialect features
// ---------------------------------------------------------------------------

conformance!(
    semicolon_delimiter,
    input: b"a;b,c;\"d;e\"\n",
    dialect: default().with_delimiter(b';'),
    expected: vec![vec!["a", "b,c", "d;e"]]
);

conformance!(
    tab_delimiter_single_quote,
    input: b"'a\tb'\t'it''s'\n",
    dialect: default().with_delimiter(b'\t').with_quote_char(b'\''),
    expected: vec![vec!["a\tb", "it's"]]
);

conformance!(
    escape_byte_dialect,
    input: b"\"a\\\"b\",c\\,d\n\"x\"y,z\n",
    dialect: default().with_escape_char(b'\\'),
    expected: vec![vec!["a\"b", "c,d"], vec!["xy", "z"]]
);

conformance!(
    escaped_terminator,
    input: b"a\\\nb,c\n",
    dialect: default().with_escape_char(b'\\'),
    expected: vec![vec!["a\nb", "c"]]
);

conformance!(
    comment_lines,
    input: b"#header \"x\n a,#b\n#\n\"#c\",d\n",
    dialect: default().with_comment_char(b'#'),
    expected: vec![vec![" a", "#b"], vec!["#c", "d"]]
);

conformance!(
    skip_initial_space,
    input: b"a,  b,  \"c,d\"\n",
    dialect: default().with_skip_initial_space(true),
    expected: vec![vec!["a", "b", "c,d"]]
);

// ---------------------------------------------------------------------------
// Scenario: field counts
// ---------------------------------------------------------------------------

conformance!(
    ragged_rows_allowed,
    input: b"a,b\nc\nd,e,f\n",
    dialect: default(),
    expected: vec![vec!["a", "b"], vec!["c"], vec!["d", "e", "f"]]
);

conformance!(
    strict_field_count_mismatch,
    input: b"a,b\nc,d,e\n",
    dialect: default().with_strict_field_count(true),
    expected: vec![vec!["a", "b"]],
    error: (ErrorKind::InconsistentFieldCount, 4, 2)
);

conformance!(
    strict_mismatch_before_malformed_quote,
    input: b"a,b\nc\n\"d\"x\n",
    dialect: default().with_strict_field_count(true),
    expected: vec![vec!["a", "b"]],
    error: (ErrorKind::InconsistentFieldCount, 4, 2)
);

// ---------------------------------------------------------------------------
// Reader-only behavior
// ---------------------------------------------------------------------------

#[test]
fn strict_reader_continues_after_mismatch() {
    let opts = default().with_strict_field_count(true);
    let mut reader = Reader::open_with(&b"a,b\nc\nd,e\n"[..], opts).unwrap();
    assert!(reader.next_row().unwrap().is_some());
    assert_eq!(
        reader.next_row().unwrap_err().kind(),
        ErrorKind::InconsistentFieldCount
    );
    let row = reader.next_row().unwrap().unwrap();
    assert_eq!(row.index(), 3);
    assert!(row.is_valid());
    assert!(reader.next_row().unwrap().is_none());
}

#[test]
fn malformed_quote_ends_session() {
    let mut reader = Reader::from_slice(b"\"a\"b\nc\n", Dialect::default());
    assert!(reader.next_row().is_err());
    assert!(reader.next_row().unwrap().is_none());
    assert!(reader.next_row().unwrap().is_none());
}
