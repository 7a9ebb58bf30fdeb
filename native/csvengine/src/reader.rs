// Reader session: a streaming parser bound to a byte source
//
// Pull-based. Each `next_row` parses out of the buffered bytes and only
// asks the source for another chunk when the parser runs dry, so memory
// stays bounded by the longest row plus the buffer capacity.

use crate::core::buffer::{DEFAULT_CAPACITY, DEFAULT_CHUNK};
use crate::core::{ByteSource, Dialect, DialectOptions, LineTerminator, Row};
use crate::error::Result;
use crate::strategy::streaming::{ParserState, RowStatus, StreamingParser};
use tracing::debug;

pub struct Reader<S: ByteSource> {
    source: S,
    parser: StreamingParser,
    chunk: usize,
}

impl<S: ByteSource> Reader<S> {
    pub fn open(source: S, dialect: Dialect) -> Self {
        Self::with_capacity(source, dialect, DEFAULT_CAPACITY)
    }

    /// Validate `options` and open a session.
    pub fn open_with(source: S, options: DialectOptions) -> Result<Self> {
        Ok(Self::open(source, options.build()?))
    }

    /// Open with an explicit buffer capacity. Chunks pulled from the
    /// source are at most a quarter of it.
    pub fn with_capacity(source: S, dialect: Dialect, capacity: usize) -> Self {
        let chunk = DEFAULT_CHUNK.min(capacity / 4).max(1);
        debug!(capacity, chunk, "opening reader");
        Reader {
            source,
            parser: StreamingParser::with_capacity(dialect, capacity),
            chunk,
        }
    }

    /// Next row, or `None` at end of input.
    ///
    /// The returned row borrows the session and is reused by the next
    /// call. Copy it out with [`Row::to_vec`] to keep it.
    pub fn next_row(&mut self) -> Result<Option<&Row>> {
        loop {
            match self.parser.poll_row()? {
                RowStatus::Ready => break,
                RowStatus::End => return Ok(None),
                RowStatus::NeedInput => {
                    if self.parser.fill(&mut self.source, self.chunk)? == 0 {
                        self.parser.finish();
                    }
                }
            }
        }
        Ok(Some(self.parser.row()))
    }

    /// The most recently materialized row, including one rejected by
    /// field-count validation.
    pub fn last_row(&self) -> &Row {
        self.parser.row()
    }

    /// Rows materialized so far (yielded or rejected)
    pub fn rows_read(&self) -> u64 {
        self.parser.rows_read()
    }

    /// Bytes of the source consumed by the parser
    pub fn byte_offset(&self) -> u64 {
        self.parser.byte_offset()
    }

    /// Byte offset at which the most recent row began
    pub fn row_offset(&self) -> u64 {
        self.parser.row_offset()
    }

    pub fn state(&self) -> ParserState {
        self.parser.state()
    }

    pub fn dialect(&self) -> &Dialect {
        self.parser.dialect()
    }

    pub fn detected_terminator(&self) -> Option<LineTerminator> {
        self.parser.detected_terminator()
    }

    /// Release the buffers and hand the source back.
    pub fn close(self) -> S {
        debug!(rows = self.parser.rows_read(), bytes = self.parser.byte_offset(), "closing reader");
        self.source
    }

    /// Owning iterator of copied rows.
    pub fn into_rows(self) -> Rows<S> {
        Rows {
            reader: self,
            failed: false,
        }
    }
}

impl<'a> Reader<&'a [u8]> {
    /// Read an in-memory string.
    pub fn from_slice(input: &'a [u8], dialect: Dialect) -> Self {
        Self::open(input, dialect)
    }
}

/// Iterator returned by [`Reader::into_rows`].
///
/// Yields `InconsistentFieldCount` as an item and keeps going; stops after
/// a source failure or a malformed quote.
pub struct Rows<S: ByteSource> {
    reader: Reader<S>,
    failed: bool,
}

impl<S: ByteSource> Rows<S> {
    pub fn reader(&self) -> &Reader<S> {
        &self.reader
    }

    pub fn into_reader(self) -> Reader<S> {
        self.reader
    }
}

impl<S: ByteSource> Iterator for Rows<S> {
    type Item = Result<Vec<Vec<u8>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_row() {
            Ok(Some(row)) => Some(Ok(row.to_vec())),
            Ok(None) => None,
            Err(e) => {
                self.failed = e.kind() == crate::error::ErrorKind::Io;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CsvError, ErrorKind};
    use std::io::{self, Read};

    /// Source that hands out at most `step` bytes per read
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct FailingSource;

    impl Read for FailingSource {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
        }
    }

    fn read_all<S: ByteSource>(reader: Reader<S>) -> Vec<Vec<Vec<u8>>> {
        reader.into_rows().collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_read_from_slice() {
        let mut reader = Reader::from_slice(b"a,b\n1,2\n", Dialect::default());
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.to_vec(), vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(row.index(), 1);
        assert!(reader.next_row().unwrap().is_some());
        assert!(reader.next_row().unwrap().is_none());
        assert!(reader.next_row().unwrap().is_none());
        assert_eq!(reader.rows_read(), 2);
    }

    #[test]
    fn test_empty_input() {
        let mut reader = Reader::from_slice(b"", Dialect::default());
        assert!(reader.next_row().unwrap().is_none());
        assert_eq!(reader.rows_read(), 0);
    }

    #[test]
    fn test_trickle_source_matches_slice() {
        let input = b"id,text\n1,\"multi\nline\"\n2,\"q\"\"x\"\r\n3,plain";
        let expected = read_all(Reader::from_slice(input, Dialect::default()));
        for step in 1..8 {
            let source = Trickle { data: input, step };
            assert_eq!(read_all(Reader::open(source, Dialect::default())), expected);
        }
        assert_eq!(expected.len(), 4);
    }

    #[test]
    fn test_small_buffer_grows_for_long_rows() {
        let long = vec![b'x'; 10_000];
        let mut input = long.clone();
        input.extend_from_slice(b",y\n");
        let mut reader = Reader::with_capacity(&input[..], Dialect::default(), 64);
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row[0].as_bytes(), &long[..]);
        assert_eq!(row[1].as_bytes(), b"y");
    }

    #[test]
    fn test_open_with_rejects_bad_options() {
        let opts = DialectOptions::new().with_delimiter(b'"');
        match Reader::open_with(&b""[..], opts) {
            Err(e) => assert_eq!(e.kind(), ErrorKind::Config),
            Ok(_) => panic!("expected config error"),
        }
    }

    #[test]
    fn test_source_error_surfaces_as_io() {
        let mut reader = Reader::open(FailingSource, Dialect::default());
        match reader.next_row() {
            Err(CsvError::Io(e)) => assert_eq!(e.to_string(), "disk gone"),
            other => panic!("unexpected {:?}", other.map(|r| r.map(Row::to_vec))),
        }

        let mut rows = Reader::open(FailingSource, Dialect::default()).into_rows();
        assert!(rows.next().unwrap().is_err());
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_strict_rows_iterator_continues() {
        let opts = DialectOptions::new().with_strict_field_count(true);
        let reader = Reader::open_with(&b"a,b\nc\nd,e\n"[..], opts).unwrap();
        let items: Vec<_> = reader.into_rows().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert_eq!(
            items[1].as_ref().unwrap_err().kind(),
            ErrorKind::InconsistentFieldCount
        );
        assert_eq!(items[2].as_ref().unwrap(), &vec![b"d".to_vec(), b"e".to_vec()]);
    }

    #[test]
    fn test_last_row_after_rejection() {
        let opts = DialectOptions::new().with_strict_field_count(true);
        let mut reader = Reader::open_with(&b"a,b\nc\n"[..], opts).unwrap();
        reader.next_row().unwrap();
        assert!(reader.next_row().is_err());
        assert!(!reader.last_row().is_valid());
        assert_eq!(reader.last_row().to_vec(), vec![b"c".to_vec()]);
        assert_eq!(reader.row_offset(), 4);
    }

    #[test]
    fn test_close_returns_source() {
        let input = b"a\nb\n";
        let mut reader = Reader::open(Trickle { data: input, step: 2 }, Dialect::default());
        reader.next_row().unwrap();
        let source = reader.close();
        // Only the first chunk was pulled
        assert_eq!(source.data, b"b\n");
    }

    #[test]
    fn test_detected_terminator() {
        let mut reader = Reader::from_slice(b"a\r\nb\n", Dialect::default());
        while reader.next_row().unwrap().is_some() {}
        assert_eq!(reader.detected_terminator(), Some(LineTerminator::Crlf));
        assert_eq!(reader.byte_offset(), 5);
    }
}
