// Streaming parser: the byte-driven state machine
//
// Push-driven and I/O free. Callers either `feed` chunks or `fill` the
// internal buffer from a source, then `poll_row` until it asks for more
// input. Rows are materialized one at a time into a pooled `Row`.
//
// Key design:
// - State is a flat enum advanced one byte at a time (no recursion)
// - Plain-data runs inside fields are copied in bulk via memchr
// - A `\r` at a chunk boundary is held until the next byte decides
//   whether it starts a `\r\n` terminator

use crate::core::scanner::{line_run, quoted_run, unquoted_run};
use crate::core::{Buffer, ByteClass, ByteSource, Dialect, Escaping, LineTerminator, Row};
use crate::error::{CsvError, Result};
use tracing::debug;

/// Parser state between bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Start of a field other than the first of a row
    FieldStart,
    /// Inside an unquoted field
    InField,
    /// Inside a quoted field
    InQuotedField,
    /// A quote byte was seen inside a quoted field
    QuoteSeenInQuoted,
    /// Trailing content after a closed quoted field (escape-byte dialects)
    AfterField,
    /// Start of a row, nothing consumed yet
    AfterRow,
    /// Skipping a comment line
    Comment,
    /// A malformed quote stopped the parse
    Error,
}

/// Result of one `poll_row` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// A row is available through `row()`
    Ready,
    /// Buffered bytes are exhausted; feed more or call `finish`
    NeedInput,
    /// End of input
    End,
}

/// Byte after terminator and escape resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Delimiter,
    Quote,
    Escape,
    Terminator,
    Comment,
    Space,
    Other,
}

enum Step {
    Continue,
    RowEnd,
    Fail(CsvError),
}

enum Outcome {
    Row,
    NeedInput,
    End,
    Fail(CsvError),
}

struct Machine {
    dialect: Dialect,
    state: ParserState,
    row: Row,
    pending_cr: bool,
    pending_escape: bool,
    /// The row was handed out and must be recycled before parsing resumes
    emitted: bool,
    /// Absolute offset of the next byte to process
    offset: u64,
    row_start: u64,
    quote_offset: u64,
    rows_read: u64,
    expected_fields: Option<usize>,
    detected: Option<LineTerminator>,
}

impl Machine {
    fn new(dialect: Dialect) -> Self {
        Machine {
            dialect,
            state: ParserState::AfterRow,
            row: Row::new(),
            pending_cr: false,
            pending_escape: false,
            emitted: false,
            offset: 0,
            row_start: 0,
            quote_offset: 0,
            rows_read: 0,
            expected_fields: None,
            detected: None,
        }
    }

    fn recycle(&mut self) {
        self.row.clear();
        self.emitted = false;
    }

    /// Run the machine over `input` until a row completes or the input is
    /// exhausted. Returns the number of bytes consumed.
    fn advance(&mut self, input: &[u8]) -> (usize, Outcome) {
        let mut pos = 0;
        while pos < input.len() {
            if !self.pending_cr && !self.pending_escape {
                let run = self.plain_run(&input[pos..]);
                pos += run;
                self.offset += run as u64;
                if pos == input.len() {
                    break;
                }
            }

            let step = self.step(input[pos]);
            pos += 1;
            self.offset += 1;
            match step {
                Step::Continue => {}
                Step::RowEnd => return (pos, self.complete_row()),
                Step::Fail(e) => {
                    self.state = ParserState::Error;
                    return (pos, Outcome::Fail(e));
                }
            }
        }
        (pos, Outcome::NeedInput)
    }

    /// Copy the leading plain-data run for the current state.
    #[inline]
    fn plain_run(&mut self, bytes: &[u8]) -> usize {
        let n = match self.state {
            ParserState::InField | ParserState::AfterField => {
                unquoted_run(bytes, self.dialect.delimiter(), self.dialect.escape())
            }
            ParserState::InQuotedField => {
                quoted_run(bytes, self.dialect.quote(), self.dialect.escape())
            }
            ParserState::Comment => return line_run(bytes),
            _ => return 0,
        };
        if n > 0 {
            self.row.current_mut().extend(&bytes[..n]);
        }
        n
    }

    fn step(&mut self, byte: u8) -> Step {
        let at = self.offset;
        if self.pending_escape {
            self.pending_escape = false;
            self.row.current_mut().push(byte);
            return Step::Continue;
        }

        let class = self.dialect.class_of(byte);
        if self.state == ParserState::InQuotedField {
            match class {
                ByteClass::Quote => self.state = ParserState::QuoteSeenInQuoted,
                ByteClass::Escape => self.pending_escape = true,
                _ => self.row.current_mut().push(byte),
            }
            return Step::Continue;
        }

        if self.pending_cr {
            self.pending_cr = false;
            if byte == b'\n' {
                self.note_terminator(LineTerminator::Crlf);
                return self.on_input(Input::Terminator, byte, at - 1);
            }
            // A lone \r is data
            if let Step::Fail(e) = self.on_input(Input::Other, b'\r', at - 1) {
                return Step::Fail(e);
            }
        }

        let terminators = self.dialect.line_terminator();
        let input = match class {
            ByteClass::Delimiter => Input::Delimiter,
            ByteClass::Quote => Input::Quote,
            ByteClass::Escape => Input::Escape,
            ByteClass::Comment => Input::Comment,
            ByteClass::Space => Input::Space,
            ByteClass::LineFeed if terminators.accepts_lf() => {
                self.note_terminator(LineTerminator::Lf);
                Input::Terminator
            }
            ByteClass::CarriageReturn if terminators.accepts_crlf() => {
                self.pending_cr = true;
                return Step::Continue;
            }
            _ => Input::Other,
        };
        self.on_input(input, byte, at)
    }

    fn on_input(&mut self, input: Input, byte: u8, at: u64) -> Step {
        match self.state {
            ParserState::AfterRow => match input {
                Input::Terminator if self.dialect.skip_blank_lines() => Step::Continue,
                Input::Terminator => {
                    self.row_start = at;
                    self.row.finish_field();
                    Step::RowEnd
                }
                Input::Comment => {
                    self.state = ParserState::Comment;
                    Step::Continue
                }
                _ => {
                    self.row_start = at;
                    self.state = ParserState::FieldStart;
                    self.on_field_start(input, byte, at)
                }
            },
            ParserState::Comment => {
                if input == Input::Terminator {
                    self.state = ParserState::AfterRow;
                }
                Step::Continue
            }
            ParserState::FieldStart => self.on_field_start(input, byte, at),
            ParserState::InField | ParserState::AfterField => match input {
                Input::Delimiter => {
                    self.row.finish_field();
                    self.state = ParserState::FieldStart;
                    Step::Continue
                }
                Input::Terminator => {
                    self.row.finish_field();
                    Step::RowEnd
                }
                Input::Escape => {
                    self.pending_escape = true;
                    Step::Continue
                }
                _ => {
                    self.row.current_mut().push(byte);
                    Step::Continue
                }
            },
            ParserState::QuoteSeenInQuoted => self.on_closing_quote(input, byte, at),
            ParserState::InQuotedField => {
                self.row.current_mut().push(byte);
                Step::Continue
            }
            ParserState::Error => Step::Continue,
        }
    }

    fn on_field_start(&mut self, input: Input, byte: u8, at: u64) -> Step {
        match input {
            Input::Delimiter => {
                self.row.finish_field();
                Step::Continue
            }
            Input::Quote => {
                self.row.current_mut().mark_quoted();
                self.quote_offset = at;
                self.state = ParserState::InQuotedField;
                Step::Continue
            }
            Input::Terminator => {
                self.row.finish_field();
                Step::RowEnd
            }
            Input::Escape => {
                self.row.current_mut();
                self.pending_escape = true;
                self.state = ParserState::InField;
                Step::Continue
            }
            // Only classified as Space when skip_initial_space is set
            Input::Space => Step::Continue,
            Input::Comment | Input::Other => {
                self.row.current_mut().push(byte);
                self.state = ParserState::InField;
                Step::Continue
            }
        }
    }

    fn on_closing_quote(&mut self, input: Input, byte: u8, at: u64) -> Step {
        let escaping = self.dialect.escaping();
        match input {
            Input::Delimiter => {
                self.row.finish_field();
                self.state = ParserState::FieldStart;
                Step::Continue
            }
            Input::Terminator => {
                self.row.finish_field();
                Step::RowEnd
            }
            Input::Quote => {
                self.row.current_mut().push(byte);
                self.state = match escaping {
                    Escaping::Doubled => ParserState::InQuotedField,
                    Escaping::Byte(_) => ParserState::AfterField,
                };
                Step::Continue
            }
            Input::Escape => {
                self.pending_escape = true;
                self.state = ParserState::AfterField;
                Step::Continue
            }
            _ => match escaping {
                Escaping::Doubled => Step::Fail(CsvError::MalformedQuote {
                    byte_offset: at,
                    row_index: self.rows_read + 1,
                }),
                Escaping::Byte(_) => {
                    self.row.current_mut().push(byte);
                    self.state = ParserState::AfterField;
                    Step::Continue
                }
            },
        }
    }

    fn note_terminator(&mut self, terminator: LineTerminator) {
        if self.detected.is_none() {
            self.detected = Some(terminator);
        }
    }

    fn complete_row(&mut self) -> Outcome {
        self.rows_read += 1;
        self.emitted = true;
        self.state = ParserState::AfterRow;

        let found = self.row.len();
        let expected = *self.expected_fields.get_or_insert(found);
        if self.dialect.strict_field_count() && expected != found {
            self.row.seal(self.rows_read, false);
            return Outcome::Fail(CsvError::InconsistentFieldCount {
                expected,
                found,
                row_index: self.rows_read,
                byte_offset: self.row_start,
            });
        }
        self.row.seal(self.rows_read, true);
        Outcome::Row
    }

    /// End of input: close the last row, if any. Safe to call repeatedly.
    fn finish(&mut self) -> Outcome {
        if self.pending_cr {
            self.pending_cr = false;
            let at = self.offset.saturating_sub(1);
            if let Step::Fail(e) = self.on_input(Input::Other, b'\r', at) {
                self.state = ParserState::Error;
                return Outcome::Fail(e);
            }
        }
        if self.pending_escape {
            self.pending_escape = false;
            if let Some(esc) = self.dialect.escape() {
                self.row.current_mut().push(esc);
            }
        }

        match self.state {
            ParserState::AfterRow | ParserState::Comment | ParserState::Error => Outcome::End,
            ParserState::InQuotedField => {
                self.state = ParserState::Error;
                Outcome::Fail(CsvError::MalformedQuote {
                    byte_offset: self.quote_offset,
                    row_index: self.rows_read + 1,
                })
            }
            ParserState::FieldStart
            | ParserState::InField
            | ParserState::AfterField
            | ParserState::QuoteSeenInQuoted => {
                self.row.finish_field();
                self.complete_row()
            }
        }
    }
}

/// Stateful, push-driven CSV parser.
pub struct StreamingParser {
    buffer: Buffer,
    machine: Machine,
    eof: bool,
}

impl StreamingParser {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_capacity(dialect, crate::core::buffer::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(dialect: Dialect, capacity: usize) -> Self {
        StreamingParser {
            buffer: Buffer::with_capacity(capacity),
            machine: Machine::new(dialect),
            eof: false,
        }
    }

    /// Append a chunk of input. Must not be called after `finish`.
    pub fn feed(&mut self, chunk: &[u8]) {
        debug_assert!(!self.eof, "feed after finish");
        self.buffer.extend(chunk);
    }

    /// Pull one chunk from `source` into the buffer. Returns 0 at end of input.
    pub fn fill<S: ByteSource + ?Sized>(&mut self, source: &mut S, chunk: usize) -> Result<usize> {
        Ok(self.buffer.fill(source, chunk)?)
    }

    /// Mark end of input; the next poll closes the last row.
    pub fn finish(&mut self) {
        self.eof = true;
    }

    pub fn is_finished(&self) -> bool {
        self.eof
    }

    /// Advance to the next row.
    ///
    /// On `Ready` the row is available through [`row`](Self::row) until the
    /// next call. `InconsistentFieldCount` leaves the session usable;
    /// `MalformedQuote` ends it and later calls return `End`.
    pub fn poll_row(&mut self) -> Result<RowStatus> {
        if self.machine.emitted {
            self.machine.recycle();
        }
        if self.machine.state == ParserState::Error {
            return Ok(RowStatus::End);
        }

        let (consumed, outcome) = self.machine.advance(self.buffer.readable());
        self.buffer.consume(consumed);
        let outcome = match outcome {
            Outcome::NeedInput if self.eof => self.machine.finish(),
            other => other,
        };

        match outcome {
            Outcome::Row => Ok(RowStatus::Ready),
            Outcome::NeedInput => Ok(RowStatus::NeedInput),
            Outcome::End => Ok(RowStatus::End),
            Outcome::Fail(e) => {
                debug!(error = %e, "parse error");
                Err(e)
            }
        }
    }

    /// Poll up to `max` rows, copying them into `out`.
    ///
    /// Rows parsed before an error stay in `out`. Returns `Ready` when
    /// `max` rows were taken and more may follow.
    pub fn take_rows(&mut self, max: usize, out: &mut Vec<Vec<Vec<u8>>>) -> Result<RowStatus> {
        let mut taken = 0;
        while taken < max {
            match self.poll_row()? {
                RowStatus::Ready => {
                    out.push(self.row().to_vec());
                    taken += 1;
                }
                status => return Ok(status),
            }
        }
        Ok(RowStatus::Ready)
    }

    /// The most recently materialized row. After `InconsistentFieldCount`
    /// this is the rejected row, with `is_valid() == false`.
    pub fn row(&self) -> &Row {
        &self.machine.row
    }

    pub fn state(&self) -> ParserState {
        self.machine.state
    }

    pub fn dialect(&self) -> &Dialect {
        &self.machine.dialect
    }

    /// Rows materialized so far (yielded or rejected)
    pub fn rows_read(&self) -> u64 {
        self.machine.rows_read
    }

    /// Bytes consumed by the state machine
    pub fn byte_offset(&self) -> u64 {
        self.machine.offset
    }

    /// Byte offset at which the most recent row began
    pub fn row_offset(&self) -> u64 {
        self.machine.row_start
    }

    /// Bytes waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer capacity, for memory monitoring
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// First line terminator seen in the stream
    pub fn detected_terminator(&self) -> Option<LineTerminator> {
        self.machine.detected
    }
}
