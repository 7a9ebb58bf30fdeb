// Writer session: the encoder bound to a byte sink
//
// Rows are staged in the Buffer and drained to the sink once the staged
// bytes cross the flush threshold, on `flush`, and on `close`.

use crate::core::buffer::DEFAULT_CAPACITY;
use crate::core::{Buffer, ByteSink, Dialect, DialectOptions};
use crate::error::{CsvError, Result};
use crate::reader::Reader;
use crate::strategy::encode::encode_field;
use tracing::debug;

pub struct Writer<K: ByteSink> {
    sink: K,
    buffer: Buffer,
    dialect: Dialect,
    threshold: usize,
    fields_in_row: usize,
    /// First field of the open row was written as zero bytes
    bare_empty_first: bool,
    rows_written: u64,
    /// Rows whose bytes reached the sink
    rows_delivered: u64,
}

impl<K: ByteSink> Writer<K> {
    pub fn open(sink: K, dialect: Dialect) -> Self {
        Self::with_capacity(sink, dialect, DEFAULT_CAPACITY)
    }

    /// Validate `options` and open a session.
    pub fn open_with(sink: K, options: DialectOptions) -> Result<Self> {
        Ok(Self::open(sink, options.build()?))
    }

    /// Open with an explicit buffer capacity; rows are drained once half
    /// of it is staged.
    pub fn with_capacity(sink: K, dialect: Dialect, capacity: usize) -> Self {
        debug!(capacity, "opening writer");
        Writer {
            sink,
            buffer: Buffer::with_capacity(capacity),
            dialect,
            threshold: (capacity / 2).max(1),
            fields_in_row: 0,
            bare_empty_first: false,
            rows_written: 0,
            rows_delivered: 0,
        }
    }

    /// Append one field to the open row.
    pub fn write_field<F: AsRef<[u8]>>(&mut self, field: F) {
        let field = field.as_ref();
        let first = self.fields_in_row == 0;
        if !first {
            self.buffer.push(self.dialect.delimiter());
        }
        let quoted = encode_field(&mut self.buffer, field, first, &self.dialect);
        if first {
            self.bare_empty_first = field.is_empty() && !quoted;
        }
        self.fields_in_row += 1;
    }

    /// Terminate the open row.
    ///
    /// A row holding a single empty field is written as `""` so it does not
    /// read back as a blank line. A row with no fields is just the terminator.
    pub fn end_row(&mut self) -> Result<()> {
        if self.fields_in_row == 1 && self.bare_empty_first {
            let quote = self.dialect.quote();
            self.buffer.push(quote);
            self.buffer.push(quote);
        }
        self.buffer.extend(self.dialect.line_terminator().as_bytes());
        self.fields_in_row = 0;
        self.bare_empty_first = false;
        self.rows_written += 1;

        if self.buffer.len() >= self.threshold {
            self.drain()?;
        }
        Ok(())
    }

    pub fn write_row<I, F>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        for field in fields {
            self.write_field(field);
        }
        self.end_row()
    }

    pub fn write_rows<R, I, F>(&mut self, rows: R) -> Result<()>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Split a delimited line with the session dialect and write its fields
    /// re-encoded.
    ///
    /// Quoted fields in `line` are decoded first, so `a,"b,c"` writes the
    /// two fields `a` and `b,c`. A line holding no record writes a row with
    /// no fields; a line holding several records writes each of them.
    pub fn write_row_from_str<L: AsRef<[u8]>>(&mut self, line: L) -> Result<()> {
        let dialect = self.dialect.without_strict_field_count();
        let mut reader = Reader::from_slice(line.as_ref(), dialect);
        let mut records = 0;
        while let Some(row) = reader.next_row()? {
            for field in row.iter() {
                self.write_field(field.as_bytes());
            }
            self.end_row()?;
            records += 1;
        }
        if records == 0 {
            self.end_row()?;
        }
        Ok(())
    }

    /// Drain staged bytes and flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        let rows_written = self.rows_delivered;
        self.sink
            .flush()
            .map_err(|source| CsvError::Write { rows_written, source })
    }

    /// Flush and hand the sink back. An open row is terminated first.
    pub fn close(mut self) -> Result<K> {
        if self.fields_in_row > 0 {
            self.end_row()?;
        }
        self.flush()?;
        debug!(rows = self.rows_written, "closing writer");
        Ok(self.sink)
    }

    /// Rows accepted so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Bytes staged and not yet drained
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn get_ref(&self) -> &K {
        &self.sink
    }

    /// Mutable access to the sink. Bytes still staged are not visible in it.
    pub fn get_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    fn drain(&mut self) -> Result<()> {
        let rows_written = self.rows_delivered;
        self.buffer
            .drain(&mut self.sink)
            .map_err(|source| CsvError::Write { rows_written, source })?;
        // Bytes of a partly written row may go out with the complete ones
        self.rows_delivered = self.rows_written;
        Ok(())
    }
}
