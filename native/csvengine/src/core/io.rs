// Minimal byte source / sink capabilities
//
// The engine never blocks on I/O itself; it asks a source for the next
// chunk or hands a sink the next chunk. Anything implementing std::io
// Read/Write qualifies, including `&[u8]` and `Vec<u8>`.

use std::io::{self, Read, Write};

/// Yields the next chunk of input bytes.
pub trait ByteSource {
    /// Copy up to `dst.len()` bytes into `dst`. Returns 0 at end of input.
    fn next_chunk(&mut self, dst: &mut [u8]) -> io::Result<usize>;
}

/// Accepts the next chunk of output bytes.
pub trait ByteSink {
    /// Accept the whole chunk or fail.
    fn accept(&mut self, chunk: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Read> ByteSource for R {
    fn next_chunk(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.read(dst) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

impl<W: Write> ByteSink for W {
    fn accept(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.write_all(chunk)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(self)
    }
}
