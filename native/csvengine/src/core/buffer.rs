// Buffer manager: growable byte window with read / write cursors
//
// Layout: data[..read] is consumed, data[read..write] is live, and
// data[write..] is spare room. `data.len()` is the capacity.

use super::io::{ByteSink, ByteSource};
use std::io;
use tracing::{debug, trace};

/// Default capacity for session buffers (64 KiB).
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Bytes requested from a source per `fill` (16 KiB).
pub const DEFAULT_CHUNK: usize = 16 * 1024;

const MIN_CAPACITY: usize = 64;

pub struct Buffer {
    data: Vec<u8>,
    read: usize,
    write: usize,
}

impl Buffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Buffer {
            data: vec![0; capacity.max(MIN_CAPACITY)],
            read: 0,
            write: 0,
        }
    }

    /// Number of unread bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.write - self.read
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Read cursor position within the backing array
    pub fn read_pos(&self) -> usize {
        self.read
    }

    /// Unread bytes
    #[inline]
    pub fn readable(&self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    /// Advance the read cursor past `n` bytes.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        self.read += n.min(self.len());
        if self.read == self.write {
            self.read = 0;
            self.write = 0;
        }
    }

    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    /// Append bytes, compacting or doubling as needed.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.data[self.write..self.write + bytes.len()].copy_from_slice(bytes);
        self.write += bytes.len();
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        if self.write == self.data.len() {
            self.reserve(1);
        }
        self.data[self.write] = byte;
        self.write += 1;
    }

    /// Pull one chunk of at most `chunk` bytes from `source`.
    /// Returns 0 when the source is exhausted.
    pub fn fill<S: ByteSource + ?Sized>(&mut self, source: &mut S, chunk: usize) -> io::Result<usize> {
        let chunk = chunk.max(1);
        self.reserve(chunk);
        let end = self.write + chunk;
        let n = source.next_chunk(&mut self.data[self.write..end])?;
        self.write += n;
        Ok(n)
    }

    /// Push every unread byte to `sink`. On failure nothing is consumed.
    pub fn drain<K: ByteSink + ?Sized>(&mut self, sink: &mut K) -> io::Result<usize> {
        let n = self.len();
        if n == 0 {
            return Ok(0);
        }
        sink.accept(self.readable())?;
        trace!(bytes = n, "drained buffer");
        self.clear();
        Ok(n)
    }

    /// Ensure at least `additional` bytes of spare room after the write cursor.
    fn reserve(&mut self, additional: usize) {
        if self.data.len() - self.write >= additional {
            return;
        }
        if self.read > 0 && self.read >= self.data.len() / 2 {
            self.compact();
            if self.data.len() - self.write >= additional {
                return;
            }
        }
        let needed = self.write + additional;
        let mut capacity = self.data.len().max(MIN_CAPACITY);
        while capacity < needed {
            capacity *= 2;
        }
        debug!(from = self.data.len(), to = capacity, "growing buffer");
        self.data.resize(capacity, 0);
    }

    /// Shift the unread window to offset 0.
    fn compact(&mut self) {
        let live = self.len();
        debug!(shifted = self.read, live, "compacting buffer");
        self.data.copy_within(self.read..self.write, 0);
        self.read = 0;
        self.write = live;
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}
