// Row / Field materializer
//
// A Row owns an arena of Field buffers indexed by position. Clearing a row
// only resets the live count; the Field allocations are kept and reused by
// the next row, so steady-state parsing does not allocate.

use std::fmt;
use std::ops::Index;

/// One field: unescaped bytes plus whether it was quoted in the source.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Field {
    data: Vec<u8>,
    quoted: bool,
}

impl Field {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Field as UTF-8, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    #[inline]
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub(crate) fn push(&mut self, byte: u8) {
        self.data.push(byte);
    }

    #[inline]
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    #[inline]
    pub(crate) fn mark_quoted(&mut self) {
        self.quoted = true;
    }

    fn reset(&mut self) {
        self.data.clear();
        self.quoted = false;
    }
}

impl AsRef<[u8]> for Field {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.data))?;
        if self.quoted {
            write!(f, "(quoted)")?;
        }
        Ok(())
    }
}

/// An ordered sequence of fields with its 1-based row index.
///
/// Rows handed out by a reader borrow the session; the next `next_row`
/// call reuses the same storage.
#[derive(Clone, Default)]
pub struct Row {
    slots: Vec<Field>,
    live: usize,
    open: bool,
    index: u64,
    valid: bool,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// 1-based index of this row in its stream
    pub fn index(&self) -> u64 {
        self.index
    }

    /// False for a row rejected by field-count validation
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn get(&self, i: usize) -> Option<&Field> {
        self.fields().get(i)
    }

    pub fn fields(&self) -> &[Field] {
        &self.slots[..self.live]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields().iter()
    }

    /// Copy the field bytes out of the pooled storage.
    pub fn to_vec(&self) -> Vec<Vec<u8>> {
        self.iter().map(|f| f.as_bytes().to_vec()).collect()
    }

    /// Field slots allocated so far (live or recycled)
    pub fn pooled(&self) -> usize {
        self.slots.len()
    }

    /// The field under construction, claiming a slot on first use.
    #[inline]
    pub(crate) fn current_mut(&mut self) -> &mut Field {
        if !self.open {
            if self.live == self.slots.len() {
                self.slots.push(Field::default());
            } else {
                self.slots[self.live].reset();
            }
            self.open = true;
        }
        &mut self.slots[self.live]
    }

    /// Close the field under construction; an unopened field closes empty.
    #[inline]
    pub(crate) fn finish_field(&mut self) {
        self.current_mut();
        self.open = false;
        self.live += 1;
    }

    pub(crate) fn seal(&mut self, index: u64, valid: bool) {
        self.index = index;
        self.valid = valid;
    }

    /// Drop the live fields, keeping their buffers.
    pub(crate) fn clear(&mut self) {
        self.live = 0;
        self.open = false;
        self.valid = false;
    }

    /// Append a complete field.
    pub fn push_field(&mut self, bytes: &[u8]) {
        self.current_mut().extend(bytes);
        self.finish_field();
    }
}

impl Index<usize> for Row {
    type Output = Field;

    fn index(&self, i: usize) -> &Field {
        &self.fields()[i]
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("index", &self.index)
            .field("valid", &self.valid)
            .field("fields", &self.fields())
            .finish()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.valid == other.valid && self.fields() == other.fields()
    }
}
