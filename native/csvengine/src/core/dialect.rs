// Dialect configuration and construction-time validation
//
// All checks run once in `Dialect::new`; the parser and encoder only ever
// see a validated `Dialect` and never re-check configuration per byte.

use super::newlines::LineTerminator;
use crate::error::{CsvError, Result};
use serde::{Deserialize, Serialize};

/// How a literal quote byte is represented inside a quoted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Escaping {
    /// `""` stands for one `"`
    Doubled,
    /// The escape byte makes the following byte literal
    Byte(u8),
}

/// Classification of a byte under a dialect.
///
/// The parser indexes a 256-entry table of these instead of comparing a
/// byte against every configured character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    Other,
    Delimiter,
    Quote,
    Escape,
    Comment,
    Space,
    LineFeed,
    CarriageReturn,
}

/// Raw dialect options as supplied by a caller or a config file.
///
/// Every field has a default, so a partial config deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectOptions {
    pub delimiter: u8,
    pub quote_char: u8,
    pub escape_char: Option<u8>,
    /// `None` derives the escaping method from `escape_char`
    pub double_quote: Option<bool>,
    pub line_terminator: LineTerminator,
    pub strict_field_count: bool,
    pub skip_blank_lines: bool,
    pub quote_empty_fields: bool,
    pub skip_initial_space: bool,
    pub comment_char: Option<u8>,
}

impl Default for DialectOptions {
    fn default() -> Self {
        DialectOptions {
            delimiter: b',',
            quote_char: b'"',
            escape_char: None,
            double_quote: None,
            line_terminator: LineTerminator::Auto,
            strict_field_count: false,
            skip_blank_lines: false,
            quote_empty_fields: false,
            skip_initial_space: false,
            comment_char: None,
        }
    }
}

impl DialectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote_char(mut self, quote: u8) -> Self {
        self.quote_char = quote;
        self
    }

    pub fn with_escape_char(mut self, escape: u8) -> Self {
        self.escape_char = Some(escape);
        self
    }

    pub fn with_double_quote(mut self, double_quote: bool) -> Self {
        self.double_quote = Some(double_quote);
        self
    }

    pub fn with_line_terminator(mut self, terminator: LineTerminator) -> Self {
        self.line_terminator = terminator;
        self
    }

    pub fn with_strict_field_count(mut self, strict: bool) -> Self {
        self.strict_field_count = strict;
        self
    }

    pub fn with_skip_blank_lines(mut self, skip: bool) -> Self {
        self.skip_blank_lines = skip;
        self
    }

    pub fn with_quote_empty_fields(mut self, quote: bool) -> Self {
        self.quote_empty_fields = quote;
        self
    }

    pub fn with_skip_initial_space(mut self, skip: bool) -> Self {
        self.skip_initial_space = skip;
        self
    }

    pub fn with_comment_char(mut self, comment: u8) -> Self {
        self.comment_char = Some(comment);
        self
    }

    /// Validate into an immutable [`Dialect`]
    pub fn build(self) -> Result<Dialect> {
        Dialect::new(self)
    }
}

/// Validated, immutable dialect shared by a session's parser and writer.
#[derive(Clone)]
pub struct Dialect {
    delimiter: u8,
    quote: u8,
    escaping: Escaping,
    comment: Option<u8>,
    line_terminator: LineTerminator,
    strict_field_count: bool,
    skip_blank_lines: bool,
    quote_empty_fields: bool,
    skip_initial_space: bool,
    classes: [ByteClass; 256],
}

fn check_special(name: &str, byte: u8) -> Result<()> {
    match byte {
        0 => Err(CsvError::config(format!("{} must not be NUL", name))),
        b'\r' | b'\n' => Err(CsvError::config(format!(
            "{} must not be a line terminator byte",
            name
        ))),
        _ => Ok(()),
    }
}

fn class_table(options: &DialectOptions, escaping: Escaping) -> [ByteClass; 256] {
    let mut classes = [ByteClass::Other; 256];
    classes[b'\n' as usize] = ByteClass::LineFeed;
    classes[b'\r' as usize] = ByteClass::CarriageReturn;
    if options.skip_initial_space {
        classes[b' ' as usize] = ByteClass::Space;
    }
    if let Some(comment) = options.comment_char {
        classes[comment as usize] = ByteClass::Comment;
    }
    if let Escaping::Byte(esc) = escaping {
        classes[esc as usize] = ByteClass::Escape;
    }
    classes[options.quote_char as usize] = ByteClass::Quote;
    classes[options.delimiter as usize] = ByteClass::Delimiter;
    classes
}

impl Dialect {
    /// Validate options. Checks run in a fixed order so the same invalid
    /// option is always reported the same way.
    pub fn new(options: DialectOptions) -> Result<Self> {
        check_special("delimiter", options.delimiter)?;
        check_special("quote_char", options.quote_char)?;
        if let Some(esc) = options.escape_char {
            check_special("escape_char", esc)?;
        }
        if let Some(comment) = options.comment_char {
            check_special("comment_char", comment)?;
        }

        if options.delimiter == options.quote_char {
            return Err(CsvError::config("delimiter and quote_char must differ"));
        }
        if let Some(esc) = options.escape_char {
            if esc == options.delimiter || esc == options.quote_char {
                return Err(CsvError::config(
                    "escape_char must differ from delimiter and quote_char",
                ));
            }
        }
        if let Some(comment) = options.comment_char {
            if comment == options.delimiter
                || comment == options.quote_char
                || Some(comment) == options.escape_char
            {
                return Err(CsvError::config(
                    "comment_char must differ from delimiter, quote_char and escape_char",
                ));
            }
        }
        if options.skip_initial_space && options.delimiter == b' ' {
            return Err(CsvError::config(
                "skip_initial_space cannot be used with a space delimiter",
            ));
        }

        let escaping = match (options.escape_char, options.double_quote) {
            (Some(_), Some(true)) => {
                return Err(CsvError::config(
                    "double_quote and escape_char are mutually exclusive",
                ))
            }
            (None, Some(false)) => {
                return Err(CsvError::config(
                    "double_quote disabled without an escape_char",
                ))
            }
            (Some(esc), _) => Escaping::Byte(esc),
            (None, _) => Escaping::Doubled,
        };

        let classes = class_table(&options, escaping);

        Ok(Dialect {
            delimiter: options.delimiter,
            quote: options.quote_char,
            escaping,
            comment: options.comment_char,
            line_terminator: options.line_terminator,
            strict_field_count: options.strict_field_count,
            skip_blank_lines: options.skip_blank_lines,
            quote_empty_fields: options.quote_empty_fields,
            skip_initial_space: options.skip_initial_space,
            classes,
        })
    }

    #[inline]
    pub fn class_of(&self, byte: u8) -> ByteClass {
        self.classes[byte as usize]
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn quote(&self) -> u8 {
        self.quote
    }

    pub fn escaping(&self) -> Escaping {
        self.escaping
    }

    /// The escape byte, when the dialect uses one
    pub fn escape(&self) -> Option<u8> {
        match self.escaping {
            Escaping::Byte(esc) => Some(esc),
            Escaping::Doubled => None,
        }
    }

    pub fn comment(&self) -> Option<u8> {
        self.comment
    }

    pub fn line_terminator(&self) -> LineTerminator {
        self.line_terminator
    }

    pub fn strict_field_count(&self) -> bool {
        self.strict_field_count
    }

    pub fn skip_blank_lines(&self) -> bool {
        self.skip_blank_lines
    }

    pub fn quote_empty_fields(&self) -> bool {
        self.quote_empty_fields
    }

    pub fn skip_initial_space(&self) -> bool {
        self.skip_initial_space
    }

    /// Options this dialect was built from.
    pub fn options(&self) -> DialectOptions {
        DialectOptions {
            delimiter: self.delimiter,
            quote_char: self.quote,
            escape_char: self.escape(),
            double_quote: Some(self.escaping == Escaping::Doubled),
            line_terminator: self.line_terminator,
            strict_field_count: self.strict_field_count,
            skip_blank_lines: self.skip_blank_lines,
            quote_empty_fields: self.quote_empty_fields,
            skip_initial_space: self.skip_initial_space,
            comment_char: self.comment,
        }
    }

    /// Copy without field-count validation, for sessions that only see a
    /// slice of the input and leave the check to their caller.
    pub(crate) fn without_strict_field_count(&self) -> Dialect {
        let mut dialect = self.clone();
        dialect.strict_field_count = false;
        dialect
    }
}

impl Default for Dialect {
    /// Comma delimiter, `"` quote with doubled-quote escaping, auto terminators
    fn default() -> Self {
        let options = DialectOptions::default();
        let classes = class_table(&options, Escaping::Doubled);
        Dialect {
            delimiter: options.delimiter,
            quote: options.quote_char,
            escaping: Escaping::Doubled,
            comment: None,
            line_terminator: options.line_terminator,
            strict_field_count: false,
            skip_blank_lines: false,
            quote_empty_fields: false,
            skip_initial_space: false,
            classes,
        }
    }
}

impl std::fmt::Debug for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialect")
            .field("delimiter", &(self.delimiter as char))
            .field("quote", &(self.quote as char))
            .field("escaping", &self.escaping)
            .field("comment", &self.comment.map(|c| c as char))
            .field("line_terminator", &self.line_terminator)
            .field("strict_field_count", &self.strict_field_count)
            .field("skip_blank_lines", &self.skip_blank_lines)
            .field("quote_empty_fields", &self.quote_empty_fields)
            .field("skip_initial_space", &self.skip_initial_space)
            .finish()
    }
}

impl PartialEq for Dialect {
    fn eq(&self, other: &Self) -> bool {
        // The class table is derived from the other fields
        self.options() == other.options()
    }
}

impl Eq for Dialect {}
