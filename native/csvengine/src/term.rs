// Engine rows and errors as Elixir terms

use crate::error::CsvError;
use crate::nif::atoms;
use rustler::{Encoder, Env, NewBinary, Term};

/// Copy bytes into a fresh binary term
pub fn bytes_to_term<'a>(env: Env<'a>, bytes: &[u8]) -> Term<'a> {
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

/// Cons list of `items`, each converted by `item`. Built back to front.
fn list_to_term<'a, T>(
    env: Env<'a>,
    items: Vec<T>,
    item: impl Fn(Env<'a>, T) -> Term<'a>,
) -> Term<'a> {
    items
        .into_iter()
        .rev()
        .fold(Term::list_new_empty(env), |list, x| list.list_prepend(item(env, x)))
}

/// Rows as a list of lists of binaries
pub fn rows_to_term<'a>(env: Env<'a>, rows: Vec<Vec<Vec<u8>>>) -> Term<'a> {
    list_to_term(env, rows, |env, row| {
        list_to_term(env, row, |env, field| bytes_to_term(env, &field))
    })
}

/// Error reason keeping the kind and position:
///
/// - `{:config, message}`
/// - `{:malformed_quote, byte_offset, row_index}`
/// - `{:inconsistent_field_count, expected, found, row_index, byte_offset}`
/// - `{:io, message}`
/// - `{:write, rows_written, message}`
pub fn error_reason<'a>(env: Env<'a>, err: &CsvError) -> Term<'a> {
    match err {
        CsvError::Config(msg) => (atoms::config(), msg.as_str()).encode(env),
        CsvError::MalformedQuote {
            byte_offset,
            row_index,
        } => (atoms::malformed_quote(), *byte_offset, *row_index).encode(env),
        CsvError::InconsistentFieldCount {
            expected,
            found,
            row_index,
            byte_offset,
        } => (
            atoms::inconsistent_field_count(),
            *expected,
            *found,
            *row_index,
            *byte_offset,
        )
            .encode(env),
        CsvError::Io(e) => (atoms::io(), e.to_string()).encode(env),
        CsvError::Write {
            rows_written,
            source,
        } => (atoms::write(), *rows_written, source.to_string()).encode(env),
    }
}

/// `{:error, reason}`
pub fn error_to_term<'a>(env: Env<'a>, err: &CsvError) -> Term<'a> {
    (atoms::error(), error_reason(env, err)).encode(env)
}
