// NIF surface: reader and writer sessions as resources
//
// Sessions:
//   reader_new / reader_feed / reader_finish / reader_next_rows / reader_status
//   writer_new / writer_write_rows / writer_take
// One-shot:
//   encode_rows, parse_parallel (dirty CPU scheduler)
//
// Engine errors come back as `{:error, reason}` (see term::error_reason);
// bad argument shapes raise `ArgumentError`.

use crate::core::{Dialect, DialectOptions, LineTerminator};
use crate::resource::{ReaderRef, ReaderResource, WriterRef, WriterResource};
use crate::strategy::{read_all_parallel, RowStatus};
use crate::term::{bytes_to_term, error_to_term, rows_to_term};
use crate::writer::Writer;
use rustler::{Binary, Decoder, Encoder, Env, Error, NifResult, NifUnitEnum, ResourceArc, Term};
use tracing::debug;

pub mod atoms {
    rustler::atoms! {
        ok,
        error,
        more,
        need_input,
        done,
        // error kinds
        config,
        malformed_quote,
        inconsistent_field_count,
        io,
        write,
        // dialect keys
        delimiter,
        quote_char,
        escape_char,
        double_quote,
        line_terminator,
        strict_field_count,
        skip_blank_lines,
        quote_empty_fields,
        skip_initial_space,
        comment_char,
    }
}

#[derive(NifUnitEnum, Clone, Copy)]
enum Terminator {
    Lf,
    Crlf,
    Auto,
}

impl From<Terminator> for LineTerminator {
    fn from(t: Terminator) -> Self {
        match t {
            Terminator::Lf => LineTerminator::Lf,
            Terminator::Crlf => LineTerminator::Crlf,
            Terminator::Auto => LineTerminator::Auto,
        }
    }
}

// ============================================================================
// Dialect decoding
// ============================================================================

/// Decode a special byte: integer 44 or binary <<44>>.
fn decode_byte(term: Term) -> NifResult<u8> {
    if let Ok(byte) = term.decode::<u8>() {
        return Ok(byte);
    }
    match term.decode::<Binary>() {
        Ok(binary) if binary.len() == 1 => Ok(binary.as_slice()[0]),
        _ => Err(Error::BadArg),
    }
}

/// Look up `key` in a dialect map. Missing keys and `nil` are `None`.
fn lookup<'a>(map: Term<'a>, key: rustler::Atom) -> Option<Term<'a>> {
    let env = map.get_env();
    map.map_get(key.encode(env))
        .ok()
        .filter(|value| *value != rustler::types::atom::nil().encode(env))
}

fn byte_option(map: Term, key: rustler::Atom) -> NifResult<Option<u8>> {
    lookup(map, key).map(decode_byte).transpose()
}

fn decode_option<'a, T: Decoder<'a>>(map: Term<'a>, key: rustler::Atom) -> NifResult<Option<T>> {
    lookup(map, key).map(|value| value.decode::<T>()).transpose()
}

/// Decode a dialect map into options. Unset keys keep their defaults.
fn decode_options(map: Term) -> NifResult<DialectOptions> {
    if !map.is_map() {
        return Err(Error::BadArg);
    }
    let mut options = DialectOptions::default();
    if let Some(b) = byte_option(map, atoms::delimiter())? {
        options.delimiter = b;
    }
    if let Some(b) = byte_option(map, atoms::quote_char())? {
        options.quote_char = b;
    }
    options.escape_char = byte_option(map, atoms::escape_char())?;
    options.double_quote = decode_option(map, atoms::double_quote())?;
    options.comment_char = byte_option(map, atoms::comment_char())?;
    if let Some(t) = decode_option::<Terminator>(map, atoms::line_terminator())? {
        options.line_terminator = t.into();
    }
    let flags = [
        (atoms::strict_field_count(), &mut options.strict_field_count),
        (atoms::skip_blank_lines(), &mut options.skip_blank_lines),
        (atoms::quote_empty_fields(), &mut options.quote_empty_fields),
        (atoms::skip_initial_space(), &mut options.skip_initial_space),
    ];
    for (key, slot) in flags {
        if let Some(flag) = decode_option::<bool>(map, key)? {
            *slot = flag;
        }
    }
    Ok(options)
}

/// Validated dialect, or the `{:error, reason}` term to hand back.
fn decode_dialect<'a>(env: Env<'a>, map: Term<'a>) -> NifResult<Result<Dialect, Term<'a>>> {
    let options = decode_options(map)?;
    Ok(options.build().map_err(|e| error_to_term(env, &e)))
}

// ============================================================================
// Reader sessions
// ============================================================================

/// Create a reader session: `{:ok, reader}` or `{:error, reason}`
#[rustler::nif]
fn reader_new<'a>(env: Env<'a>, config: Term<'a>) -> NifResult<Term<'a>> {
    Ok(match decode_dialect(env, config)? {
        Ok(dialect) => {
            let reader: ReaderRef = ResourceArc::new(ReaderResource::new(dialect));
            (atoms::ok(), reader).encode(env)
        }
        Err(reason) => reason,
    })
}

/// Feed a chunk of input; returns the number of buffered bytes
#[rustler::nif]
fn reader_feed(reader: ReaderRef, chunk: Binary) -> NifResult<usize> {
    let mut parser = reader.lock()?;
    if parser.is_finished() {
        return Err(Error::RaiseAtom("reader_finished"));
    }
    parser.feed(chunk.as_slice());
    Ok(parser.buffered())
}

/// Mark end of input
#[rustler::nif]
fn reader_finish(reader: ReaderRef) -> NifResult<rustler::Atom> {
    reader.lock()?.finish();
    Ok(atoms::ok())
}

/// Take up to `max` rows: `{status, rows}` where status is `:more`,
/// `:need_input`, `:done` or `{:error, reason}`. Rows parsed before an
/// error are still returned.
#[rustler::nif]
fn reader_next_rows<'a>(env: Env<'a>, reader: ReaderRef, max: usize) -> NifResult<Term<'a>> {
    let mut parser = reader.lock()?;
    let mut rows = Vec::new();
    let status = match parser.take_rows(max, &mut rows) {
        Ok(RowStatus::Ready) => atoms::more().encode(env),
        Ok(RowStatus::NeedInput) => atoms::need_input().encode(env),
        Ok(RowStatus::End) => atoms::done().encode(env),
        Err(e) => error_to_term(env, &e),
    };
    Ok((status, rows_to_term(env, rows)).encode(env))
}

/// Session status: `{rows_read, byte_offset, buffered_bytes}`
#[rustler::nif]
fn reader_status(reader: ReaderRef) -> NifResult<(u64, u64, usize)> {
    let parser = reader.lock()?;
    Ok((parser.rows_read(), parser.byte_offset(), parser.buffered()))
}

// ============================================================================
// Writer sessions
// ============================================================================

/// Create a writer session: `{:ok, writer}` or `{:error, reason}`
#[rustler::nif]
fn writer_new<'a>(env: Env<'a>, config: Term<'a>) -> NifResult<Term<'a>> {
    Ok(match decode_dialect(env, config)? {
        Ok(dialect) => {
            let writer: WriterRef = ResourceArc::new(WriterResource::new(dialect));
            (atoms::ok(), writer).encode(env)
        }
        Err(reason) => reason,
    })
}

/// Encode rows into the session; `:ok` or `{:error, reason}`
#[rustler::nif]
fn writer_write_rows<'a>(
    env: Env<'a>,
    writer: WriterRef,
    rows: Vec<Vec<Binary<'a>>>,
) -> NifResult<Term<'a>> {
    let mut writer = writer.lock()?;
    let rows = rows.iter().map(|row| row.iter().map(|f| f.as_slice()));
    Ok(match writer.write_rows(rows) {
        Ok(()) => atoms::ok().encode(env),
        Err(e) => error_to_term(env, &e),
    })
}

/// Take the bytes encoded so far as one binary
#[rustler::nif]
fn writer_take<'a>(env: Env<'a>, writer: WriterRef) -> NifResult<Term<'a>> {
    let mut writer = writer.lock()?;
    if let Err(e) = writer.flush() {
        return Ok(error_to_term(env, &e));
    }
    let bytes = std::mem::take(writer.get_mut());
    Ok(bytes_to_term(env, &bytes))
}

// ============================================================================
// One-shot
// ============================================================================

/// Encode rows to a single binary, or `{:error, reason}`
#[rustler::nif(schedule = "DirtyCpu")]
fn encode_rows<'a>(env: Env<'a>, rows: Vec<Vec<Binary<'a>>>, config: Term<'a>) -> NifResult<Term<'a>> {
    let dialect = match decode_dialect(env, config)? {
        Ok(dialect) => dialect,
        Err(reason) => return Ok(reason),
    };
    let mut writer = Writer::open(Vec::new(), dialect);
    let encoded = match writer.write_rows(rows.iter().map(|row| row.iter().map(|f| f.as_slice()))) {
        Ok(()) => writer.close(),
        Err(e) => Err(e),
    };
    Ok(match encoded {
        Ok(bytes) => bytes_to_term(env, &bytes),
        Err(e) => error_to_term(env, &e),
    })
}

/// Parse a complete binary on the rayon pool: `{:ok, rows}` or `{:error, reason}`
#[rustler::nif(schedule = "DirtyCpu")]
fn parse_parallel<'a>(env: Env<'a>, input: Binary<'a>, config: Term<'a>) -> NifResult<Term<'a>> {
    let dialect = match decode_dialect(env, config)? {
        Ok(dialect) => dialect,
        Err(reason) => return Ok(reason),
    };
    // Workers only build owned rows; terms are made here on the calling thread
    Ok(match read_all_parallel(input.as_slice(), &dialect) {
        Ok(rows) => (atoms::ok(), rows_to_term(env, rows)).encode(env),
        Err(e) => error_to_term(env, &e),
    })
}

// ============================================================================
// NIF Initialization
// ============================================================================

#[allow(non_local_definitions)]
fn load(env: Env, _info: Term) -> bool {
    debug!("loading csvengine NIF");
    let _ = rustler::resource!(ReaderResource, env);
    let _ = rustler::resource!(WriterResource, env);
    true
}

rustler::init!("Elixir.CsvEngine.Native", load = load);
