// csvengine - streaming CSV reader/writer engine
//
// Layers:
// core:     dialect, buffer manager, byte source/sink, row/field arena
// strategy: streaming state machine, field encoder, parallel reader
// reader / writer: sessions binding a strategy to a source or sink
// nif:      rustler surface (feature "nif")

pub mod core;
pub mod error;
pub mod reader;
pub mod strategy;
pub mod writer;

#[cfg(feature = "nif")]
mod nif;
#[cfg(feature = "nif")]
mod resource;
#[cfg(feature = "nif")]
mod term;

pub use crate::core::{
    Buffer, ByteClass, ByteSink, ByteSource, Dialect, DialectOptions, Escaping, Field,
    LineTerminator, Row,
};
pub use error::{CsvError, ErrorKind, Result};
pub use reader::{Reader, Rows};
pub use strategy::{read_all_parallel, read_all_parallel_with, ParserState, RowStatus, StreamingParser};
pub use writer::Writer;

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
