// Core primitives shared by the reader and writer

pub mod buffer;
pub mod dialect;
pub mod field;
pub mod io;
pub mod newlines;
pub mod scanner;

pub use buffer::Buffer;
pub use dialect::{ByteClass, Dialect, DialectOptions, Escaping};
pub use field::{Field, Row};
pub use io::{ByteSink, ByteSource};
pub use newlines::{match_terminator, LineTerminator};
