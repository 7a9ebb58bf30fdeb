// Parsing and encoding strategies

pub mod encode;
pub mod parallel;
pub mod streaming;

pub use parallel::{read_all_parallel, read_all_parallel_with};
pub use streaming::{ParserState, RowStatus, StreamingParser};
