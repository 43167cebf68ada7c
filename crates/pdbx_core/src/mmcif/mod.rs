//! The mmCIF text format: `data_` blocks of `_category.column value` pairs
//! and `loop_` tables.

mod reader;
mod writer;

pub use reader::{parse_bytes, parse_reader, parse_str};
pub use writer::{to_string, to_string_with_options, write, WriteOptions};
