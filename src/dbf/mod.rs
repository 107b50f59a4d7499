//! Core table reader module

pub mod column;
pub mod format;
pub mod iter;
pub mod memo;
pub mod reader;
pub mod types;
mod utils;

pub use column::{ColumnDescriptor, ColumnType};
pub use format::record::RecordDecoder;
pub use iter::RecordIterator;
pub use memo::MemoResolver;
pub use reader::TableReader;
pub use types::error::{DbfError, Result};
pub use types::models::{MemoFormat, TableHeader, TableVersion};
pub use types::value::{Record, Value};
pub use utils::{encoding_for_language_driver, parse_encoding};
