//! # dbf-reader
//!
//! A reader for dBase and FoxPro table files (`.dbf`) and their memo stores
//! (`.dbt` and `.fpt`).
//!
//! Supports the dBase III/IV/V and FoxPro/Visual FoxPro dialects. Records are
//! decoded into typed [`Value`]s; memo columns are resolved to their full text
//! when the companion memo file is present.
//!
//! ```no_run
//! use dbf_reader::TableReader;
//!
//! let table = TableReader::open("customers.dbf")?;
//! println!("version {} with {} records", table.version(), table.record_count());
//! for record in table.iter_records() {
//!     let record = record?;
//!     println!("{:?}", record.get("NAME"));
//! }
//! # Ok::<(), dbf_reader::DbfError>(())
//! ```
pub mod dbf;

// Re-export the main types for convenience
pub use dbf::{
    ColumnDescriptor,
    ColumnType,
    DbfError,
    MemoFormat,
    MemoResolver,
    Record,
    RecordDecoder,
    RecordIterator,
    Result,
    TableHeader,
    TableReader,
    TableVersion,
    Value,
};
