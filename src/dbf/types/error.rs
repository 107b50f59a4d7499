//! Custom error types for the dbf-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Only structural problems surface here. Per-field decode failures (a bad
/// date, a dangling memo pointer) are reported as `None` values instead.
#[derive(Debug, Error)]
pub enum DbfError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// A column name was empty after stripping non-printable bytes.
    #[error("Column name cannot be empty")]
    ColumnName,

    /// A column declared a zero or negative byte width.
    #[error("Column length must be greater than 0, got {0}")]
    ColumnLength(i32),

    /// The version byte is not one of the supported dBase/FoxPro dialects.
    #[error("Unsupported table version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// The memo store has an extension that names no known memo layout.
    #[error("Unsupported memo file: {0}")]
    UnsupportedMemo(String),

    /// The file is structurally invalid or does not follow the table format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The declared record length disagrees with the sum of the column widths.
    #[error("Record geometry mismatch: header declares {declared} bytes per record, columns add up to {computed}")]
    GeometryMismatch { declared: u64, computed: u64 },

    /// The file ends before the data the header promises.
    #[error("Truncated file: expected at least {expected} bytes, but found {found} bytes")]
    Truncated { expected: u64, found: u64 },

    /// A record index beyond the table's record count was requested.
    #[error("Record index {index} is out of range for a table of {count} records")]
    RecordOutOfRange { index: u32, count: u32 },
}

/// A convenience `Result` type alias using the crate's `DbfError` type.
pub type Result<T> = std::result::Result<T, DbfError>;
