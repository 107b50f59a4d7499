//! Core data structures for the table file format.
//!
//! This module defines the fundamental types used throughout the library:
//! - Table dialects and their memo layouts
//! - The parsed table header and record geometry

use std::fmt;
use std::ops::Range;

use chrono::NaiveDate;

use super::error::{DbfError, Result};
use crate::dbf::column::ColumnDescriptor;

/// Table flag bit set by Visual FoxPro when the table has a memo file.
pub const FLAG_HAS_MEMO: u8 = 0x02;

/// The dialect of a table, taken from the first byte of the file.
///
/// The set is closed: any other byte is rejected when the table is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TableVersion {
    FoxBase = 0x02,
    DBaseIII = 0x03,
    DBaseIV = 0x04,
    DBaseV = 0x05,
    VisualFoxPro = 0x30,
    VisualFoxProAutoIncrement = 0x31,
    DBaseIVSqlTable = 0x43,
    DBaseIVMemoVariant = 0x7B,
    DBaseIIIMemo = 0x83,
    DBaseIVMemo = 0x8B,
    DBaseIVSqlSystem = 0x8E,
    DBaseIVSqlTableMemo = 0xCB,
    FoxProMemo = 0xF5,
    FoxBasePlus = 0xFB,
}

impl TableVersion {
    /// The raw version byte.
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// A human readable name for the dialect.
    pub fn description(&self) -> &'static str {
        match self {
            TableVersion::FoxBase => "FoxBase",
            TableVersion::DBaseIII => "dBase III without memo file",
            TableVersion::DBaseIV => "dBase IV without memo file",
            TableVersion::DBaseV => "dBase V without memo file",
            TableVersion::VisualFoxPro => "Visual FoxPro",
            TableVersion::VisualFoxProAutoIncrement => "Visual FoxPro with AutoIncrement field",
            TableVersion::DBaseIVSqlTable => "dBase IV SQL table",
            TableVersion::DBaseIVMemoVariant => "dBase IV with memo file",
            TableVersion::DBaseIIIMemo => "dBase III with memo file",
            TableVersion::DBaseIVMemo => "dBase IV with memo file",
            TableVersion::DBaseIVSqlSystem => "dBase IV SQL system table",
            TableVersion::DBaseIVSqlTableMemo => "dBase IV SQL table with memo file",
            TableVersion::FoxProMemo => "FoxPro with memo file",
            TableVersion::FoxBasePlus => "FoxBASE+ without memo file",
        }
    }

    /// Returns the memo layout this dialect pairs with, if any.
    ///
    /// Plain Visual FoxPro tables only carry a memo store when the header's
    /// table flags say so; every other dialect decides by version alone.
    pub fn memo_format(&self, table_flags: u8) -> Option<MemoFormat> {
        match self {
            TableVersion::DBaseIIIMemo
            | TableVersion::DBaseIVMemo
            | TableVersion::DBaseIVMemoVariant
            | TableVersion::DBaseIVSqlTableMemo => Some(MemoFormat::Dbt),
            TableVersion::FoxProMemo => Some(MemoFormat::Fpt),
            TableVersion::VisualFoxPro if table_flags & FLAG_HAS_MEMO != 0 => Some(MemoFormat::Fpt),
            _ => None,
        }
    }

    /// Visual FoxPro headers carry a backlink area after the column block.
    pub fn is_visual_foxpro(&self) -> bool {
        matches!(self, TableVersion::VisualFoxPro | TableVersion::VisualFoxProAutoIncrement)
    }
}

impl TryFrom<u8> for TableVersion {
    type Error = DbfError;
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x02 => Ok(Self::FoxBase),
            0x03 => Ok(Self::DBaseIII),
            0x04 => Ok(Self::DBaseIV),
            0x05 => Ok(Self::DBaseV),
            0x30 => Ok(Self::VisualFoxPro),
            0x31 => Ok(Self::VisualFoxProAutoIncrement),
            0x43 => Ok(Self::DBaseIVSqlTable),
            0x7B => Ok(Self::DBaseIVMemoVariant),
            0x83 => Ok(Self::DBaseIIIMemo),
            0x8B => Ok(Self::DBaseIVMemo),
            0x8E => Ok(Self::DBaseIVSqlSystem),
            0xCB => Ok(Self::DBaseIVSqlTableMemo),
            0xF5 => Ok(Self::FoxProMemo),
            0xFB => Ok(Self::FoxBasePlus),
            _ => Err(DbfError::UnsupportedVersion(value)),
        }
    }
}

/// Renders the version the way dBase tooling reports it: two lower-case hex digits.
impl fmt::Display for TableVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02x}", self.tag())
    }
}

/// Layout of a companion memo store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoFormat {
    /// dBase fixed 512-byte blocks.
    Dbt,
    /// FoxPro variable-size blocks with typed, length-prefixed entries.
    Fpt,
}

impl MemoFormat {
    /// The lower-case file extension of this layout.
    pub fn extension(&self) -> &'static str {
        match self {
            MemoFormat::Dbt => "dbt",
            MemoFormat::Fpt => "fpt",
        }
    }

    /// Picks the layout from a file extension, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("dbt") {
            Some(MemoFormat::Dbt)
        } else if ext.eq_ignore_ascii_case("fpt") {
            Some(MemoFormat::Fpt)
        } else {
            None
        }
    }
}

impl fmt::Display for MemoFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Complete parsed header of a table file.
///
/// Holds everything needed to locate and split records: the dialect, the
/// record geometry and the ordered columns together with their byte offsets.
#[derive(Debug, Clone)]
pub struct TableHeader {
    pub version: TableVersion,
    /// Date of the last update, `None` when the stored bytes are not a valid date.
    pub last_update: Option<NaiveDate>,
    pub record_count: u32,
    pub header_length: u16,
    pub record_length: u16,
    pub table_flags: u8,
    pub language_driver: u8,
    pub columns: Vec<ColumnDescriptor>,
    /// Offset of each column within a record, parallel to `columns`.
    /// The first column starts right after the delete flag.
    pub offsets: Vec<usize>,
}

impl TableHeader {
    /// Byte range of the column at `index` within a raw record.
    pub fn field_range(&self, index: usize) -> Option<Range<usize>> {
        let column = self.columns.get(index)?;
        let start = *self.offsets.get(index)?;
        Some(start..start + column.length())
    }

    /// Absolute file offset of the record at `index`.
    pub fn record_offset(&self, index: u32) -> u64 {
        self.header_length as u64 + index as u64 * self.record_length as u64
    }

    /// Number of bytes the header promises: header plus all records.
    pub fn expected_file_size(&self) -> u64 {
        self.record_offset(self.record_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_renders_as_hex_tag() {
        assert_eq!(TableVersion::try_from(0x31).unwrap().to_string(), "31");
        assert_eq!(TableVersion::try_from(0xF5).unwrap().to_string(), "f5");
        assert_eq!(TableVersion::DBaseIII.to_string(), "03");
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert!(matches!(
            TableVersion::try_from(0x99),
            Err(DbfError::UnsupportedVersion(0x99))
        ));
    }

    #[test]
    fn memo_format_follows_dialect() {
        assert_eq!(TableVersion::VisualFoxProAutoIncrement.memo_format(0), None);
        assert_eq!(TableVersion::VisualFoxProAutoIncrement.memo_format(FLAG_HAS_MEMO), None);
        assert_eq!(TableVersion::FoxProMemo.memo_format(0), Some(MemoFormat::Fpt));
        assert_eq!(TableVersion::DBaseIIIMemo.memo_format(0), Some(MemoFormat::Dbt));
        assert_eq!(TableVersion::DBaseIVMemo.memo_format(0), Some(MemoFormat::Dbt));
        assert_eq!(TableVersion::VisualFoxPro.memo_format(0), None);
        assert_eq!(TableVersion::VisualFoxPro.memo_format(FLAG_HAS_MEMO), Some(MemoFormat::Fpt));
        assert_eq!(TableVersion::DBaseIII.memo_format(0), None);
    }

    #[test]
    fn visual_foxpro_versions() {
        assert!(TableVersion::VisualFoxPro.is_visual_foxpro());
        assert!(TableVersion::VisualFoxProAutoIncrement.is_visual_foxpro());
        assert!(!TableVersion::FoxProMemo.is_visual_foxpro());
    }

    #[test]
    fn memo_format_from_extension_ignores_case() {
        assert_eq!(MemoFormat::from_extension("FPT"), Some(MemoFormat::Fpt));
        assert_eq!(MemoFormat::from_extension("dbt"), Some(MemoFormat::Dbt));
        assert_eq!(MemoFormat::from_extension("dbf"), None);
        assert_eq!(MemoFormat::Fpt.to_string(), "fpt");
    }
}
