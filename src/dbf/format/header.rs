//! Table header parsing.
//!
//! Header structure (all integers little-endian):
//! - Byte 0: Version tag
//! - Bytes 1-3: Last update as YY (since 1900), MM, DD
//! - Bytes 4-7: Record count
//! - Bytes 8-9: Header length
//! - Bytes 10-11: Record length
//! - Byte 28: Table flags
//! - Byte 29: Language driver
//! - Bytes 32+: 32-byte column descriptors, terminated by `0x0D`

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};
use chrono::NaiveDate;
use log::{debug, trace, warn};

use crate::dbf::column::ColumnDescriptor;
use crate::dbf::types::error::{DbfError, Result};
use crate::dbf::types::models::{TableHeader, TableVersion};

/// Size of the fixed header and of each column descriptor.
pub const DESCRIPTOR_SIZE: usize = 32;

/// Marks the end of the column descriptor array.
pub const HEADER_TERMINATOR: u8 = 0x0D;

/// Size of the Visual FoxPro backlink area that follows the terminator.
pub const BACKLINK_SIZE: usize = 263;

/// Parses the table header and its column descriptors.
///
/// Leaves the reader positioned at the end of the header.
///
/// # Errors
/// - [`DbfError::UnsupportedVersion`] for an unknown version byte
/// - [`DbfError::InvalidFormat`] if the header is truncated or malformed
/// - [`DbfError::ColumnName`] / [`DbfError::ColumnLength`] for an invalid column
/// - [`DbfError::GeometryMismatch`] if the columns do not fill the record length
pub fn parse<R: Read>(file: &mut R) -> Result<TableHeader> {
    let mut fixed = [0u8; DESCRIPTOR_SIZE];
    read_header_bytes(file, &mut fixed)?;

    let version = TableVersion::try_from(fixed[0])?;
    let last_update = NaiveDate::from_ymd_opt(1900 + fixed[1] as i32, fixed[2] as u32, fixed[3] as u32);
    let record_count = LittleEndian::read_u32(&fixed[4..8]);
    let header_length = LittleEndian::read_u16(&fixed[8..10]);
    let record_length = LittleEndian::read_u16(&fixed[10..12]);
    let table_flags = fixed[28];
    let language_driver = fixed[29];

    debug!(
        "Table header: version={} ({}), records={}, header={} bytes, record={} bytes",
        version,
        version.description(),
        record_count,
        header_length,
        record_length
    );

    if (header_length as usize) <= DESCRIPTOR_SIZE {
        return Err(DbfError::InvalidFormat(format!(
            "Header length {} leaves no room for column descriptors",
            header_length
        )));
    }

    let mut descriptor_block = vec![0u8; header_length as usize - DESCRIPTOR_SIZE];
    read_header_bytes(file, &mut descriptor_block)?;

    let columns = parse_columns(&descriptor_block)?;
    if version.is_visual_foxpro() {
        let trailing = descriptor_block.len() - columns.len() * DESCRIPTOR_SIZE - 1;
        if trailing < BACKLINK_SIZE {
            warn!("Visual FoxPro header has {} bytes after the columns, expected a {}-byte backlink", trailing, BACKLINK_SIZE);
        } else {
            trace!("Skipping {}-byte backlink area", trailing);
        }
    }
    let offsets = column_offsets(&columns);

    let computed = 1 + columns.iter().map(|c| c.length() as u64).sum::<u64>();
    if computed != record_length as u64 {
        return Err(DbfError::GeometryMismatch {
            declared: record_length as u64,
            computed,
        });
    }

    Ok(TableHeader {
        version,
        last_update,
        record_count,
        header_length,
        record_length,
        table_flags,
        language_driver,
        columns,
        offsets,
    })
}

/// Parses the column descriptor array up to its terminator.
fn parse_columns(block: &[u8]) -> Result<Vec<ColumnDescriptor>> {
    let mut columns = Vec::new();
    let mut rest = block;

    loop {
        match rest.first() {
            Some(&HEADER_TERMINATOR) => break,
            None => {
                return Err(DbfError::InvalidFormat(
                    "Column descriptors are not terminated within the header".to_string(),
                ))
            }
            Some(_) if rest.len() < DESCRIPTOR_SIZE => {
                return Err(DbfError::InvalidFormat(format!(
                    "Column descriptor {} is truncated ({} bytes left in header)",
                    columns.len(),
                    rest.len()
                )))
            }
            Some(_) => {}
        }

        let (descriptor, tail) = rest.split_at(DESCRIPTOR_SIZE);
        let column = ColumnDescriptor::new(
            &descriptor[0..11],
            descriptor[11],
            descriptor[16] as i32,
            descriptor[17],
        )?;
        trace!(
            "Column {}: name={}, type={}, length={}, decimal={}",
            columns.len(),
            column.name(),
            column.column_type(),
            column.length(),
            column.decimal()
        );
        columns.push(column);
        rest = tail;
    }

    if columns.is_empty() {
        return Err(DbfError::InvalidFormat("Table declares no columns".to_string()));
    }

    debug!("Parsed {} column descriptors", columns.len());
    Ok(columns)
}

/// Running offsets of each column, starting after the 1-byte delete flag.
fn column_offsets(columns: &[ColumnDescriptor]) -> Vec<usize> {
    columns
        .iter()
        .scan(1usize, |offset, column| {
            let start = *offset;
            *offset += column.length();
            Some(start)
        })
        .collect()
}

/// Reads header bytes, reporting a short read as a malformed header.
fn read_header_bytes<R: Read>(file: &mut R, buf: &mut [u8]) -> Result<()> {
    file.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DbfError::InvalidFormat("Table header is truncated".to_string()),
        _ => DbfError::Io(e),
    })
}
