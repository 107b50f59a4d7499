//! Builders for table and memo fixtures written at test time.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

const VFP_BACKLINK_SIZE: usize = 263;

pub struct TableBuilder {
    version: u8,
    table_flags: u8,
    language_driver: u8,
    columns: Vec<(String, u8, u8, u8)>,
    rows: Vec<(u8, Vec<Vec<u8>>)>,
    record_count_override: Option<u32>,
    record_length_override: Option<u16>,
}

impl TableBuilder {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            table_flags: 0,
            language_driver: 0x03,
            columns: Vec::new(),
            rows: Vec::new(),
            record_count_override: None,
            record_length_override: None,
        }
    }

    pub fn table_flags(mut self, flags: u8) -> Self {
        self.table_flags = flags;
        self
    }

    pub fn language_driver(mut self, driver: u8) -> Self {
        self.language_driver = driver;
        self
    }

    pub fn column(mut self, name: &str, tag: u8, length: u8, decimal: u8) -> Self {
        self.columns.push((name.to_string(), tag, length, decimal));
        self
    }

    /// Adds a live row; each field is space-padded (or cut) to its column width.
    pub fn row(self, fields: &[&[u8]]) -> Self {
        self.push_row(b' ', fields)
    }

    pub fn deleted_row(self, fields: &[&[u8]]) -> Self {
        self.push_row(b'*', fields)
    }

    /// Adds a row with an arbitrary delete-flag byte.
    pub fn flagged_row(self, flag: u8, fields: &[&[u8]]) -> Self {
        self.push_row(flag, fields)
    }

    pub fn record_count(mut self, count: u32) -> Self {
        self.record_count_override = Some(count);
        self
    }

    pub fn record_length(mut self, length: u16) -> Self {
        self.record_length_override = Some(length);
        self
    }

    fn push_row(mut self, flag: u8, fields: &[&[u8]]) -> Self {
        assert_eq!(fields.len(), self.columns.len(), "one field per column");
        let fields = fields
            .iter()
            .zip(&self.columns)
            .map(|(field, (_, _, length, _))| {
                let mut bytes = field.to_vec();
                bytes.resize(*length as usize, b' ');
                bytes
            })
            .collect();
        self.rows.push((flag, fields));
        self
    }

    fn is_visual_foxpro(&self) -> bool {
        matches!(self.version, 0x30 | 0x31)
    }

    pub fn build(&self) -> Vec<u8> {
        let backlink = if self.is_visual_foxpro() { VFP_BACKLINK_SIZE } else { 0 };
        let header_length = 32 + 32 * self.columns.len() + 1 + backlink;
        let record_length = self.record_length_override.unwrap_or_else(|| {
            1 + self.columns.iter().map(|(_, _, length, _)| *length as u16).sum::<u16>()
        });
        let record_count = self.record_count_override.unwrap_or(self.rows.len() as u32);

        let mut bytes = vec![0u8; 32];
        bytes[0] = self.version;
        bytes[1] = 124;
        bytes[2] = 6;
        bytes[3] = 30;
        bytes[4..8].copy_from_slice(&record_count.to_le_bytes());
        bytes[8..10].copy_from_slice(&(header_length as u16).to_le_bytes());
        bytes[10..12].copy_from_slice(&record_length.to_le_bytes());
        bytes[28] = self.table_flags;
        bytes[29] = self.language_driver;

        let mut offset = 1u32;
        for (name, tag, length, decimal) in &self.columns {
            let mut descriptor = vec![0u8; 32];
            descriptor[..name.len()].copy_from_slice(name.as_bytes());
            descriptor[11] = *tag;
            descriptor[12..16].copy_from_slice(&offset.to_le_bytes());
            descriptor[16] = *length;
            descriptor[17] = *decimal;
            bytes.extend_from_slice(&descriptor);
            offset += *length as u32;
        }
        bytes.push(0x0D);
        bytes.resize(header_length, 0);

        for (flag, fields) in &self.rows {
            bytes.push(*flag);
            for field in fields {
                bytes.extend_from_slice(field);
            }
        }
        bytes.push(0x1A);
        bytes
    }

    pub fn write(&self, path: &Path) -> PathBuf {
        fs::write(path, self.build()).expect("write table fixture");
        path.to_path_buf()
    }
}

/// Builds an FPT memo file; returns its bytes and the block pointer of each memo.
pub fn fpt_file(block_size: u16, memos: &[&[u8]]) -> (Vec<u8>, Vec<u32>) {
    let block = block_size as usize;
    let mut bytes = vec![0u8; 512usize.div_ceil(block) * block];
    let mut pointers = Vec::new();
    for memo in memos {
        pointers.push((bytes.len() / block) as u32);
        let mut entry = Vec::new();
        entry.extend_from_slice(&1u32.to_be_bytes());
        entry.extend_from_slice(&(memo.len() as u32).to_be_bytes());
        entry.extend_from_slice(memo);
        entry.resize(entry.len().div_ceil(block) * block, 0);
        bytes.extend_from_slice(&entry);
    }
    let next_block = (bytes.len() / block) as u32;
    bytes[0..4].copy_from_slice(&next_block.to_be_bytes());
    bytes[6..8].copy_from_slice(&block_size.to_be_bytes());
    (bytes, pointers)
}

/// Builds a dBase III memo file; returns its bytes and the block pointer of each memo.
pub fn dbt_file(memos: &[&[u8]]) -> (Vec<u8>, Vec<u32>) {
    let mut bytes = vec![0u8; 512];
    let mut pointers = Vec::new();
    for memo in memos {
        pointers.push((bytes.len() / 512) as u32);
        let mut entry = memo.to_vec();
        entry.extend_from_slice(&[0x1A, 0x1A]);
        entry.resize(entry.len().div_ceil(512) * 512, 0);
        bytes.extend_from_slice(&entry);
    }
    let next_block = (bytes.len() / 512) as u32;
    bytes[0..4].copy_from_slice(&next_block.to_le_bytes());
    (bytes, pointers)
}

/// Encodes a FoxPro date-time field.
pub fn datetime_field(julian_day: i32, milliseconds: i32) -> Vec<u8> {
    let mut bytes = julian_day.to_le_bytes().to_vec();
    bytes.extend_from_slice(&milliseconds.to_le_bytes());
    bytes
}

/// Right-aligns a memo pointer in a 10-byte dBase memo field.
pub fn pointer_field(pointer: u32) -> Vec<u8> {
    format!("{:>10}", pointer).into_bytes()
}
