//! Memo store access (`.dbt` and `.fpt` companion files).
//!
//! Memo columns hold only a block number; the text lives in a separate file
//! laid out in fixed-size blocks. Two layouts are supported:
//!
//! - **DBT** (dBase): 512-byte blocks. dBase III memos run across blocks until
//!   a `0x1A` marker; dBase IV memos start with `FF FF 08 00` and a
//!   little-endian length that includes the 8-byte block header.
//! - **FPT** (FoxPro): the block size is stored big-endian in bytes 6-7 of the
//!   file header. Each memo starts with a big-endian type (`1` = text) and a
//!   big-endian payload length.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use encoding_rs::{Encoding, WINDOWS_1252};
use log::{debug, info, trace, warn};

use super::types::error::{DbfError, Result};
use super::types::models::MemoFormat;

/// Block size of the dBase layout.
pub const DBT_BLOCK_SIZE: u64 = 512;

const DBT_TERMINATOR: u8 = 0x1A;
const DBT_IV_SIGNATURE: [u8; 4] = [0xFF, 0xFF, 0x08, 0x00];
const MEMO_BLOCK_HEADER_SIZE: u64 = 8;
const FPT_HEADER_SIZE: usize = 8;
const FPT_TEXT_MEMO: u32 = 1;

/// Resolves memo pointers against a companion memo file.
///
/// Owns an exclusive handle to the memo file for its whole lifetime. Reads go
/// through a `RefCell`, so a resolver is not shareable across threads; open a
/// separate resolver per thread instead.
#[derive(Debug)]
pub struct MemoResolver {
    path: PathBuf,
    file: RefCell<File>,
    file_len: u64,
    format: MemoFormat,
    block_size: u64,
    next_available_block: u32,
    encoding: &'static Encoding,
}

impl MemoResolver {
    /// Opens a memo file, picking the layout from its extension.
    ///
    /// # Errors
    /// - [`DbfError::UnsupportedMemo`] if the extension is neither `dbt` nor `fpt`
    /// - [`DbfError::InvalidFormat`] if the memo header is truncated or declares
    ///   a zero block size
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MemoFormat::from_extension)
            .ok_or_else(|| DbfError::UnsupportedMemo(path.display().to_string()))?;

        info!("Opening {} memo file: {}", format, path.display());
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let (next_available_block, block_size) = match format {
            MemoFormat::Fpt => {
                let mut header = [0u8; FPT_HEADER_SIZE];
                read_memo_header(&mut file, &mut header)?;
                let block_size = BigEndian::read_u16(&header[6..8]) as u64;
                if block_size == 0 {
                    return Err(DbfError::InvalidFormat(
                        "FPT memo header declares a zero block size".to_string(),
                    ));
                }
                (BigEndian::read_u32(&header[0..4]), block_size)
            }
            MemoFormat::Dbt => {
                let mut header = [0u8; 4];
                read_memo_header(&mut file, &mut header)?;
                (LittleEndian::read_u32(&header), DBT_BLOCK_SIZE)
            }
        };

        debug!(
            "Memo header: block_size={}, next_available_block={}, file={} bytes",
            block_size, next_available_block, file_len
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: RefCell::new(file),
            file_len,
            format,
            block_size,
            next_available_block,
            encoding: WINDOWS_1252,
        })
    }

    /// Sets the encoding used to decode memo text.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn format(&self) -> MemoFormat {
        self.format
    }

    /// Size in bytes of one memo block.
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// First free block according to the memo header.
    pub fn next_available_block(&self) -> u32 {
        self.next_available_block
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a block pointer to the memo text.
    ///
    /// Returns `Ok(None)` for a zero pointer, a pointer past the end of the
    /// file, a non-text FoxPro memo, or a memo that is empty once trailing
    /// padding is stripped. Only genuine I/O failures are errors.
    pub fn resolve(&self, pointer: u32) -> Result<Option<String>> {
        if pointer == 0 {
            return Ok(None);
        }

        let offset = pointer as u64 * self.block_size;
        if offset >= self.file_len {
            debug!("Memo pointer {} lies beyond the end of {}", pointer, self.path.display());
            return Ok(None);
        }

        trace!("Resolving {} memo block {} at offset {}", self.format, pointer, offset);
        let bytes = match self.format {
            MemoFormat::Dbt => self.read_dbt(offset)?,
            MemoFormat::Fpt => self.read_fpt(offset)?,
        };

        Ok(bytes.and_then(|bytes| {
            let (text, _) = self.encoding.decode_without_bom_handling(&bytes);
            let text = text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
            (!text.is_empty()).then(|| text.to_owned())
        }))
    }

    fn read_fpt(&self, offset: u64) -> Result<Option<Vec<u8>>> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;

        let mut block_header = [0u8; MEMO_BLOCK_HEADER_SIZE as usize];
        if eof_as_none(file.read_exact(&mut block_header))?.is_none() {
            return Ok(None);
        }
        let memo_type = BigEndian::read_u32(&block_header[0..4]);
        let length = BigEndian::read_u32(&block_header[4..8]) as u64;

        if memo_type != FPT_TEXT_MEMO {
            trace!("Skipping non-text FPT memo (type {}) at offset {}", memo_type, offset);
            return Ok(None);
        }
        self.read_payload(&mut file, offset + MEMO_BLOCK_HEADER_SIZE, length)
    }

    fn read_dbt(&self, offset: u64) -> Result<Option<Vec<u8>>> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;

        let mut block = Vec::with_capacity(self.block_size as usize);
        (&mut *file).take(self.block_size).read_to_end(&mut block)?;

        if block.starts_with(&DBT_IV_SIGNATURE) && block.len() >= MEMO_BLOCK_HEADER_SIZE as usize {
            let length = (LittleEndian::read_u32(&block[4..8]) as u64).saturating_sub(MEMO_BLOCK_HEADER_SIZE);
            return self.read_payload(&mut file, offset + MEMO_BLOCK_HEADER_SIZE, length);
        }

        let mut memo = Vec::new();
        loop {
            if let Some(end) = block.iter().position(|&byte| byte == DBT_TERMINATOR) {
                memo.extend_from_slice(&block[..end]);
                break;
            }
            memo.extend_from_slice(&block);
            if (block.len() as u64) < self.block_size {
                break;
            }
            block.clear();
            (&mut *file).take(self.block_size).read_to_end(&mut block)?;
            if block.is_empty() {
                break;
            }
        }
        Ok(Some(memo))
    }

    /// Reads a length-prefixed payload, treating one that overruns the file as dangling.
    fn read_payload(&self, file: &mut File, start: u64, length: u64) -> Result<Option<Vec<u8>>> {
        if length == 0 {
            return Ok(None);
        }
        if start + length > self.file_len {
            warn!(
                "Memo at offset {} declares {} bytes, past the end of {}",
                start,
                length,
                self.path.display()
            );
            return Ok(None);
        }

        file.seek(SeekFrom::Start(start))?;
        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;
        Ok(Some(payload))
    }
}

fn read_memo_header(file: &mut File, buf: &mut [u8]) -> Result<()> {
    file.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DbfError::InvalidFormat("Memo header is truncated".to_string()),
        _ => DbfError::Io(e),
    })
}

fn eof_as_none<T>(result: io::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}
