use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use encoding_rs::Encoding;
use log::{debug, info, trace, warn};

use super::column::ColumnDescriptor;
use super::format;
use super::format::record::RecordDecoder;
use super::iter::RecordIterator;
use super::memo::MemoResolver;
use super::types::error::{DbfError, Result};
use super::types::models::{MemoFormat, TableHeader, TableVersion};
use super::types::value::Record;
use super::utils;

/// The main reader for dBase and FoxPro table files.
///
/// Parses the header once at open time and then serves records on demand,
/// either sequentially through [`TableReader::iter_records`] or by index
/// through [`TableReader::record`]. Both take `&self` and can be interleaved.
///
/// The reader owns one handle to the table file and, for dialects with memo
/// support, a [`MemoResolver`] with its own handle. Both are released on drop.
#[derive(Debug)]
pub struct TableReader {
    path: PathBuf,
    file: RefCell<File>,
    header: TableHeader,
    memo: Option<MemoResolver>,
    encoding: &'static Encoding,
}

impl TableReader {
    /// Opens a table file, detecting its text encoding from the header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(path, None)
    }

    /// Opens a table file.
    ///
    /// Priority for determining text encoding (highest → lowest):
    /// 1. `user_encoding` (an explicit WHATWG label such as `"cp1251"` or `"utf-8"`)
    /// 2. The language driver byte in the table header
    /// 3. Windows-1252
    ///
    /// If the dialect supports memos, the memo file is looked up next to the
    /// table with the same base name. A missing memo file is not an error:
    /// memo columns then yield their raw block pointers.
    ///
    /// # Errors
    /// Returns an error if:
    /// - File cannot be opened
    /// - The header is truncated or malformed, or the version is unsupported
    /// - A column is invalid or the columns do not match the record length
    /// - The file is shorter than the header's record count implies
    pub fn new(path: impl AsRef<Path>, user_encoding: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening table file: {}", path.display());
        let mut file = File::open(path)?;

        let header = format::header::parse(&mut file)?;

        let found = file.metadata()?.len();
        let expected = header.expected_file_size();
        if found < expected {
            return Err(DbfError::Truncated { expected, found });
        }

        let encoding = utils::resolve_encoding(user_encoding, header.language_driver);
        debug!("Text encoding: {}", encoding.name());

        let memo = match header.version.memo_format(header.table_flags) {
            Some(memo_format) => match find_memo_file(path, memo_format) {
                Some(memo_path) => Some(MemoResolver::open(memo_path)?.with_encoding(encoding)),
                None => {
                    warn!(
                        "Table {} declares a {} memo file, but none was found",
                        path.display(),
                        memo_format
                    );
                    None
                }
            },
            None => None,
        };

        info!(
            "Table opened: version {} ({}), {} records, {} columns, memo={}",
            header.version,
            header.version.description(),
            header.record_count,
            header.columns.len(),
            memo.as_ref().map_or("none".to_string(), |m| m.format().to_string())
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: RefCell::new(file),
            header,
            memo,
            encoding,
        })
    }

    pub fn version(&self) -> TableVersion {
        self.header.version
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.header.columns
    }

    /// Finds a column by name, ignoring ASCII case.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.header.columns.iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// The memo store, if the dialect has one and it was found.
    pub fn memo(&self) -> Option<&MemoResolver> {
        self.memo.as_ref()
    }

    /// Number of records in the file, deleted ones included.
    pub fn record_count(&self) -> u32 {
        self.header.record_count
    }

    pub fn last_update(&self) -> Option<NaiveDate> {
        self.header.last_update
    }

    /// The encoding used for character and memo text.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema definitions of every column, one per line.
    pub fn schema(&self) -> String {
        self.header.columns.iter().map(ColumnDescriptor::schema_definition).collect()
    }

    /// Returns an iterator over all live records in file order.
    pub fn iter_records(&self) -> RecordIterator<'_> {
        RecordIterator::new(self)
    }

    /// Reads every live record into memory.
    ///
    /// **Warning:** loads the whole table. Prefer [`TableReader::iter_records`]
    /// for large files.
    pub fn records(&self) -> Result<Vec<Record>> {
        self.iter_records().collect()
    }

    /// Returns the first live record matching `predicate`.
    pub fn find<F>(&self, mut predicate: F) -> Result<Option<Record>>
    where
        F: FnMut(&Record) -> bool,
    {
        for record in self.iter_records() {
            let record = record?;
            if predicate(&record) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Reads and decodes the record at `index` (random access).
    ///
    /// Returns `Ok(None)` if the record is marked deleted.
    ///
    /// # Errors
    /// Returns [`DbfError::RecordOutOfRange`] if `index` is not below
    /// [`TableReader::record_count`].
    pub fn record(&self, index: u32) -> Result<Option<Record>> {
        let raw = self.read_raw_record(index)?;
        self.decoder().decode(&raw)
    }

    /// Reads the undecoded bytes of the record at `index`, delete flag included.
    pub fn read_raw_record(&self, index: u32) -> Result<Vec<u8>> {
        if index >= self.header.record_count {
            return Err(DbfError::RecordOutOfRange {
                index,
                count: self.header.record_count,
            });
        }

        let offset = self.header.record_offset(index);
        trace!("Reading record {} at offset {}", index, offset);

        let mut raw = vec![0u8; self.header.record_length as usize];
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut raw)?;
        Ok(raw)
    }

    /// A decoder bound to this table's header, memo store and encoding.
    pub fn decoder(&self) -> RecordDecoder<'_> {
        RecordDecoder::new(&self.header, self.memo.as_ref(), self.encoding)
    }
}

/// Looks for the memo file next to `table_path`, trying the lower-case then
/// the upper-case extension.
fn find_memo_file(table_path: &Path, memo_format: MemoFormat) -> Option<PathBuf> {
    let extension = memo_format.extension();
    [extension.to_string(), extension.to_ascii_uppercase()]
        .iter()
        .map(|ext| table_path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}
