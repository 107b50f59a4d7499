//! Record decoding: splitting a raw record into fields and casting them.

use encoding_rs::Encoding;
use log::trace;

use crate::dbf::memo::MemoResolver;
use crate::dbf::types::error::{DbfError, Result};
use crate::dbf::types::models::TableHeader;
use crate::dbf::types::value::{Record, Value};

/// Delete flag of a live record.
pub const ACTIVE_MARKER: u8 = b' ';

/// Delete flag of a deleted record.
pub const DELETED_MARKER: u8 = b'*';

/// Turns raw record bytes into a [`Record`].
///
/// Borrows the table's header and, when present, its memo store. Memo fields
/// are replaced by the resolved memo text; without a memo store they keep the
/// raw pointer text.
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder<'a> {
    header: &'a TableHeader,
    memo: Option<&'a MemoResolver>,
    encoding: &'static Encoding,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(header: &'a TableHeader, memo: Option<&'a MemoResolver>, encoding: &'static Encoding) -> Self {
        Self { header, memo, encoding }
    }

    /// Returns true if the raw record carries the deleted marker.
    ///
    /// Only `*` marks a deleted record; any other flag byte reads as active.
    ///
    /// # Errors
    /// Returns [`DbfError::InvalidFormat`] for an empty record.
    pub fn is_deleted(&self, raw: &[u8]) -> Result<bool> {
        match raw.first() {
            Some(&DELETED_MARKER) => Ok(true),
            Some(&ACTIVE_MARKER) => Ok(false),
            Some(other) => {
                trace!("Unusual delete flag {:#04x}, reading record as active", other);
                Ok(false)
            }
            None => Err(DbfError::InvalidFormat("Empty record".to_string())),
        }
    }

    /// Decodes one record, or returns `Ok(None)` if it is marked deleted.
    ///
    /// The record always has exactly one entry per column, in column order.
    pub fn decode(&self, raw: &[u8]) -> Result<Option<Record>> {
        if raw.len() != self.header.record_length as usize {
            return Err(DbfError::GeometryMismatch {
                declared: self.header.record_length as u64,
                computed: raw.len() as u64,
            });
        }
        if self.is_deleted(raw)? {
            trace!("Skipping deleted record");
            return Ok(None);
        }

        let mut record = Record::with_capacity(self.header.columns.len());
        for (index, column) in self.header.columns.iter().enumerate() {
            let range = self.header.field_range(index).ok_or_else(|| {
                DbfError::InvalidFormat(format!("Column {} has no offset", column.name()))
            })?;
            let field = raw.get(range).ok_or_else(|| {
                DbfError::InvalidFormat(format!("Column {} lies outside the record", column.name()))
            })?;

            let value = match self.memo {
                Some(memo) if column.is_memo() => self.resolve_memo(memo, column.memo_pointer(field))?,
                _ => column.type_cast_with(field, self.encoding),
            };
            record.push(column.name(), value);
        }

        Ok(Some(record))
    }

    fn resolve_memo(&self, memo: &MemoResolver, pointer: Option<u32>) -> Result<Option<Value>> {
        match pointer {
            Some(pointer) => Ok(memo.resolve(pointer)?.map(Value::Text)),
            None => Ok(None),
        }
    }
}
