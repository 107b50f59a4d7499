//! Sequential access to table records.
//!
//! # Example
//! ```no_run
//! # use dbf_reader::TableReader;
//! # let table = TableReader::open("customers.dbf").unwrap();
//! for result in table.iter_records() {
//!     let record = result.unwrap();
//!     println!("{:?}", record.get("NAME"));
//! }
//! ```

use super::reader::TableReader;
use super::types::error::Result;
use super::types::value::Record;

/// Iterator over the live records of a table, in file order.
///
/// Deleted rows are skipped. The iterator stops after the first error.
///
/// Created by [`TableReader::iter_records()`](crate::TableReader::iter_records).
#[derive(Debug)]
pub struct RecordIterator<'a> {
    reader: &'a TableReader,
    index: u32,
}

impl<'a> RecordIterator<'a> {
    pub(super) fn new(reader: &'a TableReader) -> Self {
        Self { reader, index: 0 }
    }
}

impl<'a> Iterator for RecordIterator<'a> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let count = self.reader.record_count();
        while self.index < count {
            let index = self.index;
            self.index += 1;

            match self.reader.record(index) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => {
                    self.index = count;
                    return Some(Err(e));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.record_count().saturating_sub(self.index) as usize;
        (0, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a TableReader {
    type Item = Result<Record>;
    type IntoIter = RecordIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_records()
    }
}
