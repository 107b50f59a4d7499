//! Column descriptors and per-type field casting.
//!
//! A [`ColumnDescriptor`] is built once per column while the table header is
//! parsed. It owns the rules for turning a raw fixed-width field into a typed
//! [`Value`]. Casting never fails hard: a field that cannot be decoded yields
//! `None` so a single bad row does not abort a scan.

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use encoding_rs::{Encoding, WINDOWS_1252};
use regex::Regex;

use super::types::error::{DbfError, Result};
use super::types::value::Value;

/// Julian day number of 0000-12-31, the day before chrono's first CE day.
const JULIAN_DAY_CE_OFFSET: i32 = 1_721_425;

const MILLISECONDS_PER_DAY: i32 = 86_400_000;

/// Compiled regex for splitting camel-case words in column names.
static CAMEL_BOUNDARY: OnceLock<Regex> = OnceLock::new();

fn camel_boundary_regex() -> &'static Regex {
    CAMEL_BOUNDARY.get_or_init(|| Regex::new(r"([a-z\d])([A-Z])").expect("Invalid camel-case regex pattern"))
}

/// The type tag of a column.
///
/// Unknown tags are kept as [`ColumnType::Other`] and cast as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// `N`: ASCII number, integer or decimal depending on the decimal count.
    Number,
    /// `F`: ASCII floating point number.
    Float,
    /// `I`: little-endian 32-bit signed integer.
    Integer,
    /// `L`: single-byte logical.
    Logical,
    /// `T`: FoxPro binary date-time.
    DateTime,
    /// `D`: `YYYYMMDD` date.
    Date,
    /// `M`: pointer into the memo store.
    Memo,
    /// `C`: fixed-width character data.
    Character,
    Other(u8),
}

impl ColumnType {
    /// The single-character tag stored in the header.
    pub fn tag(&self) -> char {
        match self {
            ColumnType::Number => 'N',
            ColumnType::Float => 'F',
            ColumnType::Integer => 'I',
            ColumnType::Logical => 'L',
            ColumnType::DateTime => 'T',
            ColumnType::Date => 'D',
            ColumnType::Memo => 'M',
            ColumnType::Character => 'C',
            ColumnType::Other(tag) => *tag as char,
        }
    }
}

impl From<u8> for ColumnType {
    fn from(tag: u8) -> Self {
        match tag {
            b'N' => ColumnType::Number,
            b'F' => ColumnType::Float,
            b'I' => ColumnType::Integer,
            b'L' => ColumnType::Logical,
            b'T' => ColumnType::DateTime,
            b'D' => ColumnType::Date,
            b'M' => ColumnType::Memo,
            b'C' => ColumnType::Character,
            other => ColumnType::Other(other),
        }
    }
}

impl From<char> for ColumnType {
    fn from(tag: char) -> Self {
        if tag.is_ascii() {
            ColumnType::from(tag as u8)
        } else {
            ColumnType::Other(b'?')
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Immutable description of one table column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    name: String,
    column_type: ColumnType,
    length: usize,
    decimal: u8,
}

impl ColumnDescriptor {
    /// Builds and validates a column.
    ///
    /// The name is truncated at the first NUL byte and stripped of anything
    /// outside printable ASCII.
    ///
    /// # Errors
    /// - [`DbfError::ColumnLength`] if `length` is zero or negative
    /// - [`DbfError::ColumnName`] if nothing is left of the name after sanitizing
    pub fn new(
        name: impl AsRef<[u8]>,
        column_type: impl Into<ColumnType>,
        length: i32,
        decimal: u8,
    ) -> Result<Self> {
        if length <= 0 {
            return Err(DbfError::ColumnLength(length));
        }

        let name = sanitize_name(name.as_ref());
        if name.is_empty() {
            return Err(DbfError::ColumnName);
        }

        Ok(Self {
            name,
            column_type: column_type.into(),
            length: length as usize,
            decimal,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Width of the field in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn decimal(&self) -> u8 {
        self.decimal
    }

    pub fn is_memo(&self) -> bool {
        self.column_type == ColumnType::Memo
    }

    /// Casts a raw field to a typed value, decoding text as Windows-1252.
    pub fn type_cast(&self, raw: &[u8]) -> Option<Value> {
        self.type_cast_with(raw, WINDOWS_1252)
    }

    /// Casts a raw field to a typed value using `encoding` for text columns.
    ///
    /// Memo columns yield the pointer as text; the record decoder swaps in the
    /// resolved memo when a memo store is attached.
    pub fn type_cast_with(&self, raw: &[u8], encoding: &'static Encoding) -> Option<Value> {
        match self.column_type {
            ColumnType::Number if self.decimal == 0 => decode_integer_text(raw).map(Value::Integer),
            ColumnType::Number | ColumnType::Float => decode_float_text(raw).map(Value::Float),
            ColumnType::Integer => decode_binary_integer(raw).map(Value::Integer),
            ColumnType::Logical => Some(Value::Boolean(decode_logical(raw))),
            ColumnType::DateTime => decode_datetime(raw).map(Value::DateTime),
            ColumnType::Date => decode_date(raw).map(Value::Date),
            ColumnType::Memo => Some(Value::Text(self.memo_pointer_text(raw, encoding))),
            ColumnType::Character | ColumnType::Other(_) => Some(Value::Text(decode_text(raw, encoding).into_owned())),
        }
    }

    /// Extracts the memo block pointer from a memo field.
    ///
    /// dBase stores the pointer as space-padded ASCII digits; Visual FoxPro
    /// uses a 4-byte little-endian integer. Blank and zero pointers mean the
    /// row has no memo.
    pub fn memo_pointer(&self, raw: &[u8]) -> Option<u32> {
        if !self.is_memo() {
            return None;
        }
        let pointer = if is_binary_pointer(raw) {
            LittleEndian::read_u32(raw)
        } else {
            std::str::from_utf8(raw).ok()?.trim().parse::<u32>().ok()?
        };
        (pointer > 0).then_some(pointer)
    }

    fn memo_pointer_text(&self, raw: &[u8], encoding: &'static Encoding) -> String {
        if is_binary_pointer(raw) {
            LittleEndian::read_u32(raw).to_string()
        } else {
            decode_text(raw, encoding).into_owned()
        }
    }

    /// Returns true if `value` has the runtime type this column casts to.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self.column_type, value) {
            (ColumnType::Number, Value::Integer(_)) => self.decimal == 0,
            (ColumnType::Number, Value::Float(_)) => self.decimal > 0,
            (ColumnType::Float, Value::Float(_)) => true,
            (ColumnType::Integer, Value::Integer(_)) => true,
            (ColumnType::Logical, Value::Boolean(_)) => true,
            (ColumnType::DateTime, Value::DateTime(_)) => true,
            (ColumnType::Date, Value::Date(_)) => true,
            (ColumnType::Memo | ColumnType::Character | ColumnType::Other(_), Value::Text(_)) => true,
            _ => false,
        }
    }

    /// Describes the column for a downstream schema, e.g.
    /// `"column_name", :integer\n` or `"title", :string, :limit => 20\n`.
    pub fn schema_definition(&self) -> String {
        format!("\"{}\", {}\n", self.underscored_name(), self.schema_data_type())
    }

    /// The column name in lower snake case.
    pub fn underscored_name(&self) -> String {
        camel_boundary_regex()
            .replace_all(&self.name, "${1}_${2}")
            .replace('-', "_")
            .to_lowercase()
    }

    fn schema_data_type(&self) -> String {
        match self.column_type {
            ColumnType::Number if self.decimal > 0 => ":float".to_string(),
            ColumnType::Number | ColumnType::Integer => ":integer".to_string(),
            ColumnType::Float => ":float".to_string(),
            ColumnType::Date => ":date".to_string(),
            ColumnType::DateTime => ":datetime".to_string(),
            ColumnType::Logical => ":boolean".to_string(),
            ColumnType::Memo => ":text".to_string(),
            ColumnType::Character | ColumnType::Other(_) => format!(":string, :limit => {}", self.length),
        }
    }
}

/// Keeps printable ASCII up to the first NUL.
fn sanitize_name(raw: &[u8]) -> String {
    raw.iter()
        .take_while(|&&byte| byte != 0)
        .filter(|byte| (0x20..=0x7E).contains(*byte))
        .map(|&byte| byte as char)
        .collect()
}

/// A 4-byte memo field holding anything but digits and spaces is a binary pointer.
fn is_binary_pointer(raw: &[u8]) -> bool {
    raw.len() == 4 && !raw.iter().all(|byte| byte.is_ascii_digit() || *byte == b' ')
}

fn decode_text<'a>(raw: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    let decoded = encoding.decode_without_bom_handling(raw).0;
    let trimmed = decoded.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if trimmed.len() == decoded.len() {
        decoded
    } else {
        Cow::Owned(trimmed.to_owned())
    }
}

fn numeric_text(raw: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(raw).ok()?.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!text.is_empty()).then_some(text)
}

fn decode_integer_text(raw: &[u8]) -> Option<i64> {
    let text = numeric_text(raw)?;
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(|value| value.trunc() as i64)
    })
}

fn decode_float_text(raw: &[u8]) -> Option<f64> {
    numeric_text(raw)?.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn decode_binary_integer(raw: &[u8]) -> Option<i64> {
    raw.get(..4).map(|bytes| LittleEndian::read_i32(bytes) as i64)
}

fn decode_logical(raw: &[u8]) -> bool {
    matches!(raw.trim_ascii(), [b'y' | b'Y' | b't' | b'T'])
}

/// Decodes a FoxPro date-time: a Julian day number followed by milliseconds
/// since midnight, both little-endian `i32`.
fn decode_datetime(raw: &[u8]) -> Option<DateTime<Utc>> {
    let bytes = raw.get(..8)?;
    let julian_day = LittleEndian::read_i32(&bytes[0..4]);
    let milliseconds = LittleEndian::read_i32(&bytes[4..8]);
    if julian_day == 0 && milliseconds == 0 {
        return None;
    }
    if !(0..MILLISECONDS_PER_DAY).contains(&milliseconds) {
        return None;
    }

    let date = NaiveDate::from_num_days_from_ce_opt(julian_day.checked_sub(JULIAN_DAY_CE_OFFSET)?)?;
    // Whole seconds only, FoxPro keeps no sub-second precision.
    let time = NaiveTime::from_num_seconds_from_midnight_opt((milliseconds / 1000) as u32, 0)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/// Decodes a `YYYYMMDD` date, reading spaces as zeros.
pub(crate) fn decode_date(raw: &[u8]) -> Option<NaiveDate> {
    let text = std::str::from_utf8(raw).ok()?;
    if text.trim().is_empty() {
        return None;
    }

    let digits = text.replace(' ', "0");
    if digits.len() != 8 || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let year = digits[0..4].parse::<i32>().ok()?;
    let month = digits[4..6].parse::<u32>().ok()?;
    let day = digits[6..8].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
