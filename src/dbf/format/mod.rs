//! File format parsing layer for table files.
//!
//! This module bridges raw file I/O and the high-level
//! [`TableReader`](crate::dbf::reader::TableReader).
//!
//! # Module Organization
//!
//! - [`header`]: Parses the fixed header and the column descriptor array
//! - [`record`]: Splits fixed-width records into typed fields
//!
//! # Architecture
//!
//! ```text
//! File Structure:
//! ┌─────────────────┐
//! │  Fixed Header   │ ← header::parse()
//! ├─────────────────┤
//! │  Column         │
//! │  Descriptors    │
//! │  (0x0D ends)    │
//! ├─────────────────┤
//! │  Records        │ ← record::RecordDecoder::decode()
//! │  (fixed width,  │      └─ memo fields → MemoResolver
//! │   delete flag)  │
//! └─────────────────┘
//! ```

pub mod header;
pub mod record;
