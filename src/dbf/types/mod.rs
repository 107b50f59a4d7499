//! Foundational data structures, error types, and field values.

pub mod error;
pub mod models;
pub mod value;
