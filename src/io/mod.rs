//! File input and output.
//!
//! - [`allc`]: reading per-sample allC methylation calls.
//! - [`report`]: writing the position-level and pair-level result tables.

pub mod allc;
pub mod report;
