//! Data structures shared by the pipeline stages.
//!
//! - [`MethylationRecord`]: a single allC call of one sample, together with
//!   the [`AllcColumns`] schema of the tables built from such records.
//! - [`PairColumns`]: schema of per-pair Fisher test results and of the
//!   combined result table.
//! - [`PairSummary`]: number of DMPs found for a sample pair.
//! - [`typedef`]: type aliases for positions, counts and p-values.

mod record;
mod result;
pub mod typedef;

pub use record::{
    records_to_frame,
    AllcColumns,
    MethylationRecord,
};
pub use result::{
    PairColumns,
    PairSummary,
};
