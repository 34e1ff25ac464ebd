//! # bsxdmp
//!
//! `bsxdmp` calls differentially methylated positions (DMPs) between every
//! pair of samples from per-position allC methylation calls.
//!
//! The computation is organised as a checkpointed pipeline. Every stage
//! writes its output into a single-file [`CheckpointStore`] and checks for
//! that output before doing any work, so an interrupted run can simply be
//! started again against the same store and picks up where it stopped.
//!
//! ## Stages
//!
//! 1. **Ingestion**: allC files of all samples are read and unioned into one
//!    table ([`tools::dmp::ingest`]).
//! 2. **Filtering**: per chromosome, positions which are unmethylated in
//!    every sample are dropped ([`tools::dmp::filter`]).
//! 3. **Pairwise testing**: for each chromosome and each pair of samples,
//!    shared positions are tested with a two-sided Fisher exact test
//!    ([`tools::dmp::pairwise`]). Each (chromosome, pair) result is cached on
//!    its own.
//! 4. **Aggregation**: all pair results are unioned
//!    ([`tools::dmp::aggregate`]).
//! 5. **Correction & summary**: Benjamini-Hochberg adjustment over the whole
//!    result population and DMP counts per pair ([`tools::dmp::correct`]).
//!
//! ## Usage
//!
//! ```no_run
//! use bsxdmp::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = DmpConfig::new("path/to/allc", vec!["WT".into(), "mut".into()])
//!         .with_out_id("wt_vs_mut".into())
//!         .with_min_coverage(Some(3))
//!         .with_n_threads(4);
//!
//!     let report = run_pipeline(&config)?;
//!     for pair in report.summary() {
//!         println!("{} vs {}: {} DMPs", pair.sample_x, pair.sample_y, pair.dmp_count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Tables inside the store are `polars` DataFrames, encoded as Arrow IPC.

pub mod data_structs;
pub mod error;
pub mod exports;
pub mod io;
pub mod prelude;
pub mod store;
pub mod tools;
pub mod utils;

pub use error::DmpError;
pub use store::{
    CheckpointStore,
    StoreKey,
};
