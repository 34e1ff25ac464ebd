//! Checkpointed DMP calling.
//!
//! Each stage is a function taking the run's [`CheckpointStore`] and
//! [`DmpConfig`]. A stage first checks whether its output table is already
//! in the store and returns [`StageOutcome::Skipped`] if so.
//!
//! [`CheckpointStore`]: crate::store::CheckpointStore

pub mod aggregate;
mod config;
pub mod correct;
pub mod filter;
pub mod ingest;
pub mod pairwise;
mod pipeline;
#[cfg(test)]
mod testing;

use std::fmt::Display;

pub use config::{
    DmpConfig,
    DEFAULT_CHROMOSOMES,
    DEFAULT_FDR,
    DEFAULT_OUT_ID,
};
pub use pipeline::{
    run_pipeline,
    run_stages,
    DmpReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Output was already present in the store.
    Skipped,
    /// Stage ran and wrote `rows` rows.
    Completed { rows: usize },
}

impl StageOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped)
    }

    /// Rows written, zero if skipped.
    pub fn rows(&self) -> usize {
        match self {
            StageOutcome::Skipped => 0,
            StageOutcome::Completed { rows } => *rows,
        }
    }
}

impl Display for StageOutcome {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            StageOutcome::Skipped => write!(f, "skipped"),
            StageOutcome::Completed { rows } => write!(f, "completed ({} rows)", rows),
        }
    }
}
