use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions of a DMP run.
///
/// Functions of this crate return [`anyhow::Result`]; these variants are
/// carried inside the [`anyhow::Error`] and can be recovered with
/// `err.downcast_ref::<DmpError>()`.
#[derive(Error, Debug)]
pub enum DmpError {
    /// Invalid run parameters. Raised before any work is done.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Per-sample input file is absent or unreadable.
    #[error("Cannot access input file {path:?}: {source}")]
    FileAccess {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two structures which should align do not.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A stage expected a table which is not present in the store.
    #[error("Checkpoint {0} is missing from the store")]
    MissingCheckpoint(String),

    /// The store file can not be interpreted.
    #[error("Store file {path:?} is corrupted: {reason}")]
    CorruptStore { path: PathBuf, reason: String },
}

impl DmpError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    pub fn schema<S: Into<String>>(message: S) -> Self {
        Self::SchemaMismatch(message.into())
    }
}
