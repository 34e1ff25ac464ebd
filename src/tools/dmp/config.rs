use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;

use crate::data_structs::typedef::CountType;
use crate::error::DmpError;

/// Chromosomes tested when none are given.
pub const DEFAULT_CHROMOSOMES: [&str; 5] = ["Chr1", "Chr2", "Chr3", "Chr4", "Chr5"];
pub const DEFAULT_FDR: f64 = 0.05;
pub const DEFAULT_OUT_ID: &str = "out";

/// Parameters of a DMP run.
///
/// ```
/// use bsxdmp::prelude::*;
///
/// let config = DmpConfig::new("allc", vec!["WT".into(), "mut".into()])
///     .with_fdr(0.01)
///     .with_chromosomes(vec!["Chr1".into()]);
/// assert_eq!(config.sample_pairs(), vec![("WT", "mut")]);
/// assert!(config.store_path().ends_with("store_out.bsxdmp"));
/// ```
#[derive(Debug, Clone)]
pub struct DmpConfig {
    allc_dir:     PathBuf,
    samples:      Vec<String>,
    out_id:       String,
    out_dir:      PathBuf,
    min_coverage: Option<CountType>,
    chromosomes:  Vec<String>,
    fdr:          f64,
    n_threads:    usize,
}

impl Default for DmpConfig {
    fn default() -> Self {
        Self {
            allc_dir:     PathBuf::from("."),
            samples:      Vec::new(),
            out_id:       DEFAULT_OUT_ID.to_string(),
            out_dir:      PathBuf::from("."),
            min_coverage: None,
            chromosomes:  DEFAULT_CHROMOSOMES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            fdr:          DEFAULT_FDR,
            n_threads:    1,
        }
    }
}

impl DmpConfig {
    pub fn new<P: Into<PathBuf>>(
        allc_dir: P,
        samples: Vec<String>,
    ) -> Self {
        Self {
            allc_dir: allc_dir.into(),
            samples,
            ..Default::default()
        }
    }

    crate::getter_fn!(allc_dir, PathBuf);

    crate::getter_fn!(samples, Vec<String>);

    crate::getter_fn!(out_id, String);

    crate::getter_fn!(out_dir, PathBuf);

    crate::getter_fn!(min_coverage, Option<CountType>);

    crate::getter_fn!(chromosomes, Vec<String>);

    crate::getter_fn!(fdr, f64);

    crate::getter_fn!(n_threads, usize);

    crate::with_field_fn!(out_id, String);

    crate::with_field_fn!(out_dir, PathBuf);

    crate::with_field_fn!(min_coverage, Option<CountType>);

    crate::with_field_fn!(chromosomes, Vec<String>);

    crate::with_field_fn!(fdr, f64);

    crate::with_field_fn!(n_threads, usize);

    /// Checks the parameters before any file is touched.
    pub fn validate(&self) -> Result<()> {
        if self.samples.len() < 2 {
            return Err(DmpError::config(format!(
                "at least 2 samples are required, got {}",
                self.samples.len()
            ))
            .into());
        }
        if let Some(dup) = self.samples.iter().duplicates().next() {
            return Err(DmpError::config(format!("sample {:?} is given twice", dup)).into());
        }
        if self.samples.iter().any(|s| s.is_empty()) {
            return Err(DmpError::config("sample labels must not be empty").into());
        }
        if !self.allc_dir.is_dir() {
            return Err(DmpError::config(format!(
                "allC directory {:?} does not exist or is not a directory",
                self.allc_dir
            ))
            .into());
        }
        if !(self.fdr > 0.0 && self.fdr <= 1.0) {
            return Err(DmpError::config(format!(
                "FDR threshold must be in (0, 1], got {}",
                self.fdr
            ))
            .into());
        }
        if self.chromosomes.is_empty() || self.chromosomes.iter().any(|c| c.is_empty()) {
            return Err(DmpError::config("chromosome list must not be empty").into());
        }
        if let Some(dup) = self.chromosomes.iter().duplicates().next() {
            return Err(
                DmpError::config(format!("chromosome {:?} is given twice", dup)).into(),
            );
        }
        if self.out_id.is_empty() {
            return Err(DmpError::config("output identifier must not be empty").into());
        }
        if self.min_coverage == Some(0) {
            return Err(DmpError::config("minimum coverage must be positive").into());
        }
        Ok(())
    }

    /// Every unordered pair of samples, with `x` before `y` in input order.
    pub fn sample_pairs(&self) -> Vec<(&str, &str)> {
        self.samples
            .iter()
            .map(String::as_str)
            .tuple_combinations()
            .collect()
    }

    pub fn store_path(&self) -> PathBuf {
        self.out_dir
            .join(format!("store_{}.bsxdmp", self.out_id))
    }

    /// Position-level result file.
    pub fn dmps_path(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}_fisher_dmps.tsv", self.out_id))
    }

    /// Pair-level result file.
    pub fn summary_path(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}_fisher_dmps_diff.tsv", self.out_id))
    }
}
