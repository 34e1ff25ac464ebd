use std::path::PathBuf;

use anyhow::Result;
use log::*;

use super::aggregate::aggregate;
use super::correct::{
    correct,
    summarize,
};
use super::filter::filter;
use super::ingest::ingest;
use super::pairwise::pairwise_tests;
use super::{
    DmpConfig,
    StageOutcome,
};
use crate::data_structs::PairSummary;
use crate::io::report::{
    adjusted_rows,
    write_dmps,
    write_summary,
    RunHeader,
};
use crate::store::{
    CheckpointStore,
    Stage,
    StoreKey,
};

/// Result of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct DmpReport {
    stages:         Vec<(Stage, StageOutcome)>,
    tests_computed: usize,
    summary:        Vec<PairSummary>,
    store_path:     PathBuf,
    dmps_path:      PathBuf,
    summary_path:   PathBuf,
}

impl DmpReport {
    crate::getter_fn!(stages, Vec<(Stage, StageOutcome)>);

    crate::getter_fn!(tests_computed, usize);

    crate::getter_fn!(summary, Vec<PairSummary>);

    crate::getter_fn!(store_path, PathBuf);

    crate::getter_fn!(dmps_path, PathBuf);

    crate::getter_fn!(summary_path, PathBuf);

    pub fn outcome(
        &self,
        stage: Stage,
    ) -> Option<StageOutcome> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, outcome)| *outcome)
    }

    /// True if every stage found its output in the store.
    pub fn all_skipped(&self) -> bool {
        self.stages
            .iter()
            .all(|(_, outcome)| outcome.is_skipped())
    }

    pub fn total_dmps(&self) -> usize {
        self.summary
            .iter()
            .map(|p| p.dmp_count)
            .sum()
    }
}

/// Runs every stage in order against an open store.
///
/// Once the combined table exists, the stages producing its inputs are
/// skipped without being consulted.
pub fn run_stages(
    store: &mut CheckpointStore,
    config: &DmpConfig,
) -> Result<Vec<(Stage, StageOutcome)>> {
    let mut stages = Vec::with_capacity(5);
    if store.exists(&StoreKey::Combined) {
        info!("Combined results present, skipping ingestion, filtering and testing");
        stages.extend([
            (Stage::Ingestion, StageOutcome::Skipped),
            (Stage::Filter, StageOutcome::Skipped),
            (Stage::PairwiseTest, StageOutcome::Skipped),
        ]);
    }
    else {
        stages.push((Stage::Ingestion, ingest(store, config)?));
        stages.push((Stage::Filter, filter(store, config)?));
        stages.push((Stage::PairwiseTest, pairwise_tests(store, config)?));
    }
    stages.push((Stage::Aggregation, aggregate(store, config)?));
    stages.push((Stage::Correction, correct(store)?));

    for (stage, outcome) in stages.iter() {
        debug!("{}: {}", stage, outcome);
    }
    Ok(stages)
}

/// Validates `config`, runs all stages and writes both result files.
///
/// The store at [`DmpConfig::store_path`] is reused between runs, so
/// calling this again with the same configuration only rewrites the outputs
/// from the stored, already corrected results.
pub fn run_pipeline(config: &DmpConfig) -> Result<DmpReport> {
    config.validate()?;
    info!(
        "Calling DMPs for {} samples ({} pairs) on {} chromosomes",
        config.samples().len(),
        config.sample_pairs().len(),
        config.chromosomes().len()
    );

    let mut store = CheckpointStore::open(config.store_path())?;
    let stages = run_stages(&mut store, config)?;
    let tests_computed = stages
        .iter()
        .find(|(stage, _)| *stage == Stage::PairwiseTest)
        .map(|(_, outcome)| outcome.rows())
        .unwrap_or(0);

    let adjusted = store.select(&StoreKey::Adjusted, None)?;
    let summary = summarize(&adjusted, config)?;
    let header = RunHeader::from_config(config);
    write_dmps(config.dmps_path(), &header, &adjusted_rows(&adjusted)?)?;
    write_summary(config.summary_path(), &header, &summary)?;
    store.close()?;

    info!(
        "Wrote {:?} and {:?}",
        config.dmps_path(),
        config.summary_path()
    );
    Ok(DmpReport {
        stages,
        tests_computed,
        summary,
        store_path: config.store_path(),
        dmps_path: config.dmps_path(),
        summary_path: config.summary_path(),
    })
}
