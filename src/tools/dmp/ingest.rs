//! Union of the allC records of all samples.

use std::collections::HashSet;

use anyhow::{
    Context,
    Result,
};
use log::*;

use super::{
    DmpConfig,
    StageOutcome,
};
use crate::data_structs::records_to_frame;
use crate::io::allc::read_allc;
use crate::store::{
    CheckpointStore,
    StoreKey,
};

/// Appends the records of every sample not yet in the raw union.
///
/// Each sample is committed as one append labeled with its name, so an
/// interrupted ingestion resumes with the first sample which is missing,
/// and a sample without records is not read again. Nothing is done once
/// the filtered table exists.
pub fn ingest(
    store: &mut CheckpointStore,
    config: &DmpConfig,
) -> Result<StageOutcome> {
    if store.exists(&StoreKey::Filtered) {
        info!("Filtered table present, skipping ingestion");
        return Ok(StageOutcome::Skipped);
    }

    let ingested = store
        .labels(&StoreKey::RawUnion)
        .into_iter()
        .map(String::from)
        .collect::<HashSet<_>>();
    for unknown in ingested
        .iter()
        .filter(|s| !config.samples().contains(*s))
    {
        warn!("Raw union holds sample {} which is not part of this run", unknown);
    }

    let pending = config
        .samples()
        .iter()
        .filter(|s| !ingested.contains(*s))
        .collect::<Vec<_>>();
    if pending.is_empty() {
        info!("All samples already ingested, skipping ingestion");
        return Ok(StageOutcome::Skipped);
    }
    if !ingested.is_empty() {
        info!(
            "Resuming ingestion: {} of {} samples already in store",
            config.samples().len() - pending.len(),
            config.samples().len()
        );
    }

    let mut n_rows = 0;
    for sample in pending {
        let records = read_allc(config.allc_dir(), sample, *config.min_coverage())?;
        if records.is_empty() {
            warn!("Sample {} has no records", sample);
        }
        let mut df = records_to_frame(&records)
            .with_context(|| format!("Failed to build table of sample {}", sample))?;
        store.append(&StoreKey::RawUnion, sample, &mut df)?;
        n_rows += df.height();
        debug!("Ingested {} ({} rows)", sample, df.height());
    }

    info!("Ingestion done: {} rows", n_rows);
    Ok(StageOutcome::Completed { rows: n_rows })
}
