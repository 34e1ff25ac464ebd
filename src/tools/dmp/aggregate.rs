//! Union of all pair results.

use anyhow::Result;
use log::*;
use polars::prelude::*;

use super::{
    DmpConfig,
    StageOutcome,
};
use crate::error::DmpError;
use crate::store::{
    CheckpointStore,
    StoreKey,
};

/// Pair test keys in combined-table order: by `sample_x`, then `sample_y`,
/// then chromosome.
pub fn combined_order(config: &DmpConfig) -> Vec<StoreKey> {
    config
        .sample_pairs()
        .into_iter()
        .flat_map(|(x, y)| {
            config
                .chromosomes()
                .iter()
                .map(move |chr| StoreKey::pair_test(chr, x, y))
        })
        .collect()
}

/// Concatenates every pair result into the combined table.
///
/// Fails with [`DmpError::MissingCheckpoint`] if any (chromosome, pair)
/// result is absent.
pub fn aggregate(
    store: &mut CheckpointStore,
    config: &DmpConfig,
) -> Result<StageOutcome> {
    if store.exists(&StoreKey::Combined) {
        info!("Combined results present, skipping aggregation");
        return Ok(StageOutcome::Skipped);
    }

    let mut combined: Option<DataFrame> = None;
    for key in combined_order(config) {
        if !store.exists(&key) {
            return Err(DmpError::MissingCheckpoint(key.to_string()).into());
        }
        let result = store.select(&key, None)?;
        match combined.as_mut() {
            Some(df) => {
                df.vstack_mut(&result)?;
            },
            None => combined = Some(result),
        }
    }
    let mut combined = combined.ok_or_else(|| DmpError::config("no sample pairs to aggregate"))?;
    combined.as_single_chunk_par();

    store.put(&StoreKey::Combined, &mut combined)?;
    info!("Aggregation done: {} rows", combined.height());
    Ok(StageOutcome::Completed {
        rows: combined.height(),
    })
}
