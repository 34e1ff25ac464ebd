//! Global multiple-testing correction and per-pair DMP counts.

use std::collections::HashMap;

use anyhow::Result;
use itertools::izip;
use log::*;
use polars::prelude::*;

use super::{
    DmpConfig,
    StageOutcome,
};
use crate::data_structs::{
    PairColumns,
    PairSummary,
};
use crate::error::DmpError;
use crate::store::{
    CheckpointStore,
    StoreKey,
};
use crate::utils::adjust_pvalues;

/// Adds the Benjamini-Hochberg adjusted p-value of every row of the
/// combined table and stores the result.
///
/// The adjustment always spans the whole combined table.
pub fn correct(store: &mut CheckpointStore) -> Result<StageOutcome> {
    if store.exists(&StoreKey::Adjusted) {
        info!("Adjusted results present, skipping correction");
        return Ok(StageOutcome::Skipped);
    }

    let expected = PairColumns::result_colnames();
    if let Some(columns) = store.columns(&StoreKey::Combined) {
        if columns.iter().map(String::as_str).ne(expected.iter().copied()) {
            return Err(DmpError::schema(format!(
                "combined table has columns {:?}, expected {:?}",
                columns, expected
            ))
            .into());
        }
    }
    let mut combined = store.select(&StoreKey::Combined, None)?;
    let pvalues = combined
        .column(PairColumns::PValue.as_str())?
        .f64()?
        .into_no_null_iter()
        .collect::<Vec<_>>();
    let padj = adjust_pvalues(&pvalues);
    if padj.len() != combined.height() {
        return Err(DmpError::schema(format!(
            "{} adjusted p-values for {} result rows",
            padj.len(),
            combined.height()
        ))
        .into());
    }

    combined.with_column(Column::new(PairColumns::PAdj.as_str().into(), padj))?;
    store.put(&StoreKey::Adjusted, &mut combined)?;
    info!("Correction done: {} p-values adjusted", combined.height());
    Ok(StageOutcome::Completed {
        rows: combined.height(),
    })
}

/// Whether an adjusted p-value is significant at `fdr`.
#[inline]
pub fn passes(
    padj: f64,
    fdr: f64,
) -> bool {
    padj <= fdr
}

/// Counts significant positions of every sample pair of `config`.
///
/// Pairs without any significant, or any shared, position are reported
/// with a count of zero.
pub fn summarize(
    adjusted: &DataFrame,
    config: &DmpConfig,
) -> Result<Vec<PairSummary>> {
    let fdr = *config.fdr();
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for (x, y, padj) in izip!(
        adjusted
            .column(PairColumns::SampleX.as_str())?
            .str()?
            .into_no_null_iter(),
        adjusted
            .column(PairColumns::SampleY.as_str())?
            .str()?
            .into_no_null_iter(),
        adjusted
            .column(PairColumns::PAdj.as_str())?
            .f64()?
            .into_no_null_iter(),
    ) {
        if passes(padj, fdr) {
            *counts.entry((x, y)).or_default() += 1;
        }
    }

    let summary = config
        .sample_pairs()
        .into_iter()
        .map(|(x, y)| PairSummary::new(x, y, counts.get(&(x, y)).copied().unwrap_or(0)))
        .collect::<Vec<_>>();
    for pair in summary.iter() {
        debug!("{} vs {}: {} DMPs", pair.sample_x, pair.sample_y, pair.dmp_count);
    }
    Ok(summary)
}
