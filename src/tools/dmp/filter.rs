//! Removal of positions without methylated observations.

use anyhow::Result;
use log::*;
use polars::prelude::*;

use super::{
    DmpConfig,
    StageOutcome,
};
use crate::data_structs::AllcColumns;
use crate::error::DmpError;
use crate::store::{
    CheckpointStore,
    StoreKey,
};

/// Keeps the rows of positions where at least one sample has `is_meth`
/// set. Positions are compared exactly.
pub fn methylated_positions(df: DataFrame) -> PolarsResult<DataFrame> {
    df.lazy()
        .filter(
            AllcColumns::IsMeth
                .col()
                .cast(DataType::UInt32)
                .sum()
                .over([AllcColumns::Position.col()])
                .gt(lit(0u32)),
        )
        .collect()
}

/// Filters the raw union chromosome by chromosome into the filtered table,
/// then drops the raw union and compacts the store.
///
/// Each chromosome is appended under its own label. Chromosomes already
/// appended are not filtered again, so an interrupted run resumes with the
/// next chromosome.
pub fn filter(
    store: &mut CheckpointStore,
    config: &DmpConfig,
) -> Result<StageOutcome> {
    let has_raw = store.exists(&StoreKey::RawUnion);
    let has_filtered = store.exists(&StoreKey::Filtered);
    if has_filtered && !has_raw {
        info!("Filtered table present, skipping filtering");
        return Ok(StageOutcome::Skipped);
    }
    if !has_raw {
        return Err(DmpError::MissingCheckpoint(StoreKey::RawUnion.to_string()).into());
    }

    let done = store
        .labels(&StoreKey::Filtered)
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();

    let mut n_rows = 0;
    for chr in config.chromosomes() {
        if done.contains(chr) {
            debug!("{} already filtered", chr);
            continue;
        }
        let raw = store.select(
            &StoreKey::RawUnion,
            Some(AllcColumns::Chr.col().eq(lit(chr.as_str()))),
        )?;
        if raw.height() == 0 {
            warn!("No records for chromosome {}", chr);
        }
        let n_raw = raw.height();
        let mut kept = methylated_positions(raw)?;
        debug!("{}: kept {} of {} rows", chr, kept.height(), n_raw);

        // Empty chromosomes are appended too, so the table exists afterwards
        store.append(&StoreKey::Filtered, chr, &mut kept)?;
        n_rows += kept.height();
    }

    store.remove(&StoreKey::RawUnion)?;
    store.compact()?;
    info!("Filtering done: {} rows kept", n_rows);
    Ok(StageOutcome::Completed { rows: n_rows })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use itertools::izip;

    use super::*;
    use crate::tools::dmp::ingest::ingest;
    use crate::tools::dmp::testing::Fixture;

    fn is_meth_sums(df: &DataFrame) -> Result<HashMap<(String, u64), u32>> {
        let mut sums = HashMap::new();
        for (chr, pos, meth) in izip!(
            df.column("chr")?.str()?.into_no_null_iter(),
            df.column("position")?.u64()?.into_no_null_iter(),
            df.column("is_meth")?.bool()?.into_no_null_iter(),
        ) {
            *sums.entry((chr.to_string(), pos)).or_insert(0) += meth as u32;
        }
        Ok(sums)
    }

    #[test]
    fn keeps_only_methylated_positions() -> Result<()> {
        let fixture = Fixture::new();
        let mut store = fixture.store();
        ingest(&mut store, &fixture.config)?;
        let raw_sums = is_meth_sums(&store.select(&StoreKey::RawUnion, None)?)?;

        let outcome = filter(&mut store, &fixture.config)?;
        assert_eq!(outcome, StageOutcome::Completed { rows: 8 });
        assert!(!store.exists(&StoreKey::RawUnion));

        let kept_sums = is_meth_sums(&store.select(&StoreKey::Filtered, None)?)?;
        for (key, sum) in raw_sums {
            assert_eq!(kept_sums.contains_key(&key), sum > 0, "{:?}", key);
        }
        assert!(!kept_sums.contains_key(&("Chr1".to_string(), 200)));

        assert!(filter(&mut store, &fixture.config)?.is_skipped());
        Ok(())
    }

    #[test]
    fn resumes_after_interruption() -> Result<()> {
        let fixture = Fixture::new();
        let mut store = fixture.store();
        ingest(&mut store, &fixture.config)?;

        let chr1 = store.select(
            &StoreKey::RawUnion,
            Some(col("chr").eq(lit("Chr1"))),
        )?;
        store.append(&StoreKey::Filtered, "Chr1", &mut methylated_positions(chr1)?)?;

        let outcome = filter(&mut store, &fixture.config)?;
        assert_eq!(outcome, StageOutcome::Completed { rows: 3 });
        assert_eq!(store.n_rows(&StoreKey::Filtered), Some(8));
        assert_eq!(store.labels(&StoreKey::Filtered), vec!["Chr1", "Chr2"]);
        Ok(())
    }

    #[test]
    fn empty_chromosome_is_not_filtered_again() -> Result<()> {
        let fixture = Fixture::new();
        let config = fixture
            .config
            .clone()
            .with_chromosomes(vec!["Chr1".into(), "Chr9".into(), "Chr2".into()]);
        let mut store = fixture.store();
        ingest(&mut store, &config)?;

        // Interrupted after the empty Chr9 part was appended
        for chr in ["Chr1", "Chr9"] {
            let raw = store.select(&StoreKey::RawUnion, Some(col("chr").eq(lit(chr))))?;
            store.append(&StoreKey::Filtered, chr, &mut methylated_positions(raw)?)?;
        }
        assert_eq!(store.n_rows(&StoreKey::Filtered), Some(5));

        let outcome = filter(&mut store, &config)?;
        assert_eq!(outcome, StageOutcome::Completed { rows: 3 });
        assert_eq!(store.labels(&StoreKey::Filtered), vec!["Chr1", "Chr9", "Chr2"]);
        Ok(())
    }

    #[test]
    fn requires_raw_union() {
        let fixture = Fixture::new();
        let mut store = fixture.store();
        let err = filter(&mut store, &fixture.config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DmpError>(),
            Some(DmpError::MissingCheckpoint(_))
        ));
    }
}
