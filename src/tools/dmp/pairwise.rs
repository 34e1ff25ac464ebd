//! Fisher exact tests of every sample pair on every chromosome.
//!
//! Units of work are (chromosome, pair). The filtered rows of a chromosome
//! are loaded once; its pending units are then tested on a rayon pool while
//! the calling thread commits finished results to the store as they arrive.

use anyhow::{
    anyhow,
    Context,
    Result,
};
use crossbeam::channel::unbounded;
use itertools::izip;
use log::*;
use polars::prelude::*;
use rayon::prelude::*;

use super::{
    DmpConfig,
    StageOutcome,
};
use crate::data_structs::typedef::PValueType;
use crate::data_structs::{
    AllcColumns,
    PairColumns,
};
use crate::store::{
    CheckpointStore,
    StoreKey,
};
use crate::utils::{
    build_thread_pool,
    fisher_exact,
    ContingencyTable,
};

/// Positions and counts of one sample, with counts renamed to `m`/`total`.
fn sample_side(
    rows: &DataFrame,
    sample: &str,
    m: PairColumns,
    total: PairColumns,
) -> LazyFrame {
    rows.clone()
        .lazy()
        .filter(AllcColumns::Sample.col().eq(lit(sample)))
        .select([
            AllcColumns::Position.col(),
            AllcColumns::CountM.col().alias(m.as_str()),
            AllcColumns::CountTotal.col().alias(total.as_str()),
        ])
}

/// Tests every position shared by `sample_x` and `sample_y` in `rows`, the
/// filtered records of chromosome `chr`.
///
/// The result has [`PairColumns::result_columns`] and is sorted by
/// position.
pub fn test_pair(
    rows: &DataFrame,
    chr: &str,
    sample_x: &str,
    sample_y: &str,
) -> Result<DataFrame> {
    let joined = sample_side(rows, sample_x, PairColumns::CountMX, PairColumns::CountTotalX)
        .join(
            sample_side(rows, sample_y, PairColumns::CountMY, PairColumns::CountTotalY),
            [AllcColumns::Position.col()],
            [AllcColumns::Position.col()],
            JoinArgs::new(JoinType::Inner),
        )
        .sort_by_exprs(
            [AllcColumns::Position.col()],
            SortMultipleOptions::default(),
        )
        .collect()?;

    let column = |c: PairColumns| joined.column(c.as_str());
    let pvalues: Vec<PValueType> = izip!(
        column(PairColumns::CountMX)?.u32()?.into_no_null_iter(),
        column(PairColumns::CountTotalX)?.u32()?.into_no_null_iter(),
        column(PairColumns::CountMY)?.u32()?.into_no_null_iter(),
        column(PairColumns::CountTotalY)?.u32()?.into_no_null_iter(),
    )
    .map(|(m_x, t_x, m_y, t_y)| fisher_exact(&ContingencyTable::from_counts(m_x, t_x, m_y, t_y)))
    .collect();

    let n = joined.height();
    let result = DataFrame::new(vec![
        Column::new(PairColumns::Chr.as_str().into(), vec![chr; n]),
        joined
            .column(AllcColumns::Position.as_str())?
            .clone(),
        Column::new(PairColumns::SampleX.as_str().into(), vec![sample_x; n]),
        Column::new(PairColumns::SampleY.as_str().into(), vec![sample_y; n]),
        column(PairColumns::CountMX)?.clone(),
        column(PairColumns::CountTotalX)?.clone(),
        column(PairColumns::CountMY)?.clone(),
        column(PairColumns::CountTotalY)?.clone(),
        Column::new(PairColumns::PValue.as_str().into(), pvalues),
    ])?;
    Ok(result)
}

/// Runs every (chromosome, pair) unit whose result is not yet stored.
///
/// Returns the number of positions tested in this call.
pub fn pairwise_tests(
    store: &mut CheckpointStore,
    config: &DmpConfig,
) -> Result<StageOutcome> {
    let pairs = config.sample_pairs();
    let pool = build_thread_pool(*config.n_threads())?;
    let mut n_units = 0;
    let mut n_tests = 0;

    for chr in config.chromosomes() {
        let pending = pairs
            .iter()
            .map(|(x, y)| StoreKey::pair_test(chr, x, y))
            .filter(|key| !store.exists(key))
            .collect::<Vec<_>>();
        if pending.is_empty() {
            debug!("All pairs of {} already tested", chr);
            continue;
        }
        if pending.len() < pairs.len() {
            info!(
                "{}: {} of {} pairs already tested",
                chr,
                pairs.len() - pending.len(),
                pairs.len()
            );
        }

        let rows = store.select(
            &StoreKey::Filtered,
            Some(AllcColumns::Chr.col().eq(lit(chr.as_str()))),
        )?;
        n_tests += run_units(store, &pool, &rows, &pending)?;
        n_units += pending.len();
    }

    if n_units == 0 {
        info!("All pair tests present, skipping pairwise testing");
        return Ok(StageOutcome::Skipped);
    }
    info!(
        "Pairwise testing done: {} units, {} positions tested",
        n_units, n_tests
    );
    Ok(StageOutcome::Completed { rows: n_tests })
}

/// Tests `units` on `pool` and commits each result from the calling thread.
fn run_units(
    store: &mut CheckpointStore,
    pool: &rayon::ThreadPool,
    rows: &DataFrame,
    units: &[StoreKey],
) -> Result<usize> {
    let (sender, receiver) = unbounded::<(StoreKey, DataFrame)>();

    std::thread::scope(|scope| {
        let worker = scope.spawn(move || {
            pool.install(|| {
                units
                    .par_iter()
                    .try_for_each_with(sender, |sender, key| -> Result<()> {
                        let StoreKey::PairTest {
                            chr,
                            sample_x,
                            sample_y,
                        } = key
                        else {
                            return Err(anyhow!("{} is not a pair test key", key));
                        };
                        let result = test_pair(rows, chr, sample_x, sample_y)
                            .with_context(|| format!("Failed to test {}", key))?;
                        debug!("Tested {} ({} positions)", key, result.height());
                        sender
                            .send((key.clone(), result))
                            .map_err(|_| anyhow!("Result receiver closed"))
                    })
            })
        });

        let mut n_tests = 0;
        for (key, mut result) in receiver.iter() {
            n_tests += result.height();
            store.put(&key, &mut result)?;
        }

        worker
            .join()
            .map_err(|_| anyhow!("Pairwise test worker panicked"))??;
        Ok(n_tests)
    })
}
