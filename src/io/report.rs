//! Writers for the position-level and pair-level result files.
//!
//! Both files start with one `#` comment line holding the run parameters,
//! followed by a tab-separated table with a header row.

use std::fmt::Display;
use std::fs::File;
use std::io::{
    BufWriter,
    Write,
};
use std::path::Path;

use anyhow::{
    Context,
    Result,
};
use itertools::izip;
use polars::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::data_structs::typedef::{
    CountType,
    PValueType,
    PosType,
};
use crate::data_structs::{
    PairColumns,
    PairSummary,
};
use crate::tools::dmp::DmpConfig;

/// Run parameters recorded in the first line of every output file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHeader {
    pub min_coverage: Option<CountType>,
    pub chromosomes:  Vec<String>,
    pub fdr:          f64,
}

impl RunHeader {
    pub fn from_config(config: &DmpConfig) -> Self {
        Self {
            min_coverage: *config.min_coverage(),
            chromosomes:  config.chromosomes().clone(),
            fdr:          *config.fdr(),
        }
    }
}

impl Display for RunHeader {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "#from: bsxdmp {}", env!("CARGO_PKG_VERSION"))?;
        if let Some(cov) = self.min_coverage {
            write!(f, "; min_cov: {}", cov)?;
        }
        write!(
            f,
            "; chrm_list: {}; fdr: {}",
            self.chromosomes.join(","),
            self.fdr
        )
    }
}

/// Column names of the position-level result file.
pub const DMP_COLUMNS: [&str; 10] = [
    "sample_x",
    "sample_y",
    "chrm",
    "pos",
    "mCounts_x",
    "tCounts_x",
    "mCounts_y",
    "tCounts_y",
    "pvalue",
    "pvalue.adjust",
];

/// Column names of the pair-level result file.
pub const SUMMARY_COLUMNS: [&str; 3] = ["sample_x", "sample_y", "dmp_count"];

/// One tested position of one sample pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmpRow {
    pub sample_x:      String,
    pub sample_y:      String,
    #[serde(rename = "chrm")]
    pub chr:           String,
    #[serde(rename = "pos")]
    pub position:      PosType,
    #[serde(rename = "mCounts_x")]
    pub count_m_x:     CountType,
    #[serde(rename = "tCounts_x")]
    pub count_total_x: CountType,
    #[serde(rename = "mCounts_y")]
    pub count_m_y:     CountType,
    #[serde(rename = "tCounts_y")]
    pub count_total_y: CountType,
    pub pvalue:        PValueType,
    #[serde(rename = "pvalue.adjust")]
    pub padj:          PValueType,
}

/// Converts the corrected result table into rows, keeping row order.
pub fn adjusted_rows(df: &DataFrame) -> Result<Vec<DmpRow>> {
    let column = |c: PairColumns| df.column(c.as_str());
    let sample_x = column(PairColumns::SampleX)?.str()?;
    let sample_y = column(PairColumns::SampleY)?.str()?;
    let chr = column(PairColumns::Chr)?.str()?;
    let position = column(PairColumns::Position)?.u64()?;
    let count_m_x = column(PairColumns::CountMX)?.u32()?;
    let count_total_x = column(PairColumns::CountTotalX)?.u32()?;
    let count_m_y = column(PairColumns::CountMY)?.u32()?;
    let count_total_y = column(PairColumns::CountTotalY)?.u32()?;
    let pvalue = column(PairColumns::PValue)?.f64()?;
    let padj = column(PairColumns::PAdj)?.f64()?;

    let rows = izip!(
        sample_x.into_no_null_iter(),
        sample_y.into_no_null_iter(),
        chr.into_no_null_iter(),
        position.into_no_null_iter(),
        count_m_x.into_no_null_iter(),
        count_total_x.into_no_null_iter(),
        count_m_y.into_no_null_iter(),
        count_total_y.into_no_null_iter(),
        pvalue.into_no_null_iter(),
        padj.into_no_null_iter(),
    )
    .map(
        |(sx, sy, chr, pos, mx, tx, my, ty, p, q)| {
            DmpRow {
                sample_x:      sx.to_string(),
                sample_y:      sy.to_string(),
                chr:           chr.to_string(),
                position:      pos,
                count_m_x:     mx,
                count_total_x: tx,
                count_m_y:     my,
                count_total_y: ty,
                pvalue:        p,
                padj:          q,
            }
        },
    )
    .collect();
    Ok(rows)
}

/// Writes the run header, then the column names and `rows`. The column
/// row is written even if there are no rows.
fn write_table<T: Serialize, P: AsRef<Path>>(
    path: P,
    header: &RunHeader,
    columns: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<()> {
    let path = path.as_ref();
    let mut sink = BufWriter::new(
        File::create(path)
            .with_context(|| format!("Failed to create output file {:?}", path))?,
    );
    writeln!(sink, "{}", header)?;

    let mut writer = csv::WriterBuilder::default()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(sink);
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Writes position-level results.
pub fn write_dmps<P: AsRef<Path>>(
    path: P,
    header: &RunHeader,
    rows: &[DmpRow],
) -> Result<()> {
    write_table(path, header, &DMP_COLUMNS, rows)
}

/// Writes per-pair DMP counts.
pub fn write_summary<P: AsRef<Path>>(
    path: P,
    header: &RunHeader,
    summary: &[PairSummary],
) -> Result<()> {
    write_table(path, header, &SUMMARY_COLUMNS, summary)
}

/// Reads a position-level result file written by [`write_dmps`].
pub fn read_dmps<P: AsRef<Path>>(path: P) -> Result<Vec<DmpRow>> {
    let path = path.as_ref();
    csv::ReaderBuilder::default()
        .delimiter(b'\t')
        .has_headers(true)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .deserialize::<DmpRow>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to parse {:?}", path))
}

/// Reads a pair-level result file written by [`write_summary`].
pub fn read_summary<P: AsRef<Path>>(path: P) -> Result<Vec<PairSummary>> {
    let path = path.as_ref();
    csv::ReaderBuilder::default()
        .delimiter(b'\t')
        .has_headers(true)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .deserialize::<PairSummary>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to parse {:?}", path))
}
