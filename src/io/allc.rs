//! Reader for per-sample allC methylation call files.
//!
//! An allC file is tab-separated, without a header, with the columns
//!
//! ```text
//! chr  position  strand  mc_class  count_m  count_total  is_meth  [...]
//! ```
//!
//! Lines starting with `#` are comments. Only chromosome, position, the two
//! counts and the methylation flag are used.

use std::fs::File;
use std::io::{
    BufReader,
    ErrorKind,
    Read,
};
use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    bail,
    Context,
    Result,
};
use csv::StringRecord;
use flate2::read::MultiGzDecoder;
use log::*;

use crate::data_structs::typedef::{
    CountType,
    PosType,
};
use crate::data_structs::MethylationRecord;
use crate::error::DmpError;

const ALLC_MIN_FIELDS: usize = 7;
const CHR_IDX: usize = 0;
const POSITION_IDX: usize = 1;
const COUNT_M_IDX: usize = 4;
const COUNT_TOTAL_IDX: usize = 5;
const IS_METH_IDX: usize = 6;

/// Path of the allC file of `sample`: `<dir>/allc_<sample>[_cov<N>].tsv`.
pub fn allc_file_path(
    dir: &Path,
    sample: &str,
    min_coverage: Option<CountType>,
) -> PathBuf {
    let suffix = min_coverage
        .map(|cov| format!("_cov{}", cov))
        .unwrap_or_default();
    dir.join(format!("allc_{}{}.tsv", sample, suffix))
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

/// Opens the plain file, or its `.gz` sibling if only that one exists.
fn open_allc(path: PathBuf) -> Result<(PathBuf, Box<dyn Read>)> {
    if path.is_file() {
        let file = File::open(&path).map_err(|source| {
            DmpError::FileAccess {
                path: path.clone(),
                source,
            }
        })?;
        return Ok((path, Box::new(BufReader::new(file))));
    }

    let gz = gz_path(&path);
    if gz.is_file() {
        let file = File::open(&gz).map_err(|source| {
            DmpError::FileAccess {
                path: gz.clone(),
                source,
            }
        })?;
        debug!("Reading gzip-compressed {:?}", gz);
        return Ok((gz, Box::new(MultiGzDecoder::new(BufReader::new(file)))));
    }

    Err(DmpError::FileAccess {
        source: std::io::Error::new(
            ErrorKind::NotFound,
            format!("neither {:?} nor {:?} exists", path, gz),
        ),
        path,
    }
    .into())
}

fn parse_field<T: std::str::FromStr>(
    row: &StringRecord,
    idx: usize,
    name: &str,
) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static, {
    row[idx]
        .trim()
        .parse::<T>()
        .with_context(|| format!("Invalid {} value {:?}", name, &row[idx]))
}

fn parse_row(
    row: &StringRecord,
    sample: &str,
) -> Result<MethylationRecord> {
    if row.len() < ALLC_MIN_FIELDS {
        bail!(DmpError::schema(format!(
            "expected at least {} columns, found {}",
            ALLC_MIN_FIELDS,
            row.len()
        )));
    }
    let position: PosType = parse_field(row, POSITION_IDX, "position")?;
    let count_m: CountType = parse_field(row, COUNT_M_IDX, "methylated count")?;
    let count_total: CountType =
        parse_field(row, COUNT_TOTAL_IDX, "total count")?;
    let is_meth: u8 = parse_field(row, IS_METH_IDX, "methylation flag")?;

    Ok(MethylationRecord {
        chr: row[CHR_IDX].to_string(),
        position,
        count_m,
        count_total,
        is_meth: is_meth != 0,
        sample: sample.to_string(),
    })
}

/// Reads all records of `sample` from the allC directory `dir`.
///
/// With `min_coverage` set, the `_cov<N>` file is read and records with
/// fewer than `N` total reads are dropped. A missing file is a
/// [`DmpError::FileAccess`]; a record with more methylated than total reads
/// is a [`DmpError::SchemaMismatch`].
pub fn read_allc(
    dir: &Path,
    sample: &str,
    min_coverage: Option<CountType>,
) -> Result<Vec<MethylationRecord>> {
    let (path, handle) = open_allc(allc_file_path(dir, sample, min_coverage))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(handle);

    let mut records = Vec::new();
    let mut n_low_coverage = 0usize;
    let mut row = StringRecord::new();
    loop {
        let has_row = reader
            .read_record(&mut row)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if !has_row {
            break;
        }
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let record = parse_row(&row, sample)
            .with_context(|| format!("{:?}, line {}", path, line))?;
        if !record.is_valid() {
            bail!(DmpError::schema(format!(
                "{:?}, line {}: methylated count {} exceeds total count {}",
                path, line, record.count_m, record.count_total
            )));
        }
        if min_coverage.is_some_and(|cov| record.count_total < cov) {
            n_low_coverage += 1;
            continue;
        }
        records.push(record);
    }

    if n_low_coverage > 0 {
        debug!(
            "{}: dropped {} records below minimum coverage",
            sample, n_low_coverage
        );
    }
    info!("Read {} records of {} from {:?}", records.len(), sample, path);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    use super::*;

    const ALLC: &str = "#chr\tpos\tstrand\tclass\tmc\ttotal\tmeth\n\
                        Chr1\t10\t+\tCGG\t3\t5\t1\n\
                        Chr1\t11\t-\tCHH\t0\t4\t0\n\
                        Chr2\t7\t+\tCGA\t1\t1\t1\t0.99\n";

    #[test]
    fn reads_records_and_skips_comments() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("allc_WT.tsv"), ALLC)?;

        let records = read_allc(dir.path(), "WT", None)?;
        assert_eq!(records, vec![
            MethylationRecord::new("Chr1", 10, 3, 5, true, "WT"),
            MethylationRecord::new("Chr1", 11, 0, 4, false, "WT"),
            MethylationRecord::new("Chr2", 7, 1, 1, true, "WT"),
        ]);
        Ok(())
    }

    #[test]
    fn coverage_suffix_and_filter() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("allc_WT_cov4.tsv"), ALLC)?;

        let records = read_allc(dir.path(), "WT", Some(4))?;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.count_total >= 4));
        Ok(())
    }

    #[test]
    fn missing_file_is_file_access_error() {
        let dir = TempDir::new().unwrap();
        let err = read_allc(dir.path(), "absent", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DmpError>(),
            Some(DmpError::FileAccess { .. })
        ));
    }

    #[test]
    fn methylated_above_total_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("allc_bad.tsv"),
            "Chr1\t10\t+\tCGG\t3\t5\t1\nChr1\t12\t+\tCGG\t6\t5\t1\n",
        )
        .unwrap();
        let err = read_allc(dir.path(), "bad", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DmpError>(),
            Some(DmpError::SchemaMismatch(_))
        ));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn short_row_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("allc_short.tsv"), "Chr1\t10\t+\n").unwrap();
        let err = read_allc(dir.path(), "short", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DmpError>(),
            Some(DmpError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn reads_gzip_sibling() -> Result<()> {
        let dir = TempDir::new()?;
        let file = File::create(dir.path().join("allc_gz.tsv.gz"))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(ALLC.as_bytes())?;
        encoder.finish()?;

        let records = read_allc(dir.path(), "gz", None)?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sample, "gz");
        Ok(())
    }
}
