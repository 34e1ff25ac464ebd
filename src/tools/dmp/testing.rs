use std::path::Path;

use tempfile::TempDir;

use super::DmpConfig;
use crate::store::CheckpointStore;

/// allC line with `is_meth` derived from `count_m`.
pub(crate) fn allc_line(
    chr: &str,
    position: u64,
    count_m: u32,
    count_total: u32,
) -> String {
    format!(
        "{}\t{}\t+\tCGG\t{}\t{}\t{}\n",
        chr,
        position,
        count_m,
        count_total,
        (count_m > 0) as u8
    )
}

pub(crate) fn write_allc(
    dir: &Path,
    sample: &str,
    rows: &[(&str, u64, u32, u32)],
) {
    let content = rows
        .iter()
        .map(|(chr, pos, m, t)| allc_line(chr, *pos, *m, *t))
        .collect::<String>();
    std::fs::write(dir.join(format!("allc_{}.tsv", sample)), content).unwrap();
}

/// Three samples on Chr1 and Chr2.
///
/// Chr1:100 is shared by all samples, Chr1:200 is unmethylated everywhere,
/// Chr1:300 is absent from `c`.
pub(crate) struct Fixture {
    pub dir:    TempDir,
    pub config: DmpConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        write_allc(dir.path(), "a", &[
            ("Chr1", 100, 10, 10),
            ("Chr1", 200, 0, 8),
            ("Chr1", 300, 5, 10),
            ("Chr2", 50, 1, 10),
        ]);
        write_allc(dir.path(), "b", &[
            ("Chr1", 100, 0, 10),
            ("Chr1", 200, 0, 6),
            ("Chr1", 300, 5, 10),
            ("Chr2", 50, 9, 10),
        ]);
        write_allc(dir.path(), "c", &[
            ("Chr1", 100, 2, 12),
            ("Chr1", 200, 0, 9),
            ("Chr2", 50, 3, 3),
        ]);
        let config = DmpConfig::new(dir.path(), vec!["a".into(), "b".into(), "c".into()])
            .with_out_dir(dir.path().to_path_buf())
            .with_chromosomes(vec!["Chr1".into(), "Chr2".into()]);
        Self { dir, config }
    }

    pub fn store(&self) -> CheckpointStore {
        CheckpointStore::open(self.config.store_path()).unwrap()
    }
}
