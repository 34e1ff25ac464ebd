#![allow(dead_code)]

use std::collections::{
    HashMap,
    HashSet,
};
use std::fmt::Write as _;
use std::path::Path;

use bsxdmp::prelude::*;
use rand::rngs::StdRng;
use rand::{
    Rng,
    SeedableRng,
};

/// Random allC calls of several samples.
///
/// Each position has a methylation level shared by all samples, shifted
/// per sample. Shifts are spread evenly over `-0.4..=0.4`, so the first and
/// last samples always differ strongly. About a fifth of the positions are
/// unmethylated in every sample.
pub struct DemoData {
    pub samples:     Vec<String>,
    pub chromosomes: Vec<String>,
    pub records:     Vec<MethylationRecord>,
}

impl DemoData {
    pub fn generate(
        seed: u64,
        n_samples: usize,
        chromosomes: &[&str],
        n_positions: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = (0..n_samples)
            .map(|i| format!("s{}", i))
            .collect::<Vec<_>>();
        let shifts = (0..n_samples)
            .map(|i| {
                if n_samples > 1 {
                    -0.4 + 0.8 * i as f64 / (n_samples - 1) as f64
                }
                else {
                    0.0
                }
            })
            .collect::<Vec<f64>>();

        let mut records = Vec::new();
        for chr in chromosomes {
            for pos in 0..n_positions {
                let position = pos * 7 + 1;
                let unmethylated = rng.gen_bool(0.2);
                let level: f64 = rng.gen_range(0.0..1.0);
                for (sample, shift) in samples.iter().zip(shifts.iter()) {
                    if rng.gen_bool(0.15) {
                        continue;
                    }
                    let count_total = rng.gen_range(1..=25u32);
                    let p = if unmethylated {
                        0.0
                    }
                    else {
                        (level + shift).clamp(0.0, 1.0)
                    };
                    let count_m = (0..count_total)
                        .filter(|_| rng.gen_bool(p))
                        .count() as u32;
                    records.push(MethylationRecord::new(
                        chr,
                        position,
                        count_m,
                        count_total,
                        count_m * 3 >= count_total && count_m > 0,
                        sample,
                    ));
                }
            }
        }

        Self {
            samples,
            chromosomes: chromosomes.iter().map(|c| c.to_string()).collect(),
            records,
        }
    }

    /// Writes one allC file per sample into `dir`.
    pub fn write(
        &self,
        dir: &Path,
        min_coverage: Option<u32>,
    ) {
        let mut files: HashMap<&str, String> = HashMap::new();
        for sample in self.samples.iter() {
            files.insert(sample, "#chr\tpos\tstrand\tclass\tmc\tcov\tmeth\n".to_string());
        }
        for r in self.records.iter() {
            let content = files.get_mut(r.sample.as_str()).unwrap();
            writeln!(
                content,
                "{}\t{}\t+\tCGG\t{}\t{}\t{}",
                r.chr, r.position, r.count_m, r.count_total, r.is_meth as u8
            )
            .unwrap();
        }
        for (sample, content) in files {
            std::fs::write(allc_file_path(dir, sample, min_coverage), content).unwrap();
        }
    }

    pub fn config(
        &self,
        dir: &Path,
    ) -> DmpConfig {
        DmpConfig::new(dir, self.samples.clone())
            .with_out_dir(dir.to_path_buf())
            .with_chromosomes(self.chromosomes.clone())
    }

    /// Positions with at least one methylated call, per chromosome.
    pub fn methylated_positions(
        &self,
        min_coverage: Option<u32>,
    ) -> HashSet<(String, u64)> {
        self.records
            .iter()
            .filter(|r| r.is_meth && min_coverage.map_or(true, |c| r.count_total >= c))
            .map(|r| (r.chr.clone(), r.position))
            .collect()
    }

    /// Positions of `sample` on `chr` which survive filtering.
    pub fn kept_positions(
        &self,
        sample: &str,
        chr: &str,
    ) -> HashSet<u64> {
        let methylated = self.methylated_positions(None);
        self.records
            .iter()
            .filter(|r| r.sample == sample && r.chr == chr)
            .filter(|r| methylated.contains(&(r.chr.clone(), r.position)))
            .map(|r| r.position)
            .collect()
    }
}

/// Writes allC files of `x` and `y` whose only positions give the tables
/// `[[10, 0], [0, 10]]`, `[[5, 5], [5, 5]]` and `[[1, 9], [9, 1]]`.
pub fn write_scenario(dir: &Path) {
    let x = "Chr1\t10\t+\tCGG\t10\t10\t1\n\
             Chr1\t20\t+\tCGG\t5\t10\t1\n\
             Chr1\t30\t+\tCGG\t1\t10\t0\n";
    let y = "Chr1\t10\t+\tCGG\t0\t10\t0\n\
             Chr1\t20\t+\tCGG\t5\t10\t1\n\
             Chr1\t30\t+\tCGG\t9\t10\t1\n";
    std::fs::write(dir.join("allc_x.tsv"), x).unwrap();
    std::fs::write(dir.join("allc_y.tsv"), y).unwrap();
}
