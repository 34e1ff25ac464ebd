use std::path::PathBuf;

use bsxdmp::data_structs::typedef::CountType;
use bsxdmp::prelude::*;
use bsxdmp::tools::dmp::{
    DEFAULT_FDR,
    DEFAULT_OUT_ID,
};
use clap::Args;
use console::style;

use crate::strings::dmp as strings;
use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct DmpArgs {
    #[arg(value_parser, help = strings::ALLC_DIR)]
    allc_dir: PathBuf,

    #[arg(num_args = 2.., required = true, help = strings::SAMPLES)]
    samples: Vec<String>,

    #[arg(short = 'o', long, default_value = DEFAULT_OUT_ID, help = strings::OUT_ID)]
    out_id: String,

    #[arg(short = 'd', long, default_value = ".", help = strings::OUT_DIR)]
    out_dir: PathBuf,

    #[arg(short = 'v', long, help_heading = "FILTER ARGS", help = strings::MIN_COV)]
    min_coverage: Option<CountType>,

    #[arg(
        short = 'f',
        long,
        default_value_t = DEFAULT_FDR,
        help_heading = "FILTER ARGS",
        help = strings::FDR
    )]
    fdr: f64,

    #[arg(
        short = 'c',
        long,
        value_delimiter = ',',
        help_heading = "FILTER ARGS",
        help = strings::CHROMOSOMES
    )]
    chromosomes: Option<Vec<String>>,
}

impl DmpArgs {
    pub fn to_config(
        &self,
        utils: &UtilsArgs,
    ) -> DmpConfig {
        let config = DmpConfig::new(self.allc_dir.clone(), self.samples.clone())
            .with_out_id(self.out_id.clone())
            .with_out_dir(self.out_dir.clone())
            .with_min_coverage(self.min_coverage)
            .with_fdr(self.fdr)
            .with_n_threads(utils.threads);
        match &self.chromosomes {
            Some(chromosomes) => config.with_chromosomes(chromosomes.clone()),
            None => config,
        }
    }

    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let report = run_pipeline(&self.to_config(utils))?;

        if report.all_skipped() {
            println!(
                "{}",
                style("All stages found in the store, results rewritten.").yellow()
            );
        }
        for pair in report.summary() {
            println!(
                "{} vs {}: {} DMPs",
                style(&pair.sample_x).cyan(),
                style(&pair.sample_y).cyan(),
                style(pair.dmp_count).green()
            );
        }
        println!(
            "Results written to {} and {}",
            style(report.dmps_path().display()).bold(),
            style(report.summary_path().display()).bold()
        );
        Ok(())
    }
}
