use clap::Args;
use log::LevelFilter;

use crate::strings::utils as strings;

#[derive(Args, Debug, Clone)]
pub(crate) struct UtilsArgs {
    #[arg(
        short = 'p',
        long = "threads",
        default_value_t = 1,
        help = strings::THREADS
    )]
    pub threads: usize,

    #[arg(long, default_value_t = false, help = strings::VERBOSE)]
    pub verbose: bool,
}

impl UtilsArgs {
    /// Initialises logging. `RUST_LOG` takes precedence over `--verbose`.
    pub fn setup(&self) -> anyhow::Result<()> {
        let level = if self.verbose {
            LevelFilter::Debug
        }
        else {
            LevelFilter::Info
        };
        let mut builder = pretty_env_logger::formatted_timed_builder();
        builder.filter_level(level);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        builder.try_init()?;
        Ok(())
    }
}
