//! Re-exports of the crates which appear in the public API, so that
//! downstream code can match versions without declaring them.
pub use {adjustp,
         anyhow,
         itertools,
         log,
         polars,
         pretty_env_logger,
         rayon,
         statrs};
