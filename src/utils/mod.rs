//! Utility functions and helper macros used throughout the crate.
//!
//! - Statistical functions: the two-sided Fisher exact test and
//!   Benjamini-Hochberg p-value adjustment.
//! - Construction of rayon thread pools sized from run configuration.
//! - Macros for common struct operations (getter functions, builder-style
//!   `with_*` methods).

use rayon::{
    ThreadPool,
    ThreadPoolBuilder,
};

mod stats;
pub use stats::*;

/// Creates a dedicated thread pool. `0` lets rayon pick the number of
/// threads.
pub fn build_thread_pool(n_threads: usize) -> anyhow::Result<ThreadPool> {
    Ok(ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|idx| format!("bsxdmp-worker-{idx}"))
        .build()?)
}

#[macro_export]
macro_rules! getter_fn {
    ($field_name: ident, $field_type: ty) => {
        pub fn $field_name(&self) -> &$field_type {
            &self.$field_name
        }
    };
}

#[macro_export]
macro_rules! with_field_fn {
    ($field_name: ident, $field_type: ty) => {
        paste::paste! {
            pub fn [<with_$field_name>](mut self, value: $field_type) -> Self {
                self.$field_name = value;
                self
            }
        }
    };
}
