use std::fmt::Display;

use serde::{
    Deserialize,
    Serialize,
};

/// Pipeline stage which produces a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Ingestion,
    Filter,
    PairwiseTest,
    Aggregation,
    Correction,
}

impl Display for Stage {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            Stage::Ingestion => "ingestion",
            Stage::Filter => "filter",
            Stage::PairwiseTest => "pairwise test",
            Stage::Aggregation => "aggregation",
            Stage::Correction => "correction",
        };
        write!(f, "{}", name)
    }
}

/// Key of a table in the [`CheckpointStore`](super::CheckpointStore).
///
/// Keys are structured values, so sample labels and chromosome names never
/// need escaping. [`Display`] renders them as paths, e.g.
/// `fisher/Chr1/WT/mut`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKey {
    /// Union of the allC records of all samples.
    RawUnion,
    /// Raw union restricted to positions methylated in at least one sample.
    Filtered,
    /// Fisher test results of one sample pair on one chromosome.
    PairTest {
        chr:      String,
        sample_x: String,
        sample_y: String,
    },
    /// Union of all pair results.
    Combined,
    /// Combined results with adjusted p-values.
    Adjusted,
}

impl StoreKey {
    pub fn pair_test(
        chr: &str,
        sample_x: &str,
        sample_y: &str,
    ) -> Self {
        StoreKey::PairTest {
            chr:      chr.to_string(),
            sample_x: sample_x.to_string(),
            sample_y: sample_y.to_string(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StoreKey::RawUnion => Stage::Ingestion,
            StoreKey::Filtered => Stage::Filter,
            StoreKey::PairTest { .. } => Stage::PairwiseTest,
            StoreKey::Combined => Stage::Aggregation,
            StoreKey::Adjusted => Stage::Correction,
        }
    }

    pub fn is_pair_test(&self) -> bool {
        matches!(self, StoreKey::PairTest { .. })
    }
}

impl Display for StoreKey {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            StoreKey::RawUnion => write!(f, "allc/raw"),
            StoreKey::Filtered => write!(f, "allc/filtered"),
            StoreKey::PairTest {
                chr,
                sample_x,
                sample_y,
            } => write!(f, "fisher/{}/{}/{}", chr, sample_x, sample_y),
            StoreKey::Combined => write!(f, "fisher/combined"),
            StoreKey::Adjusted => write!(f, "fisher/adjusted"),
        }
    }
}
