use polars::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

/// Columns of pairwise Fisher test results.
///
/// `PAdj` is only present in the corrected table, see
/// [`PairColumns::adjusted_colnames`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PairColumns {
    Chr,
    Position,
    SampleX,
    SampleY,
    CountMX,
    CountTotalX,
    CountMY,
    CountTotalY,
    PValue,
    PAdj,
}

impl PairColumns {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PairColumns::Chr => "chr",
            PairColumns::Position => "position",
            PairColumns::SampleX => "sample_x",
            PairColumns::SampleY => "sample_y",
            PairColumns::CountMX => "count_m_x",
            PairColumns::CountTotalX => "count_total_x",
            PairColumns::CountMY => "count_m_y",
            PairColumns::CountTotalY => "count_total_y",
            PairColumns::PValue => "pvalue",
            PairColumns::PAdj => "padj",
        }
    }

    pub const fn dtype(&self) -> DataType {
        match self {
            PairColumns::Chr | PairColumns::SampleX | PairColumns::SampleY => {
                DataType::String
            },
            PairColumns::Position => DataType::UInt64,
            PairColumns::CountMX
            | PairColumns::CountTotalX
            | PairColumns::CountMY
            | PairColumns::CountTotalY => DataType::UInt32,
            PairColumns::PValue | PairColumns::PAdj => DataType::Float64,
        }
    }

    /// Columns of a single pair result, in storage order.
    pub const fn result_columns() -> [PairColumns; 9] {
        [
            PairColumns::Chr,
            PairColumns::Position,
            PairColumns::SampleX,
            PairColumns::SampleY,
            PairColumns::CountMX,
            PairColumns::CountTotalX,
            PairColumns::CountMY,
            PairColumns::CountTotalY,
            PairColumns::PValue,
        ]
    }

    pub fn result_colnames() -> Vec<&'static str> {
        Self::result_columns()
            .iter()
            .map(|c| c.as_str())
            .collect()
    }

    pub fn adjusted_colnames() -> Vec<&'static str> {
        let mut names = Self::result_colnames();
        names.push(PairColumns::PAdj.as_str());
        names
    }

    #[inline(always)]
    pub fn col(&self) -> Expr {
        col(self.as_str())
    }
}

/// Number of differentially methylated positions found for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSummary {
    pub sample_x:  String,
    pub sample_y:  String,
    pub dmp_count: usize,
}

impl PairSummary {
    pub fn new(
        sample_x: &str,
        sample_y: &str,
        dmp_count: usize,
    ) -> Self {
        Self {
            sample_x: sample_x.to_string(),
            sample_y: sample_y.to_string(),
            dmp_count,
        }
    }
}
