use itertools::Itertools;
use polars::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use super::typedef::{
    CountType,
    PosType,
};

/// A single methylation call of one sample at one genomic position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethylationRecord {
    pub chr:         String,
    pub position:    PosType,
    pub count_m:     CountType,
    pub count_total: CountType,
    pub is_meth:     bool,
    pub sample:      String,
}

impl MethylationRecord {
    pub fn new(
        chr: &str,
        position: PosType,
        count_m: CountType,
        count_total: CountType,
        is_meth: bool,
        sample: &str,
    ) -> Self {
        Self {
            chr: chr.to_string(),
            position,
            count_m,
            count_total,
            is_meth,
            sample: sample.to_string(),
        }
    }

    /// Methylated reads can never exceed total reads.
    pub fn is_valid(&self) -> bool {
        self.count_m <= self.count_total
    }

    /// Number of unmethylated reads.
    pub fn count_um(&self) -> CountType {
        self.count_total.saturating_sub(self.count_m)
    }
}

/// Columns of the raw and filtered allC tables kept in the store.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AllcColumns {
    Chr,
    Position,
    CountM,
    CountTotal,
    IsMeth,
    Sample,
}

impl AllcColumns {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AllcColumns::Chr => "chr",
            AllcColumns::Position => "position",
            AllcColumns::CountM => "count_m",
            AllcColumns::CountTotal => "count_total",
            AllcColumns::IsMeth => "is_meth",
            AllcColumns::Sample => "sample",
        }
    }

    pub const fn dtype(&self) -> DataType {
        match self {
            AllcColumns::Chr => DataType::String,
            AllcColumns::Position => DataType::UInt64,
            AllcColumns::CountM => DataType::UInt32,
            AllcColumns::CountTotal => DataType::UInt32,
            AllcColumns::IsMeth => DataType::Boolean,
            AllcColumns::Sample => DataType::String,
        }
    }

    pub const fn all() -> [AllcColumns; 6] {
        [
            AllcColumns::Chr,
            AllcColumns::Position,
            AllcColumns::CountM,
            AllcColumns::CountTotal,
            AllcColumns::IsMeth,
            AllcColumns::Sample,
        ]
    }

    pub fn colnames() -> Vec<&'static str> {
        Self::all().iter().map(|c| c.as_str()).collect()
    }

    #[inline(always)]
    pub fn col(&self) -> Expr {
        col(self.as_str())
    }
}

/// Builds an allC table from records, one row per record.
pub fn records_to_frame(records: &[MethylationRecord]) -> PolarsResult<DataFrame> {
    let chr = records.iter().map(|r| r.chr.as_str()).collect_vec();
    let position = records.iter().map(|r| r.position).collect_vec();
    let count_m = records.iter().map(|r| r.count_m).collect_vec();
    let count_total = records.iter().map(|r| r.count_total).collect_vec();
    let is_meth = records.iter().map(|r| r.is_meth).collect_vec();
    let sample = records.iter().map(|r| r.sample.as_str()).collect_vec();

    DataFrame::new(vec![
        Column::new(AllcColumns::Chr.as_str().into(), chr),
        Column::new(AllcColumns::Position.as_str().into(), position),
        Column::new(AllcColumns::CountM.as_str().into(), count_m),
        Column::new(AllcColumns::CountTotal.as_str().into(), count_total),
        Column::new(AllcColumns::IsMeth.as_str().into(), is_meth),
        Column::new(AllcColumns::Sample.as_str().into(), sample),
    ])
}
