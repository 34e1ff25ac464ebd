pub use crate::data_structs::{
    AllcColumns,
    MethylationRecord,
    PairColumns,
    PairSummary,
};
pub use crate::error::DmpError;
pub use crate::io::allc::{
    allc_file_path,
    read_allc,
};
pub use crate::io::report::{
    read_dmps,
    read_summary,
    DmpRow,
    RunHeader,
    DMP_COLUMNS,
    SUMMARY_COLUMNS,
};
pub use crate::store::{
    CheckpointStore,
    Stage,
    StoreKey,
};
pub use crate::tools::dmp::{
    run_pipeline,
    DmpConfig,
    DmpReport,
    StageOutcome,
};
pub use crate::utils::{
    adjust_pvalues,
    fisher_exact,
    ContingencyTable,
};
