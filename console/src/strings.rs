macro_rules! define_strings {
    (
        $($name:ident = $value:literal);*$(;)?
    ) => {
        $(
            pub const $name: &str = $value;
        )*
    };
}

pub mod dmp {
    define_strings! {
        ALLC_DIR =
            "Directory with the allC files of all samples. Sample `S` is read \
            from `allc_S.tsv`, or `allc_S_covN.tsv` when a minimum coverage \
            is set. Gzip-compressed files (`.tsv.gz`) are also accepted.";
        SAMPLES =
            "Labels of the samples to compare. At least two unique labels are \
            required. Every pair is tested once, in the order given.";
        OUT_ID =
            "Identifier of the run. Names the checkpoint store \
            (`store_ID.bsxdmp`) and both result files.";
        OUT_DIR =
            "Directory for the checkpoint store and the result files.";
        MIN_COV =
            "Minimum coverage. Reads the `_covN` allC files and discards \
            positions with fewer than N reads.";
        FDR =
            "False discovery rate threshold. Positions with a \
            Benjamini-Hochberg adjusted p-value not above this value are \
            reported as DMPs.";
        CHROMOSOMES =
            "Comma-separated list of chromosomes to test.";
    }
}

pub mod utils {
    define_strings! {
        THREADS =
            "Number of threads used for pairwise tests. 0 uses all available \
            cores.";
        VERBOSE =
            "Print debug messages.";
    }
}
