use adjustp::Procedure;
use log::*;
use statrs::function::factorial::ln_binomial;

/// Relative tolerance under which two table probabilities are considered
/// equal when summing the two-sided tail.
const FISHER_REL_TOLERANCE: f64 = 1e-7;

/// 2x2 contingency table `[[a, b], [c, d]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}

impl ContingencyTable {
    pub fn new(
        a: u64,
        b: u64,
        c: u64,
        d: u64,
    ) -> Self {
        Self { a, b, c, d }
    }

    /// Table of methylated (first row) and unmethylated (second row) read
    /// counts, with one column per sample.
    ///
    /// Methylated counts must not exceed totals.
    pub fn from_counts(
        count_m_x: u32,
        count_total_x: u32,
        count_m_y: u32,
        count_total_y: u32,
    ) -> Self {
        debug_assert!(count_m_x <= count_total_x && count_m_y <= count_total_y);
        Self {
            a: count_m_x as u64,
            b: count_m_y as u64,
            c: count_total_x.saturating_sub(count_m_x) as u64,
            d: count_total_y.saturating_sub(count_m_y) as u64,
        }
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    /// True if any row or column sums to zero.
    pub fn has_zero_margin(&self) -> bool {
        self.a + self.b == 0
            || self.c + self.d == 0
            || self.a + self.c == 0
            || self.b + self.d == 0
    }
}

/// Two-sided Fisher exact test.
///
/// Sums the hypergeometric probabilities of every table with the observed
/// margins which is not more likely than the observed one. Tables with a
/// zero margin carry no information and yield `1.0`.
pub fn fisher_exact(table: &ContingencyTable) -> f64 {
    if table.has_zero_margin() {
        return 1.0;
    }

    let row1 = table.a + table.b;
    let row2 = table.c + table.d;
    let col1 = table.a + table.c;
    let n = table.total();

    // `a` follows Hypergeometric(n, row1, col1)
    let k_min = col1.saturating_sub(row2);
    let k_max = row1.min(col1);
    let ln_denominator = ln_binomial(n, col1);
    let ln_pmf = |k: u64| {
        ln_binomial(row1, k) + ln_binomial(row2, col1 - k) - ln_denominator
    };

    let ln_observed = ln_pmf(table.a);
    let ln_threshold = ln_observed + FISHER_REL_TOLERANCE.ln_1p();

    let pvalue: f64 = (k_min..=k_max)
        .map(ln_pmf)
        .filter(|ln_p| *ln_p <= ln_threshold)
        .map(f64::exp)
        .sum();
    pvalue.min(1.0)
}

/// Benjamini-Hochberg adjustment over the whole population of p-values.
///
/// The returned vector is in the same order as the input.
pub fn adjust_pvalues(pvalues: &[f64]) -> Vec<f64> {
    if pvalues.is_empty() {
        warn!("No p-values to adjust");
        return Vec::new();
    }
    debug!("Adjusting {} p-values (Benjamini-Hochberg)", pvalues.len());
    adjustp::adjust(pvalues, Procedure::BenjaminiHochberg)
}
