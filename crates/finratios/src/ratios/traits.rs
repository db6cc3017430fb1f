//! Core trait definitions for ratios.
//!
//! Every ratio implements [`Ratio`]. A ratio reads the eight statement
//! inputs of one cell through [`CellInputs`] and records any division that
//! had to fall back to zero in [`CellDiagnostics`].

use super::safe::{ArithmeticError, CellError, Operand, safe_get, try_divide};
use crate::types::{ADJ_CLOSE, MergedRecord};
use derive_more::Display;
use serde::Serialize;
use tracing::{debug, info};

/// Ratio category for grouping related ratios.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RatioCategory {
    /// Profitability - earnings relative to equity or sales
    Profitability,
    /// Leverage - debt load and debt coverage
    Leverage,
    /// Valuation - per-share book and dividend measures against price
    Valuation,
    /// Size - market capitalization
    Size,
    /// Price - raw market inputs carried into the output
    Price,
}

/// The statement fields every cell is read from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    /// Total shareholder equity
    #[display("totalShareholderEquity")]
    TotalEquity,
    /// Short plus long term debt
    #[display("shortLongTermDebtTotal")]
    TotalDebt,
    /// Net income
    #[display("netIncome")]
    NetIncome,
    /// Operating cash flow
    #[display("operatingCashflow")]
    OperatingCashflow,
    /// Total revenue
    #[display("totalRevenue")]
    TotalRevenue,
    /// Dividends paid to common shareholders
    #[display("dividendPayoutCommonStock")]
    DividendsPaid,
    /// Common shares outstanding
    #[display("commonStockSharesOutstanding")]
    SharesOutstanding,
    /// Adjusted close on the cell's date
    #[display("Adj Close")]
    AdjClose,
}

impl Metric {
    /// All metrics, in extraction order.
    pub const ALL: [Self; 8] = [
        Self::TotalEquity,
        Self::TotalDebt,
        Self::NetIncome,
        Self::OperatingCashflow,
        Self::TotalRevenue,
        Self::DividendsPaid,
        Self::SharesOutstanding,
        Self::AdjClose,
    ];

    /// Name of the field in a merged record.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::TotalEquity => "totalShareholderEquity",
            Self::TotalDebt => "shortLongTermDebtTotal",
            Self::NetIncome => "netIncome",
            Self::OperatingCashflow => "operatingCashflow",
            Self::TotalRevenue => "totalRevenue",
            Self::DividendsPaid => "dividendPayoutCommonStock",
            Self::SharesOutstanding => "commonStockSharesOutstanding",
            Self::AdjClose => ADJ_CLOSE,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// A division that fell back to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionFallback {
    /// Ratio being computed
    pub ratio: String,
    /// What went wrong
    pub error: ArithmeticError,
}

/// What had to be papered over while computing one cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellDiagnostics {
    /// Metrics that were missing and took the default
    pub defaulted: Vec<Metric>,
    /// Divisions that returned zero
    pub fallbacks: Vec<DivisionFallback>,
}

impl CellDiagnostics {
    /// Divide for `ratio`, recording a fallback instead of failing.
    pub fn divide(&mut self, ratio: &str, numerator: impl Operand, denominator: impl Operand) -> f64 {
        match try_divide(&numerator, &denominator) {
            Ok(value) => value,
            Err(error) => {
                debug!(ratio, %error, "division fell back to zero");
                self.fallbacks.push(DivisionFallback {
                    ratio: ratio.to_string(),
                    error,
                });
                0.0
            }
        }
    }

    /// Whether anything was defaulted or fell back.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.defaulted.is_empty() && self.fallbacks.is_empty()
    }
}

/// The eight statement inputs of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellInputs {
    values: [f64; 8],
}

impl CellInputs {
    /// Read every [`Metric`] from `record`, substituting `default` for
    /// missing ones.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::InvalidNumber`] when a field holds a value that is
    /// not a number.
    pub fn extract(
        record: &MergedRecord,
        default: f64,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<Self, CellError> {
        let mut values = [default; 8];
        for metric in Metric::ALL {
            let fetched = safe_get(record, metric.field(), default)?;
            if fetched.is_defaulted() {
                info!(field = metric.field(), default, "missing value, defaulting");
                diagnostics.defaulted.push(metric);
            }
            values[metric.index()] = fetched.value();
        }
        Ok(Self { values })
    }

    /// Value of one metric.
    #[must_use]
    pub const fn get(&self, metric: Metric) -> f64 {
        self.values[metric.index()]
    }
}

impl FromIterator<(Metric, f64)> for CellInputs {
    /// Metrics not listed are zero.
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        let mut inputs = Self::default();
        for (metric, value) in iter {
            inputs.values[metric.index()] = value;
        }
        inputs
    }
}

/// A ratio derived from one cell's statement inputs.
pub trait Ratio: Send + Sync + std::fmt::Debug {
    /// Key of the ratio in the output record.
    ///
    /// Must be stable across versions, downstream files are keyed by it.
    fn name(&self) -> &str;

    /// Human-readable description of what this ratio measures.
    fn description(&self) -> &str;

    /// Ratio category for grouping.
    fn category(&self) -> RatioCategory;

    /// Metrics the ratio reads.
    fn inputs(&self) -> &[Metric];

    /// Whether the ratio appears in the output record.
    ///
    /// Intermediates such as book value per share are computed but not
    /// written.
    fn reported(&self) -> bool {
        true
    }

    /// Compute the ratio for one cell.
    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError>;
}
