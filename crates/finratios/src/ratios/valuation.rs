//! Valuation ratios.
//!
//! Per-share book value and dividend rate are intermediates: they are
//! computed for every cell but only the price-relative ratios built on top
//! of them are written out.

use super::{
    safe::CellError,
    traits::{CellDiagnostics, CellInputs, Metric, Ratio, RatioCategory},
};

/// Book Value per Share.
///
/// ```text
/// BVPS = Total Shareholder Equity / Common Shares Outstanding
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BookValuePerShare;

impl Ratio for BookValuePerShare {
    fn name(&self) -> &str {
        "BookValuePerShare"
    }

    fn description(&self) -> &str {
        "Book value per share - shareholders' equity divided by shares outstanding"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Valuation
    }

    fn inputs(&self) -> &[Metric] {
        &[Metric::TotalEquity, Metric::SharesOutstanding]
    }

    fn reported(&self) -> bool {
        false
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        Ok(diagnostics.divide(
            self.name(),
            inputs.get(Metric::TotalEquity),
            inputs.get(Metric::SharesOutstanding),
        ))
    }
}

/// Market-to-Book.
///
/// ```text
/// MarketToBook = Adj Close / BVPS
/// ```
///
/// When book value per share falls back to zero, so does this ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketToBook;

impl Ratio for MarketToBook {
    fn name(&self) -> &str {
        "MarketToBook"
    }

    fn description(&self) -> &str {
        "Market-to-Book - adjusted close divided by book value per share"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Valuation
    }

    fn inputs(&self) -> &[Metric] {
        &[
            Metric::AdjClose,
            Metric::TotalEquity,
            Metric::SharesOutstanding,
        ]
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        let book_value = BookValuePerShare.compute(inputs, diagnostics)?;
        Ok(diagnostics.divide(self.name(), inputs.get(Metric::AdjClose), book_value))
    }
}

/// Dividend Rate.
///
/// ```text
/// DividendRate = Dividends Paid / Common Shares Outstanding
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DividendRate;

impl Ratio for DividendRate {
    fn name(&self) -> &str {
        "DividendRate"
    }

    fn description(&self) -> &str {
        "Dividend per share - common dividends paid divided by shares outstanding"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Valuation
    }

    fn inputs(&self) -> &[Metric] {
        &[Metric::DividendsPaid, Metric::SharesOutstanding]
    }

    fn reported(&self) -> bool {
        false
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        Ok(diagnostics.divide(
            self.name(),
            inputs.get(Metric::DividendsPaid),
            inputs.get(Metric::SharesOutstanding),
        ))
    }
}

/// Dividend Yield.
///
/// ```text
/// DividendYield = DividendRate / Adj Close
/// ```
///
/// Uses the statement period's dividends, not a trailing twelve month sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct DividendYield;

impl Ratio for DividendYield {
    fn name(&self) -> &str {
        "DividendYield"
    }

    fn description(&self) -> &str {
        "Dividend yield - dividend per share divided by adjusted close"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Valuation
    }

    fn inputs(&self) -> &[Metric] {
        &[
            Metric::DividendsPaid,
            Metric::SharesOutstanding,
            Metric::AdjClose,
        ]
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        let rate = DividendRate.compute(inputs, diagnostics)?;
        Ok(diagnostics.divide(self.name(), rate, inputs.get(Metric::AdjClose)))
    }
}
