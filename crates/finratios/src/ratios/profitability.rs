//! Profitability ratios.
//!
//! Return on equity and profit margin relate a period's net income to the
//! capital that produced it and to the sales it came from.

use super::{
    safe::CellError,
    traits::{CellDiagnostics, CellInputs, Metric, Ratio, RatioCategory},
};

/// Return on Equity.
///
/// ```text
/// ROE = Net Income / Total Shareholder Equity
/// ```
///
/// Higher ROE suggests efficient use of equity capital to generate profits.
/// Zero equity yields 0 rather than an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnOnEquity;

impl Ratio for ReturnOnEquity {
    fn name(&self) -> &str {
        "ROE"
    }

    fn description(&self) -> &str {
        "Return on Equity - net income divided by shareholders' equity"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Profitability
    }

    fn inputs(&self) -> &[Metric] {
        &[Metric::NetIncome, Metric::TotalEquity]
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        Ok(diagnostics.divide(
            self.name(),
            inputs.get(Metric::NetIncome),
            inputs.get(Metric::TotalEquity),
        ))
    }
}

/// Profit Margin.
///
/// ```text
/// Profit Margin = Net Income / Total Revenue
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfitMargin;

impl Ratio for ProfitMargin {
    fn name(&self) -> &str {
        "ProfitMargin"
    }

    fn description(&self) -> &str {
        "Profit Margin - net income divided by revenue"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Profitability
    }

    fn inputs(&self) -> &[Metric] {
        &[Metric::NetIncome, Metric::TotalRevenue]
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        Ok(diagnostics.divide(
            self.name(),
            inputs.get(Metric::NetIncome),
            inputs.get(Metric::TotalRevenue),
        ))
    }
}
