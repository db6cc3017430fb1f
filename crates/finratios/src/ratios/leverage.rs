//! Leverage ratios.
//!
//! Debt-to-equity measures how much of the balance sheet is financed by
//! debt; operating cash flow to debt measures how comfortably it is serviced.

use super::{
    safe::CellError,
    traits::{CellDiagnostics, CellInputs, Metric, Ratio, RatioCategory},
};

/// Debt-to-Equity.
///
/// ```text
/// DebtToEquity = (Short + Long Term Debt) / Total Shareholder Equity
/// ```
///
/// Lower values indicate a more conservative capital structure, though the
/// usual range varies by industry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebtToEquity;

impl Ratio for DebtToEquity {
    fn name(&self) -> &str {
        "DebtToEquity"
    }

    fn description(&self) -> &str {
        "Debt-to-Equity - total debt divided by shareholders' equity"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Leverage
    }

    fn inputs(&self) -> &[Metric] {
        &[Metric::TotalDebt, Metric::TotalEquity]
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        Ok(diagnostics.divide(
            self.name(),
            inputs.get(Metric::TotalDebt),
            inputs.get(Metric::TotalEquity),
        ))
    }
}

/// Operating Cash Flow to Debt.
///
/// ```text
/// OperatingCashFlowDebt = Operating Cash Flow / (Short + Long Term Debt)
/// ```
///
/// Debt-free companies get 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatingCashFlowDebt;

impl Ratio for OperatingCashFlowDebt {
    fn name(&self) -> &str {
        "OperatingCashFlowDebt"
    }

    fn description(&self) -> &str {
        "Operating cash flow divided by total debt - ability to service debt from operations"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Leverage
    }

    fn inputs(&self) -> &[Metric] {
        &[Metric::OperatingCashflow, Metric::TotalDebt]
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        Ok(diagnostics.divide(
            self.name(),
            inputs.get(Metric::OperatingCashflow),
            inputs.get(Metric::TotalDebt),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_debt_to_equity_metadata() {
        let ratio = DebtToEquity;
        assert_eq!(ratio.name(), "DebtToEquity");
        assert_eq!(ratio.category(), RatioCategory::Leverage);
        assert_eq!(ratio.inputs(), [Metric::TotalDebt, Metric::TotalEquity]);
    }

    #[test]
    fn test_debt_to_equity_computation() {
        let inputs: CellInputs = [(Metric::TotalDebt, 50000.0), (Metric::TotalEquity, 100000.0)]
            .into_iter()
            .collect();
        let mut diagnostics = CellDiagnostics::default();

        let value = DebtToEquity.compute(&inputs, &mut diagnostics).unwrap();
        assert_relative_eq!(value, 0.5);
    }

    #[test]
    fn test_operating_cash_flow_debt() {
        let inputs: CellInputs = [
            (Metric::OperatingCashflow, 30.0),
            (Metric::TotalDebt, 120.0),
        ]
        .into_iter()
        .collect();
        let mut diagnostics = CellDiagnostics::default();

        let value = OperatingCashFlowDebt
            .compute(&inputs, &mut diagnostics)
            .unwrap();
        assert_relative_eq!(value, 0.25);

        let debt_free: CellInputs = [(Metric::OperatingCashflow, 30.0)].into_iter().collect();
        assert_eq!(
            OperatingCashFlowDebt
                .compute(&debt_free, &mut diagnostics)
                .unwrap(),
            0.0
        );
        assert_eq!(diagnostics.fallbacks.len(), 1);
    }
}
