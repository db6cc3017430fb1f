//! Size ratio.

use super::{
    safe::CellError,
    traits::{CellDiagnostics, CellInputs, Metric, Ratio, RatioCategory},
};

/// Market Capitalization.
///
/// ```text
/// MarketCap = Common Shares Outstanding × Adj Close
/// ```
///
/// A plain product with no fallback: a result that overflows to infinity
/// fails the cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketCap;

impl Ratio for MarketCap {
    fn name(&self) -> &str {
        "MarketCap"
    }

    fn description(&self) -> &str {
        "Market capitalization - shares outstanding times adjusted close"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Size
    }

    fn inputs(&self) -> &[Metric] {
        &[Metric::SharesOutstanding, Metric::AdjClose]
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        _diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        let value = inputs.get(Metric::SharesOutstanding) * inputs.get(Metric::AdjClose);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CellError::NonFinite {
                ratio: self.name().to_string(),
                value,
            })
        }
    }
}
