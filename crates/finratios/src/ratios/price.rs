//! Price passthrough.

use super::{
    safe::CellError,
    traits::{CellDiagnostics, CellInputs, Metric, Ratio, RatioCategory},
};

/// The cell's adjusted close, copied into the output unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjClose;

impl Ratio for AdjClose {
    fn name(&self) -> &str {
        Metric::AdjClose.field()
    }

    fn description(&self) -> &str {
        "Adjusted close on the cell's date"
    }

    fn category(&self) -> RatioCategory {
        RatioCategory::Price
    }

    fn inputs(&self) -> &[Metric] {
        &[Metric::AdjClose]
    }

    fn compute(
        &self,
        inputs: &CellInputs,
        _diagnostics: &mut CellDiagnostics,
    ) -> Result<f64, CellError> {
        Ok(inputs.get(Metric::AdjClose))
    }
}
