//! Financial ratio implementations.
//!
//! Ratios are grouped by what they measure:
//!
//! - **Profitability**: ROE, profit margin
//! - **Leverage**: debt-to-equity, operating cash flow to debt
//! - **Valuation**: market-to-book, dividend yield (and their per-share
//!   intermediates)
//! - **Size**: market capitalization
//! - **Price**: adjusted close passthrough
//!
//! All divisions go through [`safe_divide`] semantics: a zero or
//! non-numeric denominator yields 0 and is recorded in
//! [`CellDiagnostics`].

pub mod leverage;
pub mod price;
pub mod profitability;
pub mod registry;
pub mod safe;
pub mod size;
pub mod traits;
pub mod valuation;

pub use registry::{RatioInfo, RatioRegistry};
pub use safe::{
    ArithmeticError, CellError, Fetched, MISSING_MARKER, Operand, safe_divide, safe_get,
    try_divide,
};
pub use traits::{CellDiagnostics, CellInputs, DivisionFallback, Metric, Ratio, RatioCategory};
