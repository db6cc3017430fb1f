//! Safe field access and division.
//!
//! Statement data is patchy: metrics go missing, providers write `"None"`,
//! denominators are zero. [`safe_get`] and [`safe_divide`] turn those cases
//! into defaults instead of failures. Only a value that is present but
//! cannot be read as a number is an error, and it fails just its own cell.

use crate::types::MergedRecord;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Marker the statement provider writes for a missing value.
pub const MISSING_MARKER: &str = "None";

/// Why a division fell back to zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// An operand is not a number
    #[error("could not convert {0} to float")]
    NonNumeric(String),

    /// The denominator is zero
    #[error("float division by zero")]
    DivisionByZero,

    /// The quotient overflowed or is NaN
    #[error("division result is not finite")]
    NonFinite,
}

/// Failure computing one (date, ticker) cell.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    /// A field is present but does not hold a number
    #[error("could not convert field '{field}' value {value} to float")]
    InvalidNumber {
        /// Field name
        field: String,
        /// Raw JSON value
        value: String,
    },

    /// A ratio computed without safe division overflowed or produced NaN
    #[error("{ratio} is not finite ({value})")]
    NonFinite {
        /// Ratio name
        ratio: String,
        /// Offending value
        value: f64,
    },
}

/// A value that can take part in a safe division.
pub trait Operand {
    /// Convert to a float.
    ///
    /// # Errors
    ///
    /// Returns [`ArithmeticError::NonNumeric`] when the value has no numeric
    /// reading.
    fn to_f64(&self) -> Result<f64, ArithmeticError>;
}

impl Operand for f64 {
    fn to_f64(&self) -> Result<f64, ArithmeticError> {
        Ok(*self)
    }
}

macro_rules! lossy_operand {
    ($($ty:ty),*) => {
        $(
            impl Operand for $ty {
                fn to_f64(&self) -> Result<f64, ArithmeticError> {
                    Ok(*self as f64)
                }
            }
        )*
    };
}

lossy_operand!(f32, i32, i64, u32, u64);

impl Operand for str {
    fn to_f64(&self) -> Result<f64, ArithmeticError> {
        self.trim()
            .parse()
            .map_err(|_| ArithmeticError::NonNumeric(format!("{self:?}")))
    }
}

impl Operand for String {
    fn to_f64(&self) -> Result<f64, ArithmeticError> {
        self.as_str().to_f64()
    }
}

impl Operand for Value {
    fn to_f64(&self) -> Result<f64, ArithmeticError> {
        match self {
            Self::Number(n) => n
                .as_f64()
                .ok_or_else(|| ArithmeticError::NonNumeric(n.to_string())),
            Self::String(s) => s.to_f64(),
            Self::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Null | Self::Array(_) | Self::Object(_) => {
                Err(ArithmeticError::NonNumeric(self.to_string()))
            }
        }
    }
}

impl<T: Operand + ?Sized> Operand for &T {
    fn to_f64(&self) -> Result<f64, ArithmeticError> {
        (**self).to_f64()
    }
}

/// Divide two operands as floats.
///
/// # Errors
///
/// Returns an [`ArithmeticError`] for a non-numeric operand, a zero
/// denominator or a quotient that is not finite.
pub fn try_divide<N, D>(numerator: &N, denominator: &D) -> Result<f64, ArithmeticError>
where
    N: Operand + ?Sized,
    D: Operand + ?Sized,
{
    let numerator = numerator.to_f64()?;
    let denominator = denominator.to_f64()?;
    if denominator == 0.0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    let quotient = numerator / denominator;
    if !quotient.is_finite() {
        return Err(ArithmeticError::NonFinite);
    }
    Ok(quotient)
}

/// Divide two operands, returning 0 when the division is not possible.
///
/// ```
/// use finratios::ratios::safe_divide;
///
/// assert_eq!(safe_divide(10, 2), 5.0);
/// assert_eq!(safe_divide(10, 0), 0.0);
/// assert_eq!(safe_divide("x", 2), 0.0);
/// ```
pub fn safe_divide(numerator: impl Operand, denominator: impl Operand) -> f64 {
    try_divide(&numerator, &denominator).unwrap_or_else(|error| {
        debug!(%error, "division fell back to zero");
        0.0
    })
}

/// Outcome of reading one metric from a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fetched {
    /// The record held a number
    Present(f64),
    /// The metric was missing and the default was used
    Defaulted(f64),
}

impl Fetched {
    /// The value to compute with.
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Present(v) | Self::Defaulted(v) => v,
        }
    }

    /// Whether the default was substituted.
    #[must_use]
    pub const fn is_defaulted(self) -> bool {
        matches!(self, Self::Defaulted(_))
    }
}

/// Read a metric, substituting `default` when it is absent, `null` or
/// [`MISSING_MARKER`].
///
/// # Errors
///
/// Returns [`CellError::InvalidNumber`] when the field holds something that
/// cannot be read as a number.
pub fn safe_get(record: &MergedRecord, field: &str, default: f64) -> Result<Fetched, CellError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(Fetched::Defaulted(default)),
        Some(Value::String(s)) if s == MISSING_MARKER => Ok(Fetched::Defaulted(default)),
        Some(value) => value
            .to_f64()
            .map(Fetched::Present)
            .map_err(|_| CellError::InvalidNumber {
                field: field.to_string(),
                value: value.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use serde_json::json;

    fn record(value: Value) -> MergedRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_safe_divide_basic() {
        assert_relative_eq!(safe_divide(10, 2), 5.0);
        assert_eq!(safe_divide(10, 0), 0.0);
        assert_eq!(safe_divide("x", 2), 0.0);
    }

    #[rstest]
    #[case(json!(10), json!(4), 2.5)]
    #[case(json!("10"), json!("4"), 2.5)]
    #[case(json!(10), json!(0), 0.0)]
    #[case(json!(10), json!(null), 0.0)]
    #[case(json!("abc"), json!(4), 0.0)]
    #[case(json!(-3.0), json!(1.5), -2.0)]
    fn test_safe_divide_json_operands(
        #[case] numerator: Value,
        #[case] denominator: Value,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(safe_divide(&numerator, &denominator), expected);
    }

    #[test]
    fn test_try_divide_reports_cause() {
        assert_eq!(
            try_divide(&1.0, &0.0),
            Err(ArithmeticError::DivisionByZero)
        );
        assert_eq!(
            try_divide("x", &2.0),
            Err(ArithmeticError::NonNumeric("\"x\"".to_string()))
        );
        assert_eq!(try_divide(&-0.0, &1.0), Ok(-0.0));
    }

    #[rstest]
    #[case(json!(1e308), json!(1e-308))]
    #[case(json!(-1e308), json!(0.5))]
    #[case(json!("inf"), json!(2))]
    #[case(json!("NaN"), json!(2))]
    fn test_non_finite_quotient_falls_back(#[case] numerator: Value, #[case] denominator: Value) {
        assert_eq!(
            try_divide(&numerator, &denominator),
            Err(ArithmeticError::NonFinite)
        );
        assert_eq!(safe_divide(&numerator, &denominator), 0.0);
    }

    #[test]
    fn test_safe_get_missing_values() {
        let metrics = record(json!({"netIncome": "None", "totalRevenue": null}));

        assert_eq!(
            safe_get(&metrics, "netIncome", 0.0),
            Ok(Fetched::Defaulted(0.0))
        );
        assert_eq!(
            safe_get(&metrics, "totalRevenue", 7.0),
            Ok(Fetched::Defaulted(7.0))
        );
        assert_eq!(
            safe_get(&metrics, "operatingCashflow", 0.0),
            Ok(Fetched::Defaulted(0.0))
        );
    }

    #[test]
    fn test_safe_get_parses_values() {
        let metrics = record(json!({"netIncome": "123.5", "totalRevenue": 900}));

        let fetched = safe_get(&metrics, "netIncome", 0.0).unwrap();
        assert!(!fetched.is_defaulted());
        assert_relative_eq!(fetched.value(), 123.5);
        assert_relative_eq!(safe_get(&metrics, "totalRevenue", 0.0).unwrap().value(), 900.0);
    }

    #[test]
    fn test_safe_get_rejects_garbage() {
        let metrics = record(json!({"netIncome": "n/a"}));

        let err = safe_get(&metrics, "netIncome", 0.0).unwrap_err();
        assert_eq!(
            err,
            CellError::InvalidNumber {
                field: "netIncome".to_string(),
                value: "\"n/a\"".to_string(),
            }
        );
    }
}
