//! Statement normalizer.
//!
//! Folds the income statement, balance sheet and cash flow reports of one
//! ticker into a single record per fiscal date. Sections are visited in the
//! fixed order of [`Section::ALL`]; when two sections define the same field
//! on the same date the [`CollisionPolicy`] decides which value survives.

use crate::{
    PipelineError, Result,
    types::{DatedRecords, ReportPeriod, Section, StatementBundle, Ticker},
};
use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

/// How to resolve a field defined by more than one section on the same date.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Keep the value of the earliest section
    #[display("first-wins")]
    FirstWins,
    /// Keep the value of the latest section
    #[default]
    #[display("last-wins")]
    LastWins,
    /// Keep the earliest value under the bare name, store later ones under a
    /// section-suffixed name
    #[display("suffix")]
    Suffix,
    /// Abort normalization
    #[display("error")]
    Error,
}

impl FromStr for CollisionPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "first-wins" | "first" => Ok(Self::FirstWins),
            "last-wins" | "last" => Ok(Self::LastWins),
            "suffix" => Ok(Self::Suffix),
            "error" | "error-on-collision" => Ok(Self::Error),
            other => Err(PipelineError::InvalidOption(format!(
                "unknown collision policy '{other}' (expected first-wins, last-wins, suffix or error)"
            ))),
        }
    }
}

/// A field defined by two sections on the same fiscal date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCollision {
    /// Fiscal date
    pub date: NaiveDate,
    /// Field name as delivered
    pub field: String,
    /// Section whose value was already present
    pub kept: Section,
    /// Section that defined the field again
    pub incoming: Section,
}

/// Output of normalizing one bundle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Merged metrics keyed by fiscal date
    pub records: DatedRecords,
    /// Every cross-section collision met along the way
    pub collisions: Vec<FieldCollision>,
}

/// Merges the three statement sections of a bundle by fiscal date.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    policy: CollisionPolicy,
    period: ReportPeriod,
}

impl Normalizer {
    /// Creates a normalizer.
    #[must_use]
    pub const fn new(policy: CollisionPolicy, period: ReportPeriod) -> Self {
        Self { policy, period }
    }

    /// The active collision policy.
    #[must_use]
    pub const fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// The report list being read.
    #[must_use]
    pub const fn period(&self) -> ReportPeriod {
        self.period
    }

    /// Normalize one ticker's bundle.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::FieldCollision`] on the first collision when
    /// the policy is [`CollisionPolicy::Error`].
    pub fn normalize(&self, ticker: &Ticker, bundle: &StatementBundle) -> Result<Normalized> {
        let mut records: DatedRecords = BTreeMap::new();
        let mut owners: BTreeMap<NaiveDate, BTreeMap<String, Section>> = BTreeMap::new();
        let mut collisions = Vec::new();

        for section in Section::ALL {
            let Some(statement) = bundle.section(section) else {
                debug!(%ticker, %section, "section absent");
                continue;
            };

            for report in statement.reports(self.period) {
                let date = report.fiscal_date_ending;
                let record = records.entry(date).or_default();
                let owned = owners.entry(date).or_default();

                for (field, raw) in &report.fields {
                    let value = coerce_numeric(raw);
                    let kept = match owned.get(field) {
                        Some(&kept) if kept != section => kept,
                        _ => {
                            owned.insert(field.clone(), section);
                            record.insert(field.clone(), value);
                            continue;
                        }
                    };

                    let collision = FieldCollision {
                        date,
                        field: field.clone(),
                        kept,
                        incoming: section,
                    };
                    if let Some(key) = self.resolve(ticker, &collision)? {
                        owned.insert(key.clone(), section);
                        record.insert(key, value);
                    }
                    collisions.push(collision);
                }
            }
        }

        Ok(Normalized {
            records,
            collisions,
        })
    }

    /// Key the incoming value is written under, or `None` to drop it.
    fn resolve(&self, ticker: &Ticker, collision: &FieldCollision) -> Result<Option<String>> {
        match self.policy {
            CollisionPolicy::FirstWins => Ok(None),
            CollisionPolicy::LastWins => Ok(Some(collision.field.clone())),
            CollisionPolicy::Suffix => Ok(Some(format!(
                "{}{}",
                collision.field,
                collision.incoming.suffix()
            ))),
            CollisionPolicy::Error => Err(PipelineError::FieldCollision {
                ticker: ticker.clone(),
                date: collision.date,
                field: collision.field.clone(),
                first: collision.kept,
                second: collision.incoming,
            }),
        }
    }
}

/// Coerce a raw statement value to a JSON number, or `null` when it is not
/// numeric.
///
/// Numeric strings parse as floats; booleans map to 1 and 0; non-finite
/// floats, free text, the provider's `"None"` marker and nested values all
/// become `null`.
#[must_use]
pub fn coerce_numeric(raw: &Value) -> Value {
    let parsed = match raw {
        Value::Number(n) => return Value::Number(n.clone()),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}
