//! Cross-ticker concatenation.
//!
//! Fans the per-ticker aligned records of the whole universe into one
//! date -> ticker table and stamps each cell with its adjusted close.

use crate::{
    PipelineError, Result,
    asof::as_of,
    types::{ADJ_CLOSE, ConcatenatedTable, DatedRecords, PriceSeries, Ticker, Universe},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How a cell's adjusted close is looked up.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceFill {
    /// Only the price quoted on the cell's own date
    #[default]
    #[display("exact")]
    Exact,
    /// The latest non-null price on or before the cell's date
    #[display("fill-forward")]
    FillForward,
}

impl FromStr for PriceFill {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "fill-forward" | "ffill" => Ok(Self::FillForward),
            other => Err(PipelineError::InvalidOption(format!(
                "unknown price fill '{other}' (expected exact or fill-forward)"
            ))),
        }
    }
}

/// Outcome counts of one concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConcatSummary {
    /// Tickers in the universe
    pub tickers: usize,
    /// Tickers without aligned records, left out of the table
    pub skipped: Vec<Ticker>,
    /// Cells written
    pub cells: usize,
    /// Cells whose adjusted close was written as `null`
    pub missing_prices: usize,
    /// Cells priced from an earlier date
    pub filled_prices: usize,
}

/// Builds the [`ConcatenatedTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Concatenator {
    price_fill: PriceFill,
}

impl Concatenator {
    /// Creates a concatenator.
    #[must_use]
    pub const fn new(price_fill: PriceFill) -> Self {
        Self { price_fill }
    }

    /// The active price lookup mode.
    #[must_use]
    pub const fn price_fill(&self) -> PriceFill {
        self.price_fill
    }

    /// Concatenate the aligned records of every ticker in `universe` over
    /// the dates of `prices`.
    ///
    /// Tickers missing from `aligned` are logged, listed in
    /// [`ConcatSummary::skipped`] and contribute no cells.
    pub fn concatenate(
        &self,
        prices: &PriceSeries,
        universe: &Universe,
        aligned: &BTreeMap<Ticker, DatedRecords>,
    ) -> (ConcatenatedTable, ConcatSummary) {
        let mut summary = ConcatSummary {
            tickers: universe.len(),
            ..ConcatSummary::default()
        };
        let mut cells = Vec::new();

        for ticker in universe.iter() {
            let Some(records) = aligned.get(ticker) else {
                warn!(%ticker, "no aligned statements, skipping ticker");
                summary.skipped.push(ticker.clone());
                continue;
            };

            let history = match self.price_fill {
                PriceFill::Exact => BTreeMap::new(),
                PriceFill::FillForward => prices.history(ticker),
            };

            let before = cells.len();
            for date in prices.dates() {
                let Some(record) = records.get(&date) else {
                    continue;
                };

                let close = prices.adj_close(date, ticker).or_else(|| {
                    let (_, close) = as_of(&history, date)?;
                    summary.filled_prices += 1;
                    Some(*close)
                });
                if close.is_none() {
                    summary.missing_prices += 1;
                }

                let mut record = record.clone();
                record.insert(
                    ADJ_CLOSE,
                    close
                        .and_then(Number::from_f64)
                        .map_or(Value::Null, Value::Number),
                );
                cells.push((date, ticker.clone(), record));
            }
            debug!(%ticker, cells = cells.len() - before, "concatenated ticker");
        }

        summary.cells = cells.len();
        info!(
            tickers = summary.tickers,
            skipped = summary.skipped.len(),
            cells = summary.cells,
            missing_prices = summary.missing_prices,
            "concatenated universe"
        );
        (cells.into_iter().collect(), summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DATE_FORMAT, MergedRecord};
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn prices() -> PriceSeries {
        serde_json::from_value(json!({
            "2024-01-02": {"AAA": 10.0, "BBB": 20.0},
            "2024-01-03": {"AAA": null, "BBB": 21.0},
            "2024-01-04": {"AAA": 12.0}
        }))
        .unwrap()
    }

    fn aligned_on(dates: &[&str]) -> DatedRecords {
        dates
            .iter()
            .map(|d| {
                let record: MergedRecord = [("netIncome", json!(5.0))].into_iter().collect();
                (date(d), record)
            })
            .collect()
    }

    #[test]
    fn test_injects_exact_price() {
        let universe: Universe = ["AAA", "BBB"].into_iter().collect();
        let aligned = BTreeMap::from([
            (Ticker::from("AAA"), aligned_on(&["2024-01-02", "2024-01-03"])),
            (Ticker::from("BBB"), aligned_on(&["2024-01-03"])),
        ]);

        let (table, summary) = Concatenator::default().concatenate(&prices(), &universe, &aligned);

        let aaa = Ticker::from("AAA");
        let cell = table.get(date("2024-01-02"), &aaa).unwrap();
        assert_eq!(cell.get(ADJ_CLOSE), Some(&json!(10.0)));
        assert_eq!(cell.get("netIncome"), Some(&json!(5.0)));

        assert_eq!(
            table.get(date("2024-01-03"), &aaa).unwrap().get(ADJ_CLOSE),
            Some(&Value::Null)
        );
        assert_eq!(summary.cells, 3);
        assert_eq!(summary.missing_prices, 1);
        assert_eq!(summary.filled_prices, 0);
        assert!(table.get(date("2024-01-02"), &Ticker::from("BBB")).is_none());
    }

    #[test]
    fn test_fill_forward_price() {
        let universe: Universe = ["AAA"].into_iter().collect();
        let aligned = BTreeMap::from([(Ticker::from("AAA"), aligned_on(&["2024-01-03"]))]);

        let (table, summary) =
            Concatenator::new(PriceFill::FillForward).concatenate(&prices(), &universe, &aligned);

        let cell = table.get(date("2024-01-03"), &Ticker::from("AAA")).unwrap();
        assert_eq!(cell.get(ADJ_CLOSE), Some(&json!(10.0)));
        assert_eq!(summary.filled_prices, 1);
        assert_eq!(summary.missing_prices, 0);
    }

    #[test]
    fn test_missing_ticker_is_skipped() {
        let universe: Universe = ["AAA", "ZZZ"].into_iter().collect();
        let aligned = BTreeMap::from([(Ticker::from("AAA"), aligned_on(&["2024-01-04"]))]);

        let (table, summary) = Concatenator::default().concatenate(&prices(), &universe, &aligned);

        let zzz = Ticker::from("ZZZ");
        assert!(!table.contains_ticker(&zzz));
        assert_eq!(summary.skipped, [zzz]);
        assert_eq!(summary.tickers, 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_price_fill_parsing() {
        assert_eq!("fill-forward".parse::<PriceFill>().unwrap(), PriceFill::FillForward);
        assert_eq!("EXACT".parse::<PriceFill>().unwrap(), PriceFill::Exact);
        assert!("nearest".parse::<PriceFill>().is_err());
        assert_eq!(PriceFill::FillForward.to_string(), "fill-forward");
    }
}
