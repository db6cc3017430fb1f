//! Ratio engine.
//!
//! Runs every reported ratio of a [`RatioRegistry`] over each cell of a
//! [`ConcatenatedTable`]. Cells are independent: a cell that fails is
//! replaced by an error record and the run carries on with the next one.

use crate::{
    ratios::{CellDiagnostics, CellError, CellInputs, RatioRegistry},
    types::{ConcatenatedTable, MergedRecord, Ticker},
};
use chrono::NaiveDate;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::collections::BTreeMap;
use tracing::{info, info_span, warn};

/// Computed ratios of one cell, in registry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatioValues(Vec<(String, f64)>);

impl RatioValues {
    /// Value of the named ratio.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Ratio names in output order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// Number of ratios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no ratio was computed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: impl Into<String>, value: f64) {
        self.0.push((name.into(), value));
    }
}

impl Serialize for RatioValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Output for one (date, ticker) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RatioRecord {
    /// Every reported ratio
    Computed(RatioValues),
    /// The cell could not be computed
    Failed {
        /// `Failed to calculate metrics for <ticker>: <reason>`
        error: String,
    },
}

impl RatioRecord {
    /// The computed values, if the cell succeeded.
    #[must_use]
    pub const fn values(&self) -> Option<&RatioValues> {
        match self {
            Self::Computed(values) => Some(values),
            Self::Failed { .. } => None,
        }
    }

    /// The error message, if the cell failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Computed(_) => None,
            Self::Failed { error } => Some(error),
        }
    }
}

/// Ratios for every cell: date -> ticker -> record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RatioTable(BTreeMap<NaiveDate, BTreeMap<Ticker, RatioRecord>>);

impl RatioTable {
    /// Returns one cell.
    #[must_use]
    pub fn get(&self, date: NaiveDate, ticker: &Ticker) -> Option<&RatioRecord> {
        self.0.get(&date)?.get(ticker)
    }

    /// Iterates every cell, dates ascending then tickers ascending.
    pub fn cells(&self) -> impl Iterator<Item = (NaiveDate, &Ticker, &RatioRecord)> {
        self.0.iter().flat_map(|(date, tickers)| {
            tickers
                .iter()
                .map(move |(ticker, record)| (*date, ticker, record))
        })
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    /// Whether the table has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A cell that was replaced by an error record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellFailure {
    /// Cell date
    pub date: NaiveDate,
    /// Cell ticker
    pub ticker: Ticker,
    /// Message written to the output
    pub error: String,
}

/// What a ratio run papered over.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatioSummary {
    /// Cells visited
    pub cells: usize,
    /// Cells with computed ratios
    pub computed: usize,
    /// Cells replaced by an error record
    pub errored: Vec<CellFailure>,
    /// Missing fields that took the default, over all cells
    pub defaulted_fields: usize,
    /// Cells with at least one defaulted field
    pub defaulted_cells: usize,
    /// Defaulted fields by field name
    pub defaulted_by_field: BTreeMap<String, usize>,
    /// Divisions that fell back to zero
    pub division_fallbacks: usize,
    /// Division fallbacks by ratio name
    pub fallbacks_by_ratio: BTreeMap<String, usize>,
}

impl RatioSummary {
    fn absorb(&mut self, diagnostics: &CellDiagnostics) {
        if !diagnostics.defaulted.is_empty() {
            self.defaulted_cells += 1;
        }
        self.defaulted_fields += diagnostics.defaulted.len();
        for metric in &diagnostics.defaulted {
            *self
                .defaulted_by_field
                .entry(metric.field().to_string())
                .or_default() += 1;
        }

        self.division_fallbacks += diagnostics.fallbacks.len();
        for fallback in &diagnostics.fallbacks {
            *self
                .fallbacks_by_ratio
                .entry(fallback.ratio.clone())
                .or_default() += 1;
        }
    }
}

/// Computes ratios cell by cell.
#[derive(Debug, Clone)]
pub struct RatioEngine {
    registry: RatioRegistry,
    missing_default: f64,
}

impl Default for RatioEngine {
    fn default() -> Self {
        Self::new(RatioRegistry::with_defaults(), 0.0)
    }
}

impl RatioEngine {
    /// Creates an engine that substitutes `missing_default` for missing
    /// statement fields.
    #[must_use]
    pub const fn new(registry: RatioRegistry, missing_default: f64) -> Self {
        Self {
            registry,
            missing_default,
        }
    }

    /// The ratios this engine computes.
    #[must_use]
    pub const fn registry(&self) -> &RatioRegistry {
        &self.registry
    }

    /// Compute every cell of `table`.
    pub fn compute(&self, table: &ConcatenatedTable) -> (RatioTable, RatioSummary) {
        let mut ratios: BTreeMap<NaiveDate, BTreeMap<Ticker, RatioRecord>> = BTreeMap::new();
        let mut summary = RatioSummary::default();

        for (date, ticker, record) in table.cells() {
            let _span = info_span!("cell", %date, %ticker).entered();
            summary.cells += 1;

            let mut diagnostics = CellDiagnostics::default();
            let outcome = self.compute_cell(record, &mut diagnostics);
            summary.absorb(&diagnostics);

            let output = match outcome {
                Ok(values) => {
                    summary.computed += 1;
                    RatioRecord::Computed(values)
                }
                Err(error) => {
                    let message = format!("Failed to calculate metrics for {ticker}: {error}");
                    warn!(%error, "cell failed");
                    summary.errored.push(CellFailure {
                        date,
                        ticker: ticker.clone(),
                        error: message.clone(),
                    });
                    RatioRecord::Failed { error: message }
                }
            };
            ratios.entry(date).or_default().insert(ticker.clone(), output);
        }

        info!(
            cells = summary.cells,
            errored = summary.errored.len(),
            defaulted = summary.defaulted_fields,
            fallbacks = summary.division_fallbacks,
            "computed ratios"
        );
        (RatioTable(ratios), summary)
    }

    /// Compute one cell.
    ///
    /// # Errors
    ///
    /// Returns the first [`CellError`] met while reading inputs or computing
    /// a ratio.
    pub fn compute_cell(
        &self,
        record: &MergedRecord,
        diagnostics: &mut CellDiagnostics,
    ) -> Result<RatioValues, CellError> {
        let inputs = CellInputs::extract(record, self.missing_default, diagnostics)?;

        let mut values = RatioValues::default();
        for ratio in self.registry.reported() {
            values.push(ratio.name(), ratio.compute(&inputs, diagnostics)?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DATE_FORMAT;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn record(value: serde_json::Value) -> MergedRecord {
        serde_json::from_value(value).unwrap()
    }

    fn acme() -> MergedRecord {
        record(json!({
            "totalShareholderEquity": 100,
            "netIncome": 20,
            "commonStockSharesOutstanding": 10,
            "Adj Close": 50
        }))
    }

    #[test]
    fn test_acme_cell() {
        let table: ConcatenatedTable = [(date("2023-12-31"), Ticker::from("ACME"), acme())]
            .into_iter()
            .collect();

        let (ratios, summary) = RatioEngine::default().compute(&table);

        let values = ratios
            .get(date("2023-12-31"), &Ticker::from("ACME"))
            .and_then(RatioRecord::values)
            .unwrap();
        assert_relative_eq!(values.get("ROE").unwrap(), 0.2);
        assert_relative_eq!(values.get("MarketToBook").unwrap(), 5.0);
        assert_relative_eq!(values.get("MarketCap").unwrap(), 500.0);
        assert_relative_eq!(values.get("Adj Close").unwrap(), 50.0);
        assert_eq!(values.get("BookValuePerShare"), None);

        assert_eq!(summary.cells, 1);
        assert_eq!(summary.computed, 1);
        assert!(summary.errored.is_empty());
        // totalShareholderEquity, netIncome, shares and price are present
        assert_eq!(summary.defaulted_fields, 4);
        assert_eq!(summary.defaulted_cells, 1);
    }

    #[test]
    fn test_output_keys_follow_registry_order() {
        let engine = RatioEngine::default();
        let mut diagnostics = CellDiagnostics::default();
        let values = engine.compute_cell(&acme(), &mut diagnostics).unwrap();

        let names: Vec<_> = values.names().collect();
        assert_eq!(
            names,
            [
                "ROE",
                "DebtToEquity",
                "ProfitMargin",
                "OperatingCashFlowDebt",
                "MarketToBook",
                "DividendYield",
                "MarketCap",
                "Adj Close",
            ]
        );

        let json = serde_json::to_string(&RatioRecord::Computed(values)).unwrap();
        assert!(json.starts_with("{\"ROE\":0.2,\"DebtToEquity\":0.0"));
    }

    #[test]
    fn test_failed_cell_is_isolated() {
        let table: ConcatenatedTable = [
            (date("2024-01-02"), Ticker::from("ACME"), acme()),
            (
                date("2024-01-02"),
                Ticker::from("BAD"),
                record(json!({"netIncome": "twelve", "Adj Close": 10})),
            ),
        ]
        .into_iter()
        .collect();

        let (ratios, summary) = RatioEngine::default().compute(&table);

        assert_eq!(ratios.len(), 2);
        assert_eq!(summary.computed, 1);
        assert_eq!(summary.errored.len(), 1);

        let failed = ratios.get(date("2024-01-02"), &Ticker::from("BAD")).unwrap();
        let message = failed.error().unwrap();
        assert!(message.starts_with("Failed to calculate metrics for BAD: "));
        assert_eq!(
            serde_json::to_value(failed).unwrap(),
            json!({"error": message})
        );
        assert!(
            ratios
                .get(date("2024-01-02"), &Ticker::from("ACME"))
                .unwrap()
                .values()
                .is_some()
        );
    }

    #[test]
    fn test_summary_counts_fallbacks() {
        let table: ConcatenatedTable = [
            (date("2024-01-02"), Ticker::from("AAA"), MergedRecord::new()),
            (date("2024-01-03"), Ticker::from("AAA"), MergedRecord::new()),
        ]
        .into_iter()
        .collect();

        let (_, summary) = RatioEngine::default().compute(&table);

        assert_eq!(summary.computed, 2);
        assert_eq!(summary.defaulted_fields, 16);
        assert_eq!(summary.defaulted_by_field["netIncome"], 2);
        // every division of an empty cell is zero over zero
        assert_eq!(summary.fallbacks_by_ratio["ROE"], 2);
        assert_eq!(summary.fallbacks_by_ratio["BookValuePerShare"], 2);
        assert_eq!(summary.division_fallbacks, 2 * 8);
    }

    #[test]
    fn test_overflowing_division_falls_back() {
        let table: ConcatenatedTable = [(
            date("2024-01-02"),
            Ticker::from("HUGE"),
            record(json!({
                "netIncome": 1e308,
                "totalShareholderEquity": 0.5,
                "commonStockSharesOutstanding": 10,
                "Adj Close": 50
            })),
        )]
        .into_iter()
        .collect();

        let (ratios, summary) = RatioEngine::default().compute(&table);

        let cell = ratios.get(date("2024-01-02"), &Ticker::from("HUGE")).unwrap();
        let values = cell.values().unwrap();
        assert_eq!(values.get("ROE"), Some(0.0));
        assert_relative_eq!(values.get("MarketToBook").unwrap(), 1000.0);
        assert_relative_eq!(values.get("MarketCap").unwrap(), 500.0);
        assert_eq!(summary.computed, 1);
        assert_eq!(summary.fallbacks_by_ratio["ROE"], 1);

        let json = serde_json::to_value(cell).unwrap();
        assert_eq!(json["ROE"], json!(0.0));
    }

    #[test]
    fn test_custom_missing_default() {
        let engine = RatioEngine::new(RatioRegistry::with_defaults(), 1.0);
        let mut diagnostics = CellDiagnostics::default();

        let values = engine
            .compute_cell(&MergedRecord::new(), &mut diagnostics)
            .unwrap();
        assert_relative_eq!(values.get("ROE").unwrap(), 1.0);
        assert!(diagnostics.fallbacks.is_empty());
    }
}
