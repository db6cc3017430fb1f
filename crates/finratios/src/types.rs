//! Core data types shared by every pipeline stage.
//!
//! - [`Ticker`] - stock identifier
//! - [`StatementBundle`] - one ticker's raw statements as fetched
//! - [`MergedRecord`] - one ticker's metrics for one date
//! - [`PriceSeries`] - daily adjusted closes for the whole universe
//! - [`Universe`] - the tickers to scan
//! - [`ConcatenatedTable`] - date -> ticker -> record, the ratio engine input

use crate::{PipelineError, Result};
use chrono::NaiveDate;
use derive_more::{Display, From};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Key of the fiscal period end date inside a period report.
pub const FISCAL_DATE_FIELD: &str = "fiscalDateEnding";

/// Field injected into every concatenated record from the price series.
pub const ADJ_CLOSE: &str = "Adj Close";

/// Date format used on every JSON boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A stock ticker.
///
/// Tickers double as file stems, so they are kept verbatim (no case folding).
#[derive(
    Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a ticker.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the per-ticker JSON file, `<TICKER>.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The three statement sections of a bundle, in processing order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Income statement
    #[display("income_statement")]
    IncomeStatement,
    /// Balance sheet
    #[display("balance_sheet")]
    BalanceSheet,
    /// Cash flow statement
    #[display("cash_flow")]
    CashFlow,
}

impl Section {
    /// All sections in the order the normalizer visits them.
    pub const ALL: [Self; 3] = [Self::IncomeStatement, Self::BalanceSheet, Self::CashFlow];

    /// Suffix appended to a colliding field under the `suffix` policy.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::IncomeStatement => "_income",
            Self::BalanceSheet => "_balance",
            Self::CashFlow => "_cashflow",
        }
    }
}

/// Which report list of a statement section to read.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportPeriod {
    /// `annualReports`
    #[display("annual")]
    Annual,
    /// `quarterlyReports`
    #[default]
    #[display("quarterly")]
    Quarterly,
}

impl FromStr for ReportPeriod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "annual" => Ok(Self::Annual),
            "quarterly" => Ok(Self::Quarterly),
            other => Err(PipelineError::InvalidOption(format!(
                "unknown report period '{other}' (expected annual or quarterly)"
            ))),
        }
    }
}

/// One fiscal period of one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    /// Period end date
    #[serde(rename = "fiscalDateEnding")]
    pub fiscal_date_ending: NaiveDate,
    /// Every other field of the report, raw as delivered
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// One statement section as delivered by the provider.
///
/// Provider notices and the `symbol` echo are ignored; missing report lists
/// read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSection {
    /// Annual reports, most recent first
    #[serde(rename = "annualReports", default)]
    pub annual_reports: Vec<PeriodReport>,
    /// Quarterly reports, most recent first
    #[serde(rename = "quarterlyReports", default)]
    pub quarterly_reports: Vec<PeriodReport>,
}

impl StatementSection {
    /// Reports for the requested period.
    #[must_use]
    pub fn reports(&self, period: ReportPeriod) -> &[PeriodReport] {
        match period {
            ReportPeriod::Annual => &self.annual_reports,
            ReportPeriod::Quarterly => &self.quarterly_reports,
        }
    }
}

/// A ticker's raw statements. Any section may be absent or `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementBundle {
    /// Income statement
    #[serde(default)]
    pub income_statement: Option<StatementSection>,
    /// Balance sheet
    #[serde(default)]
    pub balance_sheet: Option<StatementSection>,
    /// Cash flow statement
    #[serde(default)]
    pub cash_flow: Option<StatementSection>,
}

impl StatementBundle {
    /// Returns the given section if present.
    #[must_use]
    pub const fn section(&self, section: Section) -> Option<&StatementSection> {
        match section {
            Section::IncomeStatement => self.income_statement.as_ref(),
            Section::BalanceSheet => self.balance_sheet.as_ref(),
            Section::CashFlow => self.cash_flow.as_ref(),
        }
    }
}

/// Metrics of one ticker on one date.
///
/// Values are JSON scalars: the normalizer only ever writes numbers and
/// `null`, but records read back from disk are accepted as they are so the
/// ratio engine can apply its own missing-value policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedRecord(BTreeMap<String, Value>);

impl MergedRecord {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the raw value of a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether the record holds a field.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for MergedRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One ticker's records keyed by date.
pub type DatedRecords = BTreeMap<NaiveDate, MergedRecord>;

/// Daily adjusted closes: date -> ticker -> price.
///
/// Prices may be `null` for tickers that did not trade on a date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSeries(BTreeMap<NaiveDate, BTreeMap<Ticker, Option<f64>>>);

impl PriceSeries {
    /// The canonical dates, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.keys().copied()
    }

    /// Number of dates in the series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the series has no dates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adjusted close of `ticker` on exactly `date`.
    #[must_use]
    pub fn adj_close(&self, date: NaiveDate, ticker: &Ticker) -> Option<f64> {
        self.0.get(&date)?.get(ticker).copied().flatten()
    }

    /// Every non-null close of one ticker, keyed by date.
    #[must_use]
    pub fn history(&self, ticker: &Ticker) -> BTreeMap<NaiveDate, f64> {
        self.0
            .iter()
            .filter_map(|(date, closes)| Some((*date, closes.get(ticker).copied().flatten()?)))
            .collect()
    }
}

impl FromIterator<(NaiveDate, Ticker, Option<f64>)> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Ticker, Option<f64>)>>(iter: I) -> Self {
        let mut series: BTreeMap<NaiveDate, BTreeMap<Ticker, Option<f64>>> = BTreeMap::new();
        for (date, ticker, close) in iter {
            series.entry(date).or_default().insert(ticker, close);
        }
        Self(series)
    }
}

/// The set of tickers a run scans.
///
/// Deserialized from the components-info document: its top-level keys are
/// the tickers, the values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<Ticker, IgnoredAny>")]
pub struct Universe(BTreeSet<Ticker>);

impl Universe {
    /// Iterates tickers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Ticker> {
        self.0.iter()
    }

    /// Number of tickers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the universe is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<Ticker, IgnoredAny>> for Universe {
    fn from(info: BTreeMap<Ticker, IgnoredAny>) -> Self {
        Self(info.into_keys().collect())
    }
}

impl<T: Into<Ticker>> FromIterator<T> for Universe {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// All tickers' records on all canonical dates: date -> ticker -> record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcatenatedTable(BTreeMap<NaiveDate, BTreeMap<Ticker, MergedRecord>>);

impl ConcatenatedTable {
    /// Returns one cell.
    #[must_use]
    pub fn get(&self, date: NaiveDate, ticker: &Ticker) -> Option<&MergedRecord> {
        self.0.get(&date)?.get(ticker)
    }

    /// Iterates every cell, dates ascending then tickers ascending.
    pub fn cells(&self) -> impl Iterator<Item = (NaiveDate, &Ticker, &MergedRecord)> {
        self.0.iter().flat_map(|(date, tickers)| {
            tickers
                .iter()
                .map(move |(ticker, record)| (*date, ticker, record))
        })
    }

    /// Dates that hold at least one cell.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.keys().copied()
    }

    /// Whether any date lists `ticker`.
    #[must_use]
    pub fn contains_ticker(&self, ticker: &Ticker) -> bool {
        self.0.values().any(|tickers| tickers.contains_key(ticker))
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

impl FromIterator<(NaiveDate, Ticker, MergedRecord)> for ConcatenatedTable {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Ticker, MergedRecord)>>(iter: I) -> Self {
        let mut table: BTreeMap<NaiveDate, BTreeMap<Ticker, MergedRecord>> = BTreeMap::new();
        for (date, ticker, record) in iter {
            table.entry(date).or_default().insert(ticker, record);
        }
        Self(table)
    }
}
