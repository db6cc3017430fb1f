//! File-to-file pipeline stages.
//!
//! A run is four stages, each reading the previous stage's files:
//!
//! 1. [`Pipeline::merge_statements`]: statement bundles -> per-ticker records
//!    keyed by fiscal date
//! 2. [`Pipeline::align_to_prices`]: per-ticker records -> per-ticker records
//!    keyed by price date
//! 3. [`Pipeline::concatenate`]: aligned records of the universe -> one
//!    date -> ticker table
//! 4. [`Pipeline::compute_ratios`]: table -> ratio table
//!
//! With [`PipelineConfig::skip_existing`] set, outputs already on disk are
//! reused instead of recomputed.

use crate::{
    Result,
    asof::as_of_join,
    concat::{ConcatSummary, Concatenator, PriceFill},
    engine::{RatioEngine, RatioSummary},
    normalize::{CollisionPolicy, Normalizer},
    ratios::RatioRegistry,
    store::{json_files, read_json, read_json_if_exists, ticker_from_path, write_json},
    types::{ConcatenatedTable, DatedRecords, PriceSeries, ReportPeriod, StatementBundle, Ticker, Universe},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Locations and options of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory of `<TICKER>.json` statement bundles
    pub statements_dir: PathBuf,
    /// Directory the merged per-ticker records are written to
    pub merged_dir: PathBuf,
    /// Directory the price-aligned per-ticker records are written to
    pub aligned_dir: PathBuf,
    /// Daily adjusted closes, date -> ticker -> price
    pub prices_file: PathBuf,
    /// Components info whose top-level keys are the universe
    pub components_file: PathBuf,
    /// Concatenated table output
    pub concat_file: PathBuf,
    /// Ratio table output
    pub ratios_file: PathBuf,
    /// Report list read from each statement
    pub period: ReportPeriod,
    /// Resolution of fields defined by more than one statement
    pub collision_policy: CollisionPolicy,
    /// Adjusted close lookup
    pub price_fill: PriceFill,
    /// Value substituted for missing statement fields
    pub missing_default: f64,
    /// Reuse outputs already on disk
    pub skip_existing: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            statements_dir: PathBuf::from("financial_statements"),
            merged_dir: PathBuf::from("merged_statements"),
            aligned_dir: PathBuf::from("aligned_statements"),
            prices_file: PathBuf::from("SP500ComponentsDailyAdjClose.json"),
            components_file: PathBuf::from("filtered_sp500_components.json"),
            concat_file: PathBuf::from("SP500ComponentsDailyFinanDataConcat.json"),
            ratios_file: PathBuf::from("SP500ComponentsDailyFinanRatios.json"),
            period: ReportPeriod::default(),
            collision_policy: CollisionPolicy::default(),
            price_fill: PriceFill::default(),
            missing_default: 0.0,
            skip_existing: false,
        }
    }
}

impl PipelineConfig {
    /// Load a config file. Fields it leaves out keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or holds unknown or mistyped
    /// fields.
    pub fn from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Config whose every path lives under `root`, keeping default names.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        let defaults = Self::default();
        Self {
            statements_dir: root.join(defaults.statements_dir),
            merged_dir: root.join(defaults.merged_dir),
            aligned_dir: root.join(defaults.aligned_dir),
            prices_file: root.join(defaults.prices_file),
            components_file: root.join(defaults.components_file),
            concat_file: root.join(defaults.concat_file),
            ratios_file: root.join(defaults.ratios_file),
            ..defaults
        }
    }
}

/// Outcome of the merge stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Bundles found
    pub files: usize,
    /// Bundles merged and written
    pub merged: usize,
    /// Bundles whose output already existed
    pub skipped_existing: usize,
    /// Fiscal dates written over all tickers
    pub records: usize,
    /// Cross-section field collisions
    pub collisions: usize,
    /// Collisions by field name
    pub collisions_by_field: BTreeMap<String, usize>,
}

/// Outcome of the align stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignSummary {
    /// Merged files found
    pub files: usize,
    /// Files aligned and written
    pub aligned: usize,
    /// Files whose output already existed
    pub skipped_existing: usize,
    /// Price dates aligned onto
    pub target_dates: usize,
    /// Records written over all tickers
    pub records: usize,
    /// Tickers with no statement on or before any price date
    pub empty: Vec<Ticker>,
}

/// Outcome of a full run. Aggregate stages reused from disk are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Merge stage
    pub merge: MergeSummary,
    /// Align stage
    pub align: AlignSummary,
    /// Concatenation stage
    pub concat: Option<ConcatSummary>,
    /// Ratio stage
    pub ratios: Option<RatioSummary>,
}

/// Runs pipeline stages over the files named by a [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// Stops at the first stage that fails.
    pub fn run(&self) -> Result<RunSummary> {
        Ok(RunSummary {
            merge: self.merge_statements()?,
            align: self.align_to_prices()?,
            concat: self.concatenate()?,
            ratios: self.compute_ratios()?,
        })
    }

    /// Merge every statement bundle into per-ticker records keyed by fiscal
    /// date.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable directory or file, malformed JSON, or a field
    /// collision under [`CollisionPolicy::Error`].
    pub fn merge_statements(&self) -> Result<MergeSummary> {
        let config = &self.config;
        let normalizer = Normalizer::new(config.collision_policy, config.period);
        info!(
            dir = %config.statements_dir.display(),
            policy = %normalizer.policy(),
            period = %normalizer.period(),
            "merging statements"
        );

        let files = json_files(&config.statements_dir)?;
        let mut summary = MergeSummary {
            files: files.len(),
            ..MergeSummary::default()
        };

        for path in files {
            let Some(ticker) = ticker_from_path(&path) else {
                warn!(path = %path.display(), "file name is not a ticker, skipping");
                continue;
            };
            let output = config.merged_dir.join(ticker.file_name());
            if config.skip_existing && output.exists() {
                debug!(%ticker, "merged file exists, skipping");
                summary.skipped_existing += 1;
                continue;
            }

            let bundle: StatementBundle = read_json(&path)?;
            let normalized = normalizer.normalize(&ticker, &bundle)?;
            write_json(&output, &normalized.records)?;

            debug!(
                %ticker,
                dates = normalized.records.len(),
                collisions = normalized.collisions.len(),
                "merged statements"
            );
            summary.merged += 1;
            summary.records += normalized.records.len();
            summary.collisions += normalized.collisions.len();
            for collision in normalized.collisions {
                *summary
                    .collisions_by_field
                    .entry(collision.field)
                    .or_default() += 1;
            }
        }

        info!(
            merged = summary.merged,
            skipped = summary.skipped_existing,
            collisions = summary.collisions,
            "merge finished"
        );
        Ok(summary)
    }

    /// Align every merged file onto the price dates.
    ///
    /// Each price date takes the latest fiscal record on or before it.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable directory or file or malformed JSON.
    pub fn align_to_prices(&self) -> Result<AlignSummary> {
        let config = &self.config;
        info!(dir = %config.merged_dir.display(), "aligning statements to price dates");

        let prices: PriceSeries = read_json(&config.prices_file)?;
        let files = json_files(&config.merged_dir)?;
        let mut summary = AlignSummary {
            files: files.len(),
            target_dates: prices.len(),
            ..AlignSummary::default()
        };

        for path in files {
            let Some(ticker) = ticker_from_path(&path) else {
                warn!(path = %path.display(), "file name is not a ticker, skipping");
                continue;
            };
            let output = config.aligned_dir.join(ticker.file_name());
            if config.skip_existing && output.exists() {
                debug!(%ticker, "aligned file exists, skipping");
                summary.skipped_existing += 1;
                continue;
            }

            let merged: DatedRecords = read_json(&path)?;
            let aligned = as_of_join(prices.dates(), &merged);
            write_json(&output, &aligned)?;

            debug!(%ticker, dates = aligned.len(), "aligned statements");
            if aligned.is_empty() {
                summary.empty.push(ticker);
            }
            summary.aligned += 1;
            summary.records += aligned.len();
        }

        info!(
            aligned = summary.aligned,
            skipped = summary.skipped_existing,
            dates = summary.target_dates,
            "align finished"
        );
        Ok(summary)
    }

    /// Concatenate the aligned records of the universe into one table.
    ///
    /// Returns `None` when the output exists and is reused.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable or malformed prices, components or aligned
    /// file. Aligned files that do not exist are not an error.
    pub fn concatenate(&self) -> Result<Option<ConcatSummary>> {
        let config = &self.config;
        if config.skip_existing && config.concat_file.exists() {
            info!(path = %config.concat_file.display(), "concatenated table exists, skipping");
            return Ok(None);
        }
        info!(price_fill = %config.price_fill, "concatenating universe");

        let prices: PriceSeries = read_json(&config.prices_file)?;
        let universe: Universe = read_json(&config.components_file)?;

        let mut aligned = BTreeMap::new();
        for ticker in universe.iter() {
            let path = config.aligned_dir.join(ticker.file_name());
            if let Some(records) = read_json_if_exists::<DatedRecords>(&path)? {
                aligned.insert(ticker.clone(), records);
            }
        }

        let (table, summary) =
            Concatenator::new(config.price_fill).concatenate(&prices, &universe, &aligned);
        write_json(&config.concat_file, &table)?;
        Ok(Some(summary))
    }

    /// Compute the ratio table from the concatenated table.
    ///
    /// Returns `None` when the output exists and is reused.
    ///
    /// # Errors
    ///
    /// Fails when the table cannot be read or the output cannot be written.
    /// Individual cells never fail the stage.
    pub fn compute_ratios(&self) -> Result<Option<RatioSummary>> {
        let config = &self.config;
        if config.skip_existing && config.ratios_file.exists() {
            info!(path = %config.ratios_file.display(), "ratio table exists, skipping");
            return Ok(None);
        }
        info!(path = %config.concat_file.display(), "computing ratios");

        let table: ConcatenatedTable = read_json(&config.concat_file)?;
        let engine = RatioEngine::new(RatioRegistry::with_defaults(), config.missing_default);
        let (ratios, summary) = engine.compute(&table);
        write_json(&config.ratios_file, &ratios)?;
        Ok(Some(summary))
    }
}
