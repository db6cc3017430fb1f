#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finratios/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod asof;
pub mod concat;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod ratios;
pub mod store;
pub mod types;

// Re-export core types
pub use asof::{as_of, as_of_join};
pub use concat::{ConcatSummary, Concatenator, PriceFill};
pub use engine::{CellFailure, RatioEngine, RatioRecord, RatioSummary, RatioTable, RatioValues};
pub use error::{PipelineError, Result};
pub use normalize::{CollisionPolicy, FieldCollision, Normalized, Normalizer, coerce_numeric};
pub use pipeline::{AlignSummary, MergeSummary, Pipeline, PipelineConfig, RunSummary};
pub use ratios::{Ratio, RatioCategory, RatioInfo, RatioRegistry, safe_divide, safe_get};
pub use types::{
    ConcatenatedTable, DatedRecords, MergedRecord, PeriodReport, PriceSeries, ReportPeriod,
    Section, StatementBundle, StatementSection, Ticker, Universe,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
