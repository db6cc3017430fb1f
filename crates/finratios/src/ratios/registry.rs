//! Ratio registry for discovery and introspection.
//!
//! The registry fixes which ratios a run computes and the order they are
//! written in. [`RatioRegistry::with_defaults`] holds the standard set.

use super::traits::{Metric, Ratio, RatioCategory};
use std::sync::Arc;

/// Metadata for ratio introspection.
#[derive(Debug, Clone)]
pub struct RatioInfo {
    /// Ratio name (output key)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Ratio category
    pub category: RatioCategory,
    /// Statement fields read
    pub inputs: Vec<String>,
    /// Whether the ratio is written to the output
    pub reported: bool,
}

/// Ordered collection of ratios.
#[derive(Debug, Default, Clone)]
pub struct RatioRegistry {
    ratios: Vec<Arc<dyn Ratio>>,
}

impl RatioRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { ratios: Vec::new() }
    }

    /// Register the standard ratio set.
    ///
    /// Reported ratios come out in this order: ROE, DebtToEquity,
    /// ProfitMargin, OperatingCashFlowDebt, MarketToBook, DividendYield,
    /// MarketCap, Adj Close.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(super::profitability::ReturnOnEquity));
        registry.register(Arc::new(super::leverage::DebtToEquity));
        registry.register(Arc::new(super::profitability::ProfitMargin));
        registry.register(Arc::new(super::leverage::OperatingCashFlowDebt));
        registry.register(Arc::new(super::valuation::MarketToBook));
        registry.register(Arc::new(super::valuation::DividendYield));
        registry.register(Arc::new(super::size::MarketCap));
        registry.register(Arc::new(super::price::AdjClose));

        // Intermediates
        registry.register(Arc::new(super::valuation::BookValuePerShare));
        registry.register(Arc::new(super::valuation::DividendRate));

        registry
    }

    /// Register a ratio, replacing any ratio of the same name in place.
    pub fn register(&mut self, ratio: Arc<dyn Ratio>) {
        match self.ratios.iter().position(|r| r.name() == ratio.name()) {
            Some(i) => self.ratios[i] = ratio,
            None => self.ratios.push(ratio),
        }
    }

    /// Get a ratio by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Ratio> {
        self.ratios
            .iter()
            .find(|r| r.name() == name)
            .map(|r| r.as_ref())
    }

    /// Ratios written to the output, in registration order.
    pub fn reported(&self) -> impl Iterator<Item = &dyn Ratio> {
        self.ratios
            .iter()
            .filter(|r| r.reported())
            .map(|r| r.as_ref())
    }

    /// Get ratios by category.
    #[must_use]
    pub fn by_category(&self, category: RatioCategory) -> Vec<&dyn Ratio> {
        self.ratios
            .iter()
            .filter(|r| r.category() == category)
            .map(|r| r.as_ref())
            .collect()
    }

    /// Get all ratio metadata.
    #[must_use]
    pub fn all_info(&self) -> Vec<RatioInfo> {
        self.ratios
            .iter()
            .map(|r| RatioInfo {
                name: r.name().to_string(),
                description: r.description().to_string(),
                category: r.category(),
                inputs: r.inputs().iter().map(|m| m.field().to_string()).collect(),
                reported: r.reported(),
            })
            .collect()
    }

    /// Get all ratio names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.ratios.iter().map(|r| r.name()).collect()
    }

    /// Every metric read by at least one registered ratio.
    #[must_use]
    pub fn required_metrics(&self) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = self
            .ratios
            .iter()
            .flat_map(|r| r.inputs().iter().copied())
            .collect();
        metrics.sort();
        metrics.dedup();
        metrics
    }

    /// Number of registered ratios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}
