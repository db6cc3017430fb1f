//! CLI for the finratios pipeline.
//!
//! Runs the merge, align, concat and ratio stages over JSON snapshots, and
//! lists the ratios the engine computes.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use finratios::{
    CollisionPolicy, Pipeline, PipelineConfig, PriceFill, RatioCategory, RatioInfo, RatioRegistry,
    ReportPeriod, store::write_json,
};
use serde::Serialize;
use std::{collections::BTreeMap, path::PathBuf, process};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "finratios")]
#[command(about = "Merge financial statements, join prices and derive ratios", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reuse stage outputs already on disk
    #[arg(long, global = true)]
    skip_existing: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Config values settable from the command line.
#[derive(Args)]
struct Overrides {
    /// Directory of statement bundles
    #[arg(long, global = true)]
    statements_dir: Option<PathBuf>,

    /// Directory of merged per-ticker records
    #[arg(long, global = true)]
    merged_dir: Option<PathBuf>,

    /// Directory of price-aligned per-ticker records
    #[arg(long, global = true)]
    aligned_dir: Option<PathBuf>,

    /// Daily adjusted close file
    #[arg(long, global = true)]
    prices_file: Option<PathBuf>,

    /// Components info file
    #[arg(long, global = true)]
    components_file: Option<PathBuf>,

    /// Concatenated table output
    #[arg(long, global = true)]
    concat_file: Option<PathBuf>,

    /// Ratio table output
    #[arg(long, global = true)]
    ratios_file: Option<PathBuf>,

    /// Report list to read (annual, quarterly)
    #[arg(long, global = true)]
    period: Option<ReportPeriod>,

    /// Field collision policy (first-wins, last-wins, suffix, error)
    #[arg(long, global = true)]
    collision_policy: Option<CollisionPolicy>,

    /// Adjusted close lookup (exact, fill-forward)
    #[arg(long, global = true)]
    price_fill: Option<PriceFill>,

    /// Value used for missing statement fields
    #[arg(long, global = true)]
    missing_default: Option<f64>,
}

impl Overrides {
    fn apply(self, config: &mut PipelineConfig) {
        let paths = [
            (self.statements_dir, &mut config.statements_dir),
            (self.merged_dir, &mut config.merged_dir),
            (self.aligned_dir, &mut config.aligned_dir),
            (self.prices_file, &mut config.prices_file),
            (self.components_file, &mut config.components_file),
            (self.concat_file, &mut config.concat_file),
            (self.ratios_file, &mut config.ratios_file),
        ];
        for (value, slot) in paths {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(policy) = self.collision_policy {
            config.collision_policy = policy;
        }
        if let Some(fill) = self.price_fill {
            config.price_fill = fill;
        }
        if let Some(default) = self.missing_default {
            config.missing_default = default;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Merge statement bundles by fiscal date
    Merge,
    /// Align merged statements onto the price dates
    Align,
    /// Concatenate the aligned statements of the universe
    Concat,
    /// Compute ratios from the concatenated table
    Ratios,
    /// Run every stage in order
    Run {
        /// Write the run summary to this file
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// List all available ratios
    List,
    /// Show information about a specific ratio
    Info {
        /// Ratio name
        ratio: String,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let registry = RatioRegistry::with_defaults();
    match cli.command {
        Commands::List => list_ratios(&registry),
        Commands::Info { ratio } => show_ratio_info(&registry, &ratio)?,
        command => {
            let config = load_config(cli.config, cli.skip_existing, cli.overrides)?;
            run_stage(&Pipeline::new(config), command)?;
        }
    }

    Ok(())
}

fn run_stage(pipeline: &Pipeline, command: Commands) -> Result<()> {
    match command {
        Commands::Merge => print_summary(&pipeline.merge_statements()?),
        Commands::Align => print_summary(&pipeline.align_to_prices()?),
        Commands::Concat => print_summary(&pipeline.concatenate()?),
        Commands::Ratios => print_summary(&pipeline.compute_ratios()?),
        Commands::Run { summary } => {
            let outcome = pipeline.run()?;
            if let Some(path) = summary {
                write_json(&path, &outcome)?;
                info!(path = %path.display(), "wrote run summary");
                Ok(())
            } else {
                print_summary(&outcome)
            }
        }
        Commands::List | Commands::Info { .. } => Ok(()),
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Defaults, then the config file, then command-line flags.
fn load_config(
    path: Option<PathBuf>,
    skip_existing: bool,
    overrides: Overrides,
) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    overrides.apply(&mut config);
    if skip_existing {
        config.skip_existing = true;
    }
    Ok(config)
}

fn print_summary<T: Serialize>(summary: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// List all available ratios grouped by category.
fn list_ratios(registry: &RatioRegistry) {
    let mut by_category: BTreeMap<RatioCategory, Vec<RatioInfo>> = BTreeMap::new();
    for info in registry.all_info() {
        by_category.entry(info.category).or_default().push(info);
    }

    println!("Available Ratios ({} total)\n", registry.len());

    for (category, ratios) in by_category {
        println!("{category}:");
        for info in ratios {
            let marker = if info.reported { "" } else { " (intermediate)" };
            println!("  {}{} - {}", info.name, marker, info.description);
        }
        println!();
    }
}

/// Show detailed information about a specific ratio.
fn show_ratio_info(registry: &RatioRegistry, ratio_name: &str) -> Result<()> {
    let all_info = registry.all_info();

    let Some(info) = all_info.iter().find(|r| r.name == ratio_name) else {
        let available: Vec<_> = all_info.iter().map(|r| r.name.as_str()).collect();
        bail!(
            "ratio '{ratio_name}' not found; available ratios: {}",
            available.join(", ")
        );
    };

    println!("Ratio: {}", info.name);
    println!("Category: {}", info.category);
    println!("Description: {}", info.description);
    println!("Reported: {}", if info.reported { "yes" } else { "no" });
    println!("Input fields:");
    for field in &info.inputs {
        println!("  - {field}");
    }
    Ok(())
}
