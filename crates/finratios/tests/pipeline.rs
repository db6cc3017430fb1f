//! End-to-end runs of the file pipeline.

use approx::assert_relative_eq;
use finratios::{Pipeline, PipelineConfig, PriceFill, RunSummary, Ticker};
use serde_json::{Value, json};
use std::{fs, path::Path};
use tempfile::TempDir;

fn write(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// ACME has statements for two quarters; GONE is listed in the universe but
/// has no statement file.
fn seed(config: &PipelineConfig) {
    write(
        &config.statements_dir.join("ACME.json"),
        &json!({
            "income_statement": {
                "symbol": "ACME",
                "quarterlyReports": [
                    {"fiscalDateEnding": "2023-12-31", "netIncome": "20", "totalRevenue": "200", "reportedCurrency": "USD"},
                    {"fiscalDateEnding": "2023-09-30", "netIncome": "None", "totalRevenue": "180", "reportedCurrency": "USD"}
                ]
            },
            "balance_sheet": {
                "symbol": "ACME",
                "quarterlyReports": [
                    {"fiscalDateEnding": "2023-12-31", "totalShareholderEquity": "100", "shortLongTermDebtTotal": "50", "commonStockSharesOutstanding": "10"},
                    {"fiscalDateEnding": "2023-09-30", "totalShareholderEquity": "0", "shortLongTermDebtTotal": "40", "commonStockSharesOutstanding": "10"}
                ]
            },
            "cash_flow": {
                "symbol": "ACME",
                "quarterlyReports": [
                    {"fiscalDateEnding": "2023-12-31", "operatingCashflow": "25", "dividendPayoutCommonStock": "5"}
                ]
            }
        }),
    );
    write(
        &config.prices_file,
        &json!({
            "2023-09-29": {"ACME": 40.0, "GONE": 9.0},
            "2023-10-02": {"ACME": 41.0, "GONE": 9.5},
            "2024-01-02": {"ACME": 50.0, "GONE": 10.0},
            "2024-01-03": {"ACME": null, "GONE": 10.5}
        }),
    );
    write(
        &config.components_file,
        &json!({
            "ACME": {"Security": "Acme Corp", "GICS Sector": "Industrials"},
            "GONE": {"Security": "Gone Inc", "GICS Sector": "Utilities"}
        }),
    );
}

fn read(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

fn run(config: &PipelineConfig) -> RunSummary {
    Pipeline::new(config.clone()).run().unwrap()
}

#[test]
fn test_full_run() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::rooted_at(dir.path());
    seed(&config);

    let summary = run(&config);

    assert_eq!(summary.merge.merged, 1);
    assert_eq!(summary.merge.records, 2);
    assert_eq!(summary.align.aligned, 1);
    // 2023-09-29 precedes every fiscal date
    assert_eq!(summary.align.records, 3);

    let concat = summary.concat.unwrap();
    assert_eq!(concat.cells, 3);
    assert_eq!(concat.missing_prices, 1);

    let ratios = summary.ratios.unwrap();
    assert_eq!(ratios.cells, 3);
    assert_eq!(ratios.computed, 3);
    assert!(ratios.errored.is_empty());

    let output = read(&config.ratios_file);
    let acme = &output["2024-01-02"]["ACME"];
    assert_relative_eq!(acme["ROE"].as_f64().unwrap(), 0.2);
    assert_relative_eq!(acme["DebtToEquity"].as_f64().unwrap(), 0.5);
    assert_relative_eq!(acme["ProfitMargin"].as_f64().unwrap(), 0.1);
    assert_relative_eq!(acme["OperatingCashFlowDebt"].as_f64().unwrap(), 0.5);
    assert_relative_eq!(acme["MarketToBook"].as_f64().unwrap(), 5.0);
    assert_relative_eq!(acme["DividendYield"].as_f64().unwrap(), 0.01);
    assert_relative_eq!(acme["MarketCap"].as_f64().unwrap(), 500.0);
    assert_relative_eq!(acme["Adj Close"].as_f64().unwrap(), 50.0);
    assert!(acme.get("BookValuePerShare").is_none());

    // Q3 has zero equity and a "None" net income
    let q3 = &output["2023-10-02"]["ACME"];
    assert_eq!(q3["ROE"], json!(0.0));
    assert_eq!(q3["MarketToBook"], json!(0.0));
    assert_relative_eq!(q3["MarketCap"].as_f64().unwrap(), 410.0);

    // a null price is carried as a missing value, defaulting to zero
    assert_eq!(output["2024-01-03"]["ACME"]["Adj Close"], json!(0.0));
    assert!(ratios.defaulted_by_field["Adj Close"] >= 1);
}

#[test]
fn test_ticker_without_statements_is_skipped() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::rooted_at(dir.path());
    seed(&config);

    let summary = run(&config);

    assert_eq!(summary.concat.unwrap().skipped, [Ticker::from("GONE")]);
    for path in [&config.concat_file, &config.ratios_file] {
        let table = read(path);
        for tickers in table.as_object().unwrap().values() {
            assert!(tickers.get("GONE").is_none());
        }
    }
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::rooted_at(dir.path());
    seed(&config);

    run(&config);
    let outputs = [
        config.merged_dir.join("ACME.json"),
        config.aligned_dir.join("ACME.json"),
        config.concat_file.clone(),
        config.ratios_file.clone(),
    ];
    let first: Vec<Vec<u8>> = outputs.iter().map(|p| fs::read(p).unwrap()).collect();

    run(&config);
    let second: Vec<Vec<u8>> = outputs.iter().map(|p| fs::read(p).unwrap()).collect();

    assert_eq!(first, second);
    let text = String::from_utf8(first[3].clone()).unwrap();
    assert!(text.starts_with("{\n    \"2023-10-02\": {\n        \"ACME\": {\n            \"ROE\": "));
}

#[test]
fn test_fill_forward_prices() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig {
        price_fill: PriceFill::FillForward,
        ..PipelineConfig::rooted_at(dir.path())
    };
    seed(&config);

    let summary = run(&config);

    let concat = summary.concat.unwrap();
    assert_eq!(concat.filled_prices, 1);
    assert_eq!(concat.missing_prices, 0);
    let output = read(&config.ratios_file);
    assert_relative_eq!(output["2024-01-03"]["ACME"]["Adj Close"].as_f64().unwrap(), 50.0);
}

#[test]
fn test_skip_existing_keeps_checkpoints() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::rooted_at(dir.path());
    seed(&config);
    run(&config);

    let resumed = PipelineConfig {
        skip_existing: true,
        ..config.clone()
    };
    let summary = run(&resumed);

    assert_eq!(summary.merge.skipped_existing, 1);
    assert_eq!(summary.align.skipped_existing, 1);
    assert!(summary.concat.is_none());
    assert!(summary.ratios.is_none());
}
