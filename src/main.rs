mod api;
mod config;
mod error;
mod export;
mod report;
mod scorer;
mod source;
mod state;
mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::{router, ApiState, HealthState, LatencyStats};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::export::{read_json_records, write_json};
use crate::source::{Baseline, LiveSource, NseClient};
use crate::state::RunStore;
use crate::types::Snapshot;

#[derive(Parser, Debug)]
#[command(name = "momentum")]
#[command(about = "Intraday price/volume momentum ranking for NIFTY 50 stocks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API
    Serve,
    /// Record live quotes to use later as the reference observation
    Baseline {
        #[arg(short, long, default_value = "baseline_quotes.json")]
        output: PathBuf,
    },
    /// Acquire snapshots from the configured source and save them
    Scrape {
        #[arg(short, long, default_value = "nse_intraday_data.json")]
        output: PathBuf,
    },
    /// Score saved snapshots and print the ranking
    Analyze {
        #[arg(short, long, default_value = "nse_intraday_data.json")]
        input: PathBuf,
        #[arg(short, long, default_value = "momentum_analysis_results.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg, cli.command).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, command: Commands) -> Result<()> {
    match command {
        Commands::Serve => serve(cfg).await,
        Commands::Baseline { output } => record_baseline(&cfg, &output).await,
        Commands::Scrape { output } => scrape(&cfg, &output).await,
        Commands::Analyze { input, output } => analyze(&input, &output),
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let latency = Arc::new(LatencyStats::new());
    let source = source::from_config(&cfg, Arc::clone(&latency))?;
    info!(
        "Snapshot source: {} (mode={}, symbols={}, export_dir={})",
        source.name(),
        cfg.source_mode,
        cfg.symbol_limit,
        cfg.export_dir.display(),
    );

    let state = ApiState {
        store: RunStore::new(),
        source,
        health: Arc::new(HealthState::new()),
        latency,
        export_dir: cfg.export_dir.clone(),
    };
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");
    info!("Endpoints: /api/fetch-data /api/analyze /api/stats /api/export /api/top-performers/:n /api/stock/:symbol /api/health");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn record_baseline(cfg: &Config, output: &Path) -> Result<()> {
    let live = LiveSource::new(
        NseClient::new(cfg, Arc::new(LatencyStats::new())),
        cfg.live_symbols(),
        Baseline::synthetic(),
    );
    let quotes = live.quotes().await?;
    if quotes.is_empty() {
        return Err(AppError::Acquisition("no quotes received from NSE".to_string()));
    }
    write_json(output, &quotes)?;
    info!("Saved {} reference quotes to {}", quotes.len(), output.display());
    info!("Set BASELINE_PATH={} for later scrape/serve runs", output.display());
    Ok(())
}

async fn scrape(cfg: &Config, output: &Path) -> Result<()> {
    let source = source::from_config(cfg, Arc::new(LatencyStats::new()))?;
    let batch = source.snapshots().await?;
    write_json(output, &batch.snapshots)?;
    info!(
        "Saved {} snapshots from {} source to {}",
        batch.snapshots.len(),
        batch.provenance,
        output.display()
    );
    info!("Run `momentum analyze --input {}` to rank them", output.display());
    Ok(())
}

fn analyze(input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        return Err(AppError::NoData(format!(
            "Data file {} not found. Run `momentum scrape` first.",
            input.display()
        )));
    }
    let snapshots: Vec<Snapshot> = read_json_records(input)?;
    info!("Loaded {} snapshots from {}", snapshots.len(), input.display());

    let results = scorer::score(&snapshots);
    print!("{}", report::render(&results));

    write_json(output, &results)?;
    info!("Results saved to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceMode;
    use crate::source::testing::snapshot;
    use crate::types::ScoredResult;

    #[test]
    fn analyze_missing_input_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results.json");
        let err = analyze(&dir.path().join("absent.json"), &output).unwrap_err();
        assert!(matches!(err, AppError::NoData(_)));
        assert!(!output.exists());
    }

    #[test]
    fn analyze_writes_ranking_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("snapshots.json");
        let output = dir.path().join("results.json");
        write_json(
            &input,
            &vec![
                snapshot("TCS", 100.0, 110.0, 1000.0, 1200.0),
                snapshot("INFY", 100.0, 95.0, 1000.0, 1200.0),
                snapshot("SBIN", 100.0, 110.0, 1000.0, 1350.0),
            ],
        )
        .unwrap();

        analyze(&input, &output).unwrap();

        let results: Vec<ScoredResult> = read_json_records(&output).unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["SBIN", "TCS"]);
        assert!((results[0].momentum_score - 350.0).abs() < 1e-9);
    }

    #[test]
    fn analyze_skips_malformed_snapshot_and_scores_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("snapshots.json");
        let output = dir.path().join("results.json");
        let good = serde_json::to_value(snapshot("OK", 100.0, 110.0, 1000.0, 1200.0)).unwrap();
        let mut bad = serde_json::to_value(snapshot("BAD", 100.0, 110.0, 1000.0, 1200.0)).unwrap();
        bad["reference_price"] = serde_json::Value::Null;
        std::fs::write(&input, serde_json::to_string(&vec![bad, good]).unwrap()).unwrap();

        analyze(&input, &output).unwrap();

        let results: Vec<ScoredResult> = read_json_records(&output).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "OK");
        assert!((results[0].momentum_score - 200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn scrape_simulated_then_analyze() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = dir.path().join("nse_intraday_data.json");
        let results = dir.path().join("momentum_analysis_results.json");
        let mut cfg = Config::defaults();
        cfg.source_mode = SourceMode::Simulated;
        cfg.sim_seed = Some(3);

        scrape(&cfg, &snapshots).await.unwrap();
        let saved: Vec<Snapshot> = read_json_records(&snapshots).unwrap();
        assert_eq!(saved.len(), cfg.universe().len());

        analyze(&snapshots, &results).unwrap();
        let ranked: Vec<ScoredResult> = read_json_records(&results).unwrap();
        assert_eq!(ranked.len(), saved.len());
    }

    #[tokio::test]
    async fn baseline_refuses_to_write_empty_quote_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("baseline_quotes.json");
        let mut cfg = Config::defaults();
        cfg.nse_base_url = "http://127.0.0.1:9".to_string();
        cfg.symbol_limit = 2;
        cfg.request_delay_ms = 0;
        cfg.quote_timeout_secs = 1;
        cfg.prime_timeout_secs = 1;

        let err = record_baseline(&cfg, &output).await.unwrap_err();
        assert!(matches!(err, AppError::Acquisition(_)));
        assert!(!output.exists());
    }
}
