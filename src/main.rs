// =============================================================================
// Stock Signal: Main Entry Point
// =============================================================================
//
// Fetches bars for every configured symbol concurrently, evaluates each on
// the blocking pool and prints the reports as JSON.  One failing symbol never
// aborts the others.
//
// Environment:
//   SIGNAL_SYMBOLS    comma-separated symbols (default EOSE); CLI args win
//   SIGNAL_TIMEFRAME  1d | 1wk | 1mo (default 1d)
//   SIGNAL_CONFIG     engine config JSON (defaults when missing)
//   SIGNAL_BARS_DIR   read bars from JSON files instead of Yahoo
//   SIGNAL_RANGE      Yahoo history range (default 2y)
//   SIGNAL_HISTORY    search history file (default search_history.json)
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stock_signal_engine::history::DEFAULT_CAPACITY;
use stock_signal_engine::market_data::yahoo::DEFAULT_RANGE;
use stock_signal_engine::market_data::{JsonFileProvider, YahooProvider};
use stock_signal_engine::{
    EngineConfig, MarketDataProvider, SearchHistory, SignalEngine, SignalReport, Timeframe,
};

const DEFAULT_SYMBOL: &str = "EOSE";
const DEFAULT_HISTORY_PATH: &str = "search_history.json";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("SIGNAL_CONFIG") {
        Ok(path) => EngineConfig::load(&path).unwrap_or_else(|e| {
            warn!(error = %e, path = %path, "Failed to load engine config, using defaults");
            EngineConfig::default()
        }),
        Err(_) => EngineConfig::default(),
    };
    let engine = Arc::new(SignalEngine::new(config).context("engine config rejected")?);

    let timeframe: Timeframe = std::env::var("SIGNAL_TIMEFRAME")
        .unwrap_or_else(|_| "1d".to_string())
        .parse()
        .map_err(anyhow::Error::msg)?;

    let symbols = symbols_from_env();
    info!(symbols = ?symbols, timeframe = %timeframe, "evaluating");

    // ── 2. Search history (caller-owned) ─────────────────────────────────
    let history_path =
        std::env::var("SIGNAL_HISTORY").unwrap_or_else(|_| DEFAULT_HISTORY_PATH.to_string());
    let history = SearchHistory::load(&history_path, DEFAULT_CAPACITY).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load search history, starting empty");
        SearchHistory::default()
    });
    let history = Arc::new(Mutex::new(history));

    // ── 3. Evaluate with the selected provider ───────────────────────────
    let reports = match std::env::var("SIGNAL_BARS_DIR") {
        Ok(dir) => {
            info!(dir = %dir, "reading bars from files");
            run(Arc::new(JsonFileProvider::new(dir)), engine, symbols, timeframe, history.clone()).await
        }
        Err(_) => {
            let range = std::env::var("SIGNAL_RANGE").unwrap_or_else(|_| DEFAULT_RANGE.to_string());
            let provider = YahooProvider::new(range).context("failed to build HTTP client")?;
            run(Arc::new(provider), engine, symbols, timeframe, history.clone()).await
        }
    };

    // ── 4. Output ────────────────────────────────────────────────────────
    for report in &reports {
        info!(headline = %report.headline(), "report ready");
        println!("{}", serde_json::to_string_pretty(report)?);
    }

    if let Err(e) = history.lock().save(&history_path) {
        warn!(error = %e, "Failed to save search history");
    }

    info!(evaluated = reports.len(), "done");
    Ok(())
}

fn symbols_from_env() -> Vec<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let raw = if args.is_empty() {
        std::env::var("SIGNAL_SYMBOLS").unwrap_or_default()
    } else {
        args.join(",")
    };
    let symbols: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        vec![DEFAULT_SYMBOL.to_string()]
    } else {
        symbols
    }
}

/// Fetch and evaluate every symbol concurrently.  Reports come back in the
/// order the symbols were given.
async fn run<P>(
    provider: Arc<P>,
    engine: Arc<SignalEngine>,
    symbols: Vec<String>,
    timeframe: Timeframe,
    history: Arc<Mutex<SearchHistory>>,
) -> Vec<SignalReport>
where
    P: MarketDataProvider + Send + Sync + 'static,
{
    let mut tasks = JoinSet::new();

    for (idx, symbol) in symbols.into_iter().enumerate() {
        let provider = provider.clone();
        let engine = engine.clone();
        let history = history.clone();
        tasks.spawn(async move {
            let data = match provider.fetch(&symbol, timeframe).await {
                Ok(d) => d,
                Err(e) => {
                    error!(symbol = %symbol, error = %e, "Market data fetch failed");
                    return None;
                }
            };
            history.lock().record(&symbol, timeframe);

            // CPU-bound: keep it off the async workers.
            let result =
                tokio::task::spawn_blocking(move || engine.evaluate_market_data(&data, timeframe)).await;

            match result {
                Ok(Ok(report)) => Some((idx, report)),
                Ok(Err(e)) => {
                    warn!(symbol = %symbol, error = %e, "Evaluation refused");
                    None
                }
                Err(e) => {
                    error!(symbol = %symbol, error = %e, "Evaluation task panicked");
                    None
                }
            }
        });
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(entry)) => reports.push(entry),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Symbol task failed"),
        }
    }
    reports.sort_by_key(|(idx, _)| *idx);
    reports.into_iter().map(|(_, r)| r).collect()
}
