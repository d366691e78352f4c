// =============================================================================
// Market Data Provider -- the collaborator that supplies bars
// =============================================================================
//
// The engine never fetches data itself.  Providers hand over one complete,
// already-fetched series per instrument/timeframe plus read-only metadata.
// Retries, rate limiting and staleness are the provider's business; errors are
// surfaced unchanged.
// =============================================================================

use std::future::Future;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::bar_series::Bar;
use crate::types::Timeframe;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown instrument '{0}'")]
    UnknownSymbol(String),

    #[error("provider returned no bars for '{symbol}' ({timeframe})")]
    EmptySeries { symbol: String, timeframe: Timeframe },

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed provider payload: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only annotation for the report.  Never used in scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMeta {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl InstrumentMeta {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

/// Everything a provider hands over for one instrument/timeframe pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    pub meta: InstrumentMeta,
    pub bars: Vec<Bar>,
}

pub trait MarketDataProvider {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> impl Future<Output = Result<MarketData, ProviderError>> + Send;
}

// ---------------------------------------------------------------------------
// JsonFileProvider -- offline bars from `<dir>/<SYMBOL>.json`
// ---------------------------------------------------------------------------

/// Reads `MarketData` documents from a directory.  A `<SYMBOL>_<tf>.json`
/// file takes precedence over the timeframe-agnostic `<SYMBOL>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    dir: PathBuf,
}

impl JsonFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, symbol: &str, timeframe: Timeframe) -> [PathBuf; 2] {
        [
            self.dir.join(format!("{symbol}_{}.json", timeframe.as_str())),
            self.dir.join(format!("{symbol}.json")),
        ]
    }
}

impl MarketDataProvider for JsonFileProvider {
    async fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<MarketData, ProviderError> {
        let Some(path) = self
            .candidates(symbol, timeframe)
            .into_iter()
            .find(|p| p.is_file())
        else {
            return Err(ProviderError::UnknownSymbol(symbol.to_string()));
        };

        let content = tokio::fs::read_to_string(&path).await?;
        let mut data: MarketData = serde_json::from_str(&content)?;
        if data.meta.symbol.is_empty() {
            data.meta.symbol = symbol.to_string();
        }

        debug!(symbol, path = %path.display(), bars = data.bars.len(), "bars loaded from file");

        if data.bars.is_empty() {
            return Err(ProviderError::EmptySeries {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sse-provider-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn json_provider_unknown_symbol() {
        let provider = JsonFileProvider::new(temp_dir("unknown"));
        let err = provider.fetch("NOPE", Timeframe::Daily).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownSymbol(s) if s == "NOPE"));
    }

    #[tokio::test]
    async fn json_provider_reads_and_fills_symbol() {
        let dir = temp_dir("reads");
        let doc = r#"{"meta":{"symbol":""},"bars":[
            {"timestamp":1,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}]}"#;
        std::fs::write(dir.join("ABC.json"), doc).unwrap();

        let data = JsonFileProvider::new(&dir)
            .fetch("ABC", Timeframe::Weekly)
            .await
            .unwrap();
        assert_eq!(data.meta.symbol, "ABC");
        assert_eq!(data.bars.len(), 1);
    }

    #[tokio::test]
    async fn json_provider_prefers_timeframe_file_and_rejects_empty() {
        let dir = temp_dir("tf");
        std::fs::write(dir.join("XYZ.json"), r#"{"meta":{"symbol":"XYZ"},"bars":[
            {"timestamp":1,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}]}"#)
        .unwrap();
        std::fs::write(dir.join("XYZ_1wk.json"), r#"{"meta":{"symbol":"XYZ"},"bars":[]}"#).unwrap();

        let provider = JsonFileProvider::new(&dir);
        let err = provider.fetch("XYZ", Timeframe::Weekly).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptySeries { .. }));
        assert!(provider.fetch("XYZ", Timeframe::Daily).await.is_ok());
    }
}
