// =============================================================================
// Yahoo Finance chart client
// =============================================================================
//
// Fetches OHLCV history from the public v8 chart endpoint.  One request per
// call, no retries and no caching: a failed request is reported to the caller
// as-is.  Rows where the endpoint returns null prices (halts, partial days)
// are dropped rather than filled.
// =============================================================================

use serde::Deserialize;
use tracing::{debug, instrument};

use super::bar_series::Bar;
use super::provider::{InstrumentMeta, MarketData, MarketDataProvider, ProviderError};
use crate::types::Timeframe;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// History span requested when none is configured.  Long enough for EMA200
/// on daily bars.
pub const DEFAULT_RANGE: &str = "2y";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    currency: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance chart API client.
#[derive(Clone)]
pub struct YahooProvider {
    base_url: String,
    range: String,
    client: reqwest::Client,
}

impl YahooProvider {
    /// Create a client requesting `range` of history (e.g. `"6mo"`, `"2y"`).
    pub fn new(range: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (stock-signal-engine)")
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            range: range.into(),
            client,
        })
    }

    /// Point the client at a different host (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, symbol: &str, timeframe: Timeframe) -> String {
        format!(
            "{}/{}?range={}&interval={}&includePrePost=false",
            self.base_url,
            symbol,
            self.range,
            timeframe.as_str()
        )
    }
}

impl MarketDataProvider for YahooProvider {
    #[instrument(skip(self), name = "yahoo::fetch")]
    async fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<MarketData, ProviderError> {
        let url = self.url(symbol, timeframe);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if status.as_u16() == 404 {
            return Err(ProviderError::UnknownSymbol(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data = parse_chart(&body, symbol, timeframe)?;
        debug!(symbol, %timeframe, bars = data.bars.len(), "chart fetched");
        Ok(data)
    }
}

/// Turn a chart payload into `MarketData`.
fn parse_chart(body: &str, symbol: &str, timeframe: Timeframe) -> Result<MarketData, ProviderError> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = response.chart.error {
        return if err.code.eq_ignore_ascii_case("Not Found") {
            Err(ProviderError::UnknownSymbol(symbol.to_string()))
        } else {
            Err(ProviderError::Parse(format!("{}: {}", err.code, err.description)))
        };
    }

    let result = response
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let cell = |col: &Vec<Option<f64>>| col.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            cell(&quote.open),
            cell(&quote.high),
            cell(&quote.low),
            cell(&quote.close),
        ) else {
            continue;
        };
        // Rows that repeat or step back in time are dropped.
        if bars.last().is_some_and(|b: &Bar| ts <= b.timestamp) {
            continue;
        }
        bars.push(Bar {
            timestamp: ts,
            open,
            high: high.max(open).max(close),
            low: low.min(open).min(close),
            close,
            volume: cell(&quote.volume).unwrap_or(0.0),
        });
    }

    if bars.is_empty() {
        return Err(ProviderError::EmptySeries {
            symbol: symbol.to_string(),
            timeframe,
        });
    }

    let meta = result.meta;
    Ok(MarketData {
        meta: InstrumentMeta {
            symbol: meta.symbol,
            display_name: meta.long_name.or(meta.short_name),
            currency: meta.currency,
            last_price: meta.regular_market_price,
            previous_close: meta.previous_close.or(meta.chart_previous_close),
            ..InstrumentMeta::default()
        },
        bars,
    })
}
