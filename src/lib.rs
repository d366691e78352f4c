// =============================================================================
// Stock Signal Engine
// =============================================================================
//
// Technical-analysis signal engine: bars in, one explainable report out.
//
//   indicators   EMA / RSI / MACD / ATR / ADX / Bollinger / OBV pipeline
//   patterns     candlestick classifier
//   zones        supply / demand zones from swing extremes
//   levels       support / resistance aggregation
//   signals      rule table scorer, verdict bands, report
//   engine       the orchestrator
//
// `market_data` and `history` are host-side collaborators: data providers
// and the caller-owned search history.
// =============================================================================

pub mod engine;
pub mod engine_config;
pub mod error;
pub mod history;
pub mod indicators;
pub mod levels;
pub mod market_data;
pub mod patterns;
pub mod signals;
pub mod types;
pub mod zones;

pub use engine::SignalEngine;
pub use engine_config::EngineConfig;
pub use error::{EngineError, Result};
pub use history::SearchHistory;
pub use market_data::{Bar, BarSeries, InstrumentMeta, MarketData, MarketDataProvider};
pub use signals::{SignalReport, Verdict};
pub use types::Timeframe;
