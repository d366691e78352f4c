pub mod bar_series;
pub mod provider;
pub mod yahoo;

// Re-export the Bar struct for convenient access (e.g. `use crate::market_data::Bar`).
pub use bar_series::{Bar, BarSeries};
pub use provider::{InstrumentMeta, JsonFileProvider, MarketData, MarketDataProvider, ProviderError};
pub use yahoo::YahooProvider;
