use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV bar.  `timestamp` is the bar open in UNIX seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Midpoint of the real body.
    pub fn body_mid(&self) -> f64 {
        (self.open + self.close) / 2.0
    }

    /// Zero-range bars cannot be classified by wick/body ratios.
    pub fn is_degenerate(&self) -> bool {
        self.range() <= 0.0
    }
}

// ---------------------------------------------------------------------------
// BarSeries -- validated, immutable input to the engine
// ---------------------------------------------------------------------------

/// An ordered, immutable bar sequence.  Construction validates that
/// timestamps are strictly ascending and that every value is finite and
/// internally consistent, so downstream code never re-checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        if bars.is_empty() {
            return Err(EngineError::InsufficientData {
                indicator: "bars",
                required: 1,
                available: 0,
            });
        }

        for (i, bar) in bars.iter().enumerate() {
            let values = [bar.open, bar.high, bar.low, bar.close, bar.volume];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(EngineError::InvalidSeries(format!(
                    "bar {i} (ts {}) has a non-finite value",
                    bar.timestamp
                )));
            }
            if bar.volume < 0.0 || bar.low <= 0.0 {
                return Err(EngineError::InvalidSeries(format!(
                    "bar {i} (ts {}) has a non-positive price or negative volume",
                    bar.timestamp
                )));
            }
            if bar.high < bar.low
                || bar.open > bar.high
                || bar.open < bar.low
                || bar.close > bar.high
                || bar.close < bar.low
            {
                return Err(EngineError::InvalidSeries(format!(
                    "bar {i} (ts {}) has open/close outside its high-low range",
                    bar.timestamp
                )));
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(EngineError::InvalidSeries(format!(
                    "timestamps must be strictly ascending (bar {i}: {} after {})",
                    bar.timestamp,
                    bars[i - 1].timestamp
                )));
            }
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The current bar.  Always present: construction rejects empty input.
    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// The bar before the current one, if any.
    pub fn previous(&self) -> Option<&Bar> {
        self.bars.len().checked_sub(2).map(|i| &self.bars[i])
    }

    /// The most recent `count` bars, oldest first.
    pub fn tail(&self, count: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(count);
        &self.bars[start..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

impl<'de> Deserialize<'de> for BarSeries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bars = Vec::<Bar>::deserialize(deserializer)?;
        BarSeries::new(bars).map_err(serde::de::Error::custom)
    }
}
