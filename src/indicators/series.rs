// =============================================================================
// Indicator Pipeline
// =============================================================================
//
// Runs every indicator over one bar series and stores the results under a
// fixed name, each vector aligned index-for-index with the bars.  Windows
// that are not yet full hold NaN, never 0.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use tracing::debug;

use super::{adx, atr, bollinger, ema, macd, obv, rsi, sma};
use crate::market_data::BarSeries;

pub const EMA_FAST: usize = 20;
pub const EMA_MID: usize = 50;
pub const EMA_SLOW: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const ADX_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_STD: f64 = 2.0;
pub const OBV_SLOPE_WINDOW: usize = 5;
pub const VOLUME_SMA_PERIOD: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IndicatorName {
    #[serde(rename = "EMA20")]
    Ema20,
    #[serde(rename = "EMA50")]
    Ema50,
    #[serde(rename = "EMA200")]
    Ema200,
    #[serde(rename = "RSI14")]
    Rsi14,
    #[serde(rename = "ATR14")]
    Atr14,
    #[serde(rename = "ADX14")]
    Adx14,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "MACD_SIGNAL")]
    MacdSignal,
    #[serde(rename = "MACD_HIST")]
    MacdHist,
    #[serde(rename = "BB_UPPER")]
    BbUpper,
    #[serde(rename = "BB_MIDDLE")]
    BbMiddle,
    #[serde(rename = "BB_LOWER")]
    BbLower,
    #[serde(rename = "OBV")]
    Obv,
    #[serde(rename = "OBV_SLOPE")]
    ObvSlope,
    #[serde(rename = "VOL_SMA20")]
    VolSma20,
}

impl IndicatorName {
    pub const ALL: [IndicatorName; 15] = [
        Self::Ema20,
        Self::Ema50,
        Self::Ema200,
        Self::Rsi14,
        Self::Atr14,
        Self::Adx14,
        Self::Macd,
        Self::MacdSignal,
        Self::MacdHist,
        Self::BbUpper,
        Self::BbMiddle,
        Self::BbLower,
        Self::Obv,
        Self::ObvSlope,
        Self::VolSma20,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ema20 => "EMA20",
            Self::Ema50 => "EMA50",
            Self::Ema200 => "EMA200",
            Self::Rsi14 => "RSI14",
            Self::Atr14 => "ATR14",
            Self::Adx14 => "ADX14",
            Self::Macd => "MACD",
            Self::MacdSignal => "MACD_SIGNAL",
            Self::MacdHist => "MACD_HIST",
            Self::BbUpper => "BB_UPPER",
            Self::BbMiddle => "BB_MIDDLE",
            Self::BbLower => "BB_LOWER",
            Self::Obv => "OBV",
            Self::ObvSlope => "OBV_SLOPE",
            Self::VolSma20 => "VOL_SMA20",
        }
    }

    /// Bars needed before the first defined value.
    pub fn min_bars(&self) -> usize {
        match self {
            Self::Ema20 => EMA_FAST,
            Self::Ema50 => EMA_MID,
            Self::Ema200 => EMA_SLOW,
            Self::Rsi14 => RSI_PERIOD + 1,
            Self::Atr14 => ATR_PERIOD + 1,
            Self::Adx14 => 2 * ADX_PERIOD,
            Self::Macd => MACD_SLOW,
            Self::MacdSignal | Self::MacdHist => MACD_SLOW + MACD_SIGNAL - 1,
            Self::BbUpper | Self::BbMiddle | Self::BbLower => BB_PERIOD,
            Self::Obv => 1,
            Self::ObvSlope => OBV_SLOPE_WINDOW,
            Self::VolSma20 => VOLUME_SMA_PERIOD,
        }
    }
}

impl std::fmt::Display for IndicatorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Every indicator for one series.  Immutable once computed.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    len: usize,
    values: BTreeMap<IndicatorName, Vec<f64>>,
}

impl IndicatorSeries {
    pub fn compute(series: &BarSeries) -> Self {
        let bars = series.bars();
        let closes = series.closes();
        let volumes = series.volumes();

        let mut values = BTreeMap::new();
        values.insert(IndicatorName::Ema20, ema::calculate_ema(&closes, EMA_FAST));
        values.insert(IndicatorName::Ema50, ema::calculate_ema(&closes, EMA_MID));
        values.insert(IndicatorName::Ema200, ema::calculate_ema(&closes, EMA_SLOW));
        values.insert(IndicatorName::Rsi14, rsi::calculate_rsi(&closes, RSI_PERIOD));
        values.insert(IndicatorName::Atr14, atr::calculate_atr(bars, ATR_PERIOD));
        values.insert(IndicatorName::Adx14, adx::calculate_adx(bars, ADX_PERIOD));

        let m = macd::calculate_macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        values.insert(IndicatorName::Macd, m.macd);
        values.insert(IndicatorName::MacdSignal, m.signal);
        values.insert(IndicatorName::MacdHist, m.histogram);

        let bb = bollinger::calculate_bollinger(&closes, BB_PERIOD, BB_STD);
        values.insert(IndicatorName::BbUpper, bb.upper);
        values.insert(IndicatorName::BbMiddle, bb.middle);
        values.insert(IndicatorName::BbLower, bb.lower);

        let obv_series = obv::calculate_obv(bars);
        values.insert(IndicatorName::ObvSlope, obv::rolling_slope(&obv_series, OBV_SLOPE_WINDOW));
        values.insert(IndicatorName::Obv, obv_series);
        values.insert(IndicatorName::VolSma20, sma::calculate_sma(&volumes, VOLUME_SMA_PERIOD));

        debug!(bars = series.len(), indicators = values.len(), "indicator pipeline complete");

        Self {
            len: series.len(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Full aligned series for `name`.
    pub fn series(&self, name: IndicatorName) -> &[f64] {
        self.values.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Value at `index`, `None` when undefined or out of range.
    pub fn at(&self, name: IndicatorName, index: usize) -> Option<f64> {
        self.series(name).get(index).copied().filter(|v| v.is_finite())
    }

    /// Value at the current (last) bar.
    pub fn last(&self, name: IndicatorName) -> Option<f64> {
        self.len.checked_sub(1).and_then(|i| self.at(name, i))
    }
}

/// Serialises as `{ "EMA20": [..], ... }` with undefined values as `null`.
impl Serialize for IndicatorSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let view: BTreeMap<&'static str, Vec<Option<f64>>> = self
            .values
            .iter()
            .map(|(name, v)| {
                let cells = v.iter().map(|x| x.is_finite().then_some(*x)).collect();
                (name.label(), cells)
            })
            .collect();
        view.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Bar;

    fn rising(n: usize) -> BarSeries {
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 * 1.01_f64.powi(i as i32);
                let open = if i == 0 { close } else { 100.0 * 1.01_f64.powi(i as i32 - 1) };
                Bar {
                    timestamp: i as i64 * 86_400,
                    open,
                    high: close * 1.002,
                    low: open * 0.998,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect();
        BarSeries::new(bars).unwrap()
    }

    #[test]
    fn every_series_is_aligned() {
        let ind = IndicatorSeries::compute(&rising(60));
        for name in IndicatorName::ALL {
            assert_eq!(ind.series(name).len(), 60, "{name} misaligned");
        }
    }

    #[test]
    fn undefined_until_window_full() {
        let ind = IndicatorSeries::compute(&rising(60));
        for name in IndicatorName::ALL {
            let first = ind.series(name).iter().position(|v| v.is_finite());
            match first {
                Some(idx) => assert_eq!(idx + 1, name.min_bars(), "{name} defined too early or late"),
                None => assert!(name.min_bars() > 60, "{name} never defined"),
            }
        }
    }

    #[test]
    fn ema200_undefined_below_two_hundred_bars() {
        let ind = IndicatorSeries::compute(&rising(199));
        assert!(ind.last(IndicatorName::Ema200).is_none());
        let ind = IndicatorSeries::compute(&rising(200));
        assert!(ind.last(IndicatorName::Ema200).is_some());
    }

    #[test]
    fn serialises_undefined_as_null() {
        let ind = IndicatorSeries::compute(&rising(30));
        let json = serde_json::to_value(&ind).unwrap();
        assert!(json["EMA200"][29].is_null());
        assert!(json["EMA20"][29].is_number());
    }
}
