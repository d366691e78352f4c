// =============================================================================
// Signal Engine: bars in, one explainable report out
// =============================================================================
//
// Pipeline:
//   1. Refuse series shorter than `min_bars`
//   2. Compute every indicator over the whole series
//   3. Refuse weekly/monthly evaluation without a defined EMA200
//   4. Classify the last candles
//   5. Detect unmitigated supply / demand zones
//   6. Aggregate support / resistance levels
//   7. Score the rule table and map the score to a verdict
//   8. Compute SL/TP from ATR and the demand zone under price
//
// Stateless: every call starts from the raw bars, so independent series can
// be evaluated in parallel without any synchronisation.
// =============================================================================

use tracing::{debug, info};

use crate::engine_config::{EngineConfig, RiskParams};
use crate::error::{EngineError, Result};
use crate::indicators::series::{ATR_PERIOD, EMA_SLOW};
use crate::indicators::{IndicatorName, IndicatorSeries};
use crate::levels::aggregate_levels;
use crate::market_data::{Bar, BarSeries, InstrumentMeta, MarketData};
use crate::patterns::candlestick::{classify, LOOKBACK};
use crate::signals::report::ReportParts;
use crate::signals::rules::{self, ScoreContext};
use crate::signals::{RiskEnvelope, SignalReport, Verdict};
use crate::types::Timeframe;
use crate::zones::{detect_zones, ZoneSet};

#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: EngineConfig,
}

impl SignalEngine {
    /// Build an engine, rejecting malformed tunables up front.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate a provider payload.  Bars are validated first.
    pub fn evaluate_market_data(&self, data: &MarketData, timeframe: Timeframe) -> Result<SignalReport> {
        let series = BarSeries::new(data.bars.clone())?;
        self.evaluate(&series, timeframe, Some(&data.meta))
    }

    /// Evaluate one series.  The last bar is the current bar.
    pub fn evaluate(
        &self,
        series: &BarSeries,
        timeframe: Timeframe,
        instrument: Option<&InstrumentMeta>,
    ) -> Result<SignalReport> {
        let n = series.len();

        // ── 1. Length gate ───────────────────────────────────────────────
        if n < self.config.min_bars {
            return Err(EngineError::InsufficientData {
                indicator: "bars",
                required: self.config.min_bars,
                available: n,
            });
        }

        // ── 2. Indicators ────────────────────────────────────────────────
        let indicators = IndicatorSeries::compute(series);
        let ema200 = indicators.last(IndicatorName::Ema200);

        // ── 3. Long-horizon trend requires EMA200 ────────────────────────
        if timeframe.is_weekly_or_longer() && ema200.is_none() {
            return Err(EngineError::InsufficientData {
                indicator: "EMA200",
                required: EMA_SLOW,
                available: n,
            });
        }

        let atr = indicators
            .last(IndicatorName::Atr14)
            .ok_or(EngineError::InsufficientData {
                indicator: "ATR14",
                required: ATR_PERIOD + 1,
                available: n,
            })?;

        let current = series.last();
        let price = current.close;
        let previous_close = series.previous().map(|b| b.close);

        // ── 4. Pattern ───────────────────────────────────────────────────
        let pattern = classify(series.tail(LOOKBACK));

        // ── 5. Zones ─────────────────────────────────────────────────────
        let zones = detect_zones(series, indicators.series(IndicatorName::Atr14), &self.config.zones);

        // ── 6. Levels ────────────────────────────────────────────────────
        let levels = aggregate_levels(price, &indicators, &zones, &self.config.levels);

        // ── 7. Score + verdict ───────────────────────────────────────────
        let relative_volume = relative_volume(series, &indicators);
        let ctx = ScoreContext {
            price,
            bar: current,
            previous_close,
            ema20: indicators.last(IndicatorName::Ema20),
            ema50: indicators.last(IndicatorName::Ema50),
            ema200,
            rsi: indicators.last(IndicatorName::Rsi14),
            adx: indicators.last(IndicatorName::Adx14),
            macd: indicators.last(IndicatorName::Macd),
            macd_signal: indicators.last(IndicatorName::MacdSignal),
            obv_slope: indicators.last(IndicatorName::ObvSlope),
            volume_sma: indicators.last(IndicatorName::VolSma20),
            relative_volume,
            pattern: &pattern,
            zones: &zones,
            params: &self.config.scoring,
        };
        let scoring = rules::score(&ctx);
        let verdict = Verdict::from_score(scoring.score, scoring.dip, scoring.panic, &self.config.bands);

        debug!(
            score = scoring.score,
            verdict = %verdict,
            pattern = %pattern.kind,
            dip = scoring.dip,
            panic = scoring.panic,
            capped = scoring.capped,
            "scoring complete"
        );

        // ── 8. Risk envelope ─────────────────────────────────────────────
        let risk = risk_envelope(price, atr, current, &zones, &self.config.risk);

        let change_pct = change_pct(instrument, price, previous_close);

        info!(
            symbol = instrument.map(|m| m.symbol.as_str()).unwrap_or(""),
            timeframe = %timeframe,
            bars = n,
            price,
            score = scoring.score,
            verdict = %verdict,
            stop_loss = risk.stop_loss,
            take_profit = risk.take_profit,
            "signal evaluated"
        );

        Ok(SignalReport::assemble(ReportParts {
            instrument: instrument.cloned(),
            timeframe,
            price,
            change_pct,
            relative_volume,
            scoring,
            verdict,
            risk,
            pattern,
            levels,
            zones,
        }))
    }
}

/// Current volume over VOL_SMA20 at the preceding bar, so the bar being
/// judged does not dilute its own baseline.
pub fn relative_volume(series: &BarSeries, indicators: &IndicatorSeries) -> Option<f64> {
    let n = series.len();
    let baseline = indicators.at(IndicatorName::VolSma20, n.checked_sub(2)?)?;
    if baseline <= 0.0 {
        return None;
    }
    Some(series.last().volume / baseline)
}

/// Stop under the highest demand zone the current bar sits in, otherwise a
/// plain ATR offset.  Target is always an ATR multiple above price.
pub fn risk_envelope(price: f64, atr: f64, current: &Bar, zones: &ZoneSet, params: &RiskParams) -> RiskEnvelope {
    let zone_bottom = zones
        .demand_touching(current)
        .map(|z| z.bottom)
        .max_by(f64::total_cmp);

    let (stop_loss, zone_anchored) = match zone_bottom {
        Some(bottom) => (bottom - params.zone_stop_atr_buffer * atr, true),
        None => (price - params.stop_atr_multiplier * atr, false),
    };

    RiskEnvelope {
        stop_loss,
        take_profit: price + params.take_profit_atr_multiplier * atr,
        zone_anchored,
    }
}

/// Percent change from the provider's quote when present, otherwise from the
/// last two closes.  `None` when the reference price is zero or missing.
fn change_pct(instrument: Option<&InstrumentMeta>, price: f64, previous_close: Option<f64>) -> Option<f64> {
    let quoted = instrument.and_then(|m| Some((m.last_price?, m.previous_close?)));
    let (last, prev) = quoted.or_else(|| previous_close.map(|p| (price, p)))?;
    if prev == 0.0 || !prev.is_finite() {
        return None;
    }
    Some((last - prev) / prev * 100.0)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::{Freshness, Zone, ZoneKind};

    fn bar(t: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: t,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Mild zig-zag around a slow uptrend, enough to form swings.
    fn wavy(n: usize) -> BarSeries {
        let bars = (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.2 + 3.0 * ((i as f64) * 0.7).sin();
                bar(i as i64 * 86_400, base - 0.3, base + 1.0, base - 1.0, base + 0.3, 1_000.0 + (i % 7) as f64 * 50.0)
            })
            .collect();
        BarSeries::new(bars).unwrap()
    }

    fn demand(bottom: f64, top: f64) -> Zone {
        Zone {
            kind: ZoneKind::Demand,
            bottom,
            top,
            origin_timestamp: 0,
            freshness: Freshness::Fresh,
        }
    }

    // ---- evaluate --------------------------------------------------------

    #[test]
    fn refuses_series_shorter_than_min_bars() {
        let engine = SignalEngine::new(EngineConfig::default()).unwrap();
        let err = engine.evaluate(&wavy(49), Timeframe::Daily, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientData { indicator: "bars", required: 50, available: 49 }
        ));
    }

    #[test]
    fn weekly_without_ema200_is_refused() {
        let engine = SignalEngine::new(EngineConfig::default()).unwrap();
        let err = engine.evaluate(&wavy(120), Timeframe::Weekly, None).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { indicator: "EMA200", .. }));
    }

    #[test]
    fn daily_without_ema200_degrades_with_note() {
        let engine = SignalEngine::new(EngineConfig::default()).unwrap();
        let report = engine.evaluate(&wavy(120), Timeframe::Daily, None).unwrap();
        assert!(report.notes.iter().any(|n| n.contains("EMA200")));
        assert!(report.stop_loss.is_finite());
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.levels.max_levels = 0;
        assert!(matches!(SignalEngine::new(config), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn report_is_deterministic() {
        let engine = SignalEngine::new(EngineConfig::default()).unwrap();
        let series = wavy(260);
        let a = engine.evaluate(&series, Timeframe::Daily, None).unwrap();
        let b = engine.evaluate(&series, Timeframe::Daily, None).unwrap();
        assert_eq!(a, b);
    }

    // ---- relative_volume -------------------------------------------------

    #[test]
    fn relative_volume_uses_preceding_average() {
        let mut bars: Vec<Bar> = (0..25)
            .map(|i| bar(i, 100.0, 101.0, 99.0, 100.0, 1_000.0))
            .collect();
        bars[24].volume = 3_000.0;
        let series = BarSeries::new(bars).unwrap();
        let ind = IndicatorSeries::compute(&series);
        let rv = relative_volume(&series, &ind).unwrap();
        assert!((rv - 3.0).abs() < 1e-12);
    }

    #[test]
    fn relative_volume_undefined_when_baseline_zero() {
        let bars: Vec<Bar> = (0..25).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0, 0.0)).collect();
        let series = BarSeries::new(bars).unwrap();
        let ind = IndicatorSeries::compute(&series);
        assert!(relative_volume(&series, &ind).is_none());
    }

    // ---- risk_envelope ---------------------------------------------------

    #[test]
    fn stop_uses_atr_when_outside_zones() {
        let current = bar(0, 100.0, 101.0, 99.0, 100.0, 1.0);
        let r = risk_envelope(100.0, 2.0, &current, &ZoneSet::default(), &RiskParams::default());
        assert_eq!(r.stop_loss, 96.0);
        assert_eq!(r.take_profit, 106.0);
        assert!(!r.zone_anchored);
    }

    #[test]
    fn stop_sits_under_highest_touched_demand_zone() {
        let current = bar(0, 100.0, 101.0, 98.0, 100.0, 1.0);
        let zones = ZoneSet {
            demand: vec![demand(97.5, 98.5), demand(98.2, 99.0), demand(90.0, 91.0)],
            supply: vec![],
        };
        let r = risk_envelope(100.0, 2.0, &current, &zones, &RiskParams::default());
        assert!((r.stop_loss - 97.2).abs() < 1e-12);
        assert!(r.zone_anchored);
    }

    // ---- change_pct ------------------------------------------------------

    #[test]
    fn change_prefers_quote_then_closes() {
        let mut meta = InstrumentMeta::new("AAA");
        meta.last_price = Some(110.0);
        meta.previous_close = Some(100.0);
        assert!((change_pct(Some(&meta), 50.0, Some(40.0)).unwrap() - 10.0).abs() < 1e-12);
        assert!((change_pct(None, 50.0, Some(40.0)).unwrap() - 25.0).abs() < 1e-12);
        assert_eq!(change_pct(None, 50.0, Some(0.0)), None);
        assert_eq!(change_pct(None, 50.0, None), None);
    }
}
