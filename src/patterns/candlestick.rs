// =============================================================================
// Candlestick Classifier
// =============================================================================
//
// Looks at the last (up to) four bars and names the dominant candle pattern.
// Branches are checked in a fixed priority order and the first match wins;
// patterns from different branches are never compared by magnitude.
//
//   1. Three White Soldiers / Three Black Crows   (3 bars)
//   2. Morning Star / Evening Star                 (3 bars)
//   3. Bullish / Bearish Engulfing                 (2 bars)
//   4. Hammer / Shooting Star                      (1 bar)
//   5. Big Bullish / Bearish candle                (1 bar, strength = true)
//   6. Doji                                        (1 bar)
//   7. Normal candle
//
// A multi-bar branch only runs when enough bars are available.  A current bar
// with zero range is Indeterminate: its ratios are undefined.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::Bar;
use crate::types::Bias;

/// Bars handed to the classifier.
pub const LOOKBACK: usize = 4;

/// Star: first bar body must cover this share of its range.
const STAR_LARGE_BODY: f64 = 0.5;
/// Star: middle bar body must be below this share of the first bar's body.
const STAR_SMALL_BODY: f64 = 0.4;
/// Hammer / shooting star: long wick relative to body.
const WICK_TO_BODY: f64 = 2.0;
/// Dominant candle: body share of range.
const BIG_BODY: f64 = 0.6;
/// Doji: body share of range.
const DOJI_BODY: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
    MorningStar,
    EveningStar,
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    BigBullishCandle,
    BigBearishCandle,
    Doji,
    Normal,
    Indeterminate,
}

impl PatternKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ThreeWhiteSoldiers => "Three White Soldiers",
            Self::ThreeBlackCrows => "Three Black Crows",
            Self::MorningStar => "Morning Star",
            Self::EveningStar => "Evening Star",
            Self::BullishEngulfing => "Bullish Engulfing",
            Self::BearishEngulfing => "Bearish Engulfing",
            Self::Hammer => "Hammer",
            Self::ShootingStar => "Shooting Star",
            Self::BigBullishCandle => "Big Bullish Candle",
            Self::BigBearishCandle => "Big Bearish Candle",
            Self::Doji => "Doji",
            Self::Normal => "Normal Candle",
            Self::Indeterminate => "Indeterminate",
        }
    }

    pub fn bias(&self) -> Bias {
        match self {
            Self::ThreeWhiteSoldiers
            | Self::MorningStar
            | Self::BullishEngulfing
            | Self::Hammer
            | Self::BigBullishCandle => Bias::Bullish,
            Self::ThreeBlackCrows
            | Self::EveningStar
            | Self::BearishEngulfing
            | Self::ShootingStar
            | Self::BigBearishCandle => Bias::Bearish,
            Self::Doji | Self::Normal | Self::Indeterminate => Bias::Neutral,
        }
    }

    /// Bullish reversal shapes that mark a dip being bought.
    pub fn is_dip_reversal(&self) -> bool {
        matches!(self, Self::Hammer | Self::BullishEngulfing | Self::MorningStar)
    }

    fn description(&self) -> &'static str {
        match self {
            Self::ThreeWhiteSoldiers => {
                "Three consecutive bullish candles with rising closes: buyers in sustained control"
            }
            Self::ThreeBlackCrows => {
                "Three consecutive bearish candles with falling closes: sellers in sustained control"
            }
            Self::MorningStar => {
                "Large bearish candle, indecision, then a bullish close past its midpoint: bottom reversal"
            }
            Self::EveningStar => {
                "Large bullish candle, indecision, then a bearish close past its midpoint: top reversal"
            }
            Self::BullishEngulfing => "Bullish body fully engulfs the prior bearish body: buyers took over",
            Self::BearishEngulfing => "Bearish body fully engulfs the prior bullish body: sellers took over",
            Self::Hammer => "Long lower wick rejected lower prices: buyers defended the low",
            Self::ShootingStar => "Long upper wick rejected higher prices: sellers defended the high",
            Self::BigBullishCandle => "Dominant bullish body covering most of the range",
            Self::BigBearishCandle => "Dominant bearish body covering most of the range",
            Self::Doji => "Open and close nearly equal: indecision",
            Self::Normal => "No significant pattern",
            Self::Indeterminate => "Zero-range bar: pattern cannot be determined",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifier output.  Rebuilt on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub name: String,
    pub bias: Bias,
    /// Dominant candle: body covers most of the range.
    pub strength: bool,
    pub description: String,
}

impl Pattern {
    fn from_kind(kind: PatternKind) -> Self {
        Self {
            kind,
            name: kind.label().to_string(),
            bias: kind.bias(),
            strength: matches!(kind, PatternKind::BigBullishCandle | PatternKind::BigBearishCandle),
            description: kind.description().to_string(),
        }
    }
}

/// Classify the pattern ending at the last bar of `bars`.
///
/// Only the last [`LOOKBACK`] bars are read.  An empty slice yields
/// `Indeterminate`.
pub fn classify(bars: &[Bar]) -> Pattern {
    let recent = &bars[bars.len().saturating_sub(LOOKBACK)..];
    let Some(current) = recent.last() else {
        return Pattern::from_kind(PatternKind::Indeterminate);
    };
    if current.is_degenerate() {
        return Pattern::from_kind(PatternKind::Indeterminate);
    }

    let kind = three_bar_trend(recent)
        .or_else(|| star(recent))
        .or_else(|| engulfing(recent))
        .or_else(|| single_bar(current))
        .unwrap_or(PatternKind::Normal);

    Pattern::from_kind(kind)
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

fn last_three(bars: &[Bar]) -> Option<(&Bar, &Bar, &Bar)> {
    match bars {
        [.., a, b, c] => Some((a, b, c)),
        _ => None,
    }
}

fn three_bar_trend(bars: &[Bar]) -> Option<PatternKind> {
    let (a, b, c) = last_three(bars)?;
    if a.is_bearish() && b.is_bearish() && c.is_bearish() && a.close > b.close && b.close > c.close {
        return Some(PatternKind::ThreeBlackCrows);
    }
    if a.is_bullish() && b.is_bullish() && c.is_bullish() && a.close < b.close && b.close < c.close {
        return Some(PatternKind::ThreeWhiteSoldiers);
    }
    None
}

fn star(bars: &[Bar]) -> Option<PatternKind> {
    let (first, middle, last) = last_three(bars)?;
    if first.is_degenerate() || first.body() < STAR_LARGE_BODY * first.range() {
        return None;
    }
    if middle.body() >= STAR_SMALL_BODY * first.body() {
        return None;
    }

    let midpoint = first.body_mid();
    if first.is_bearish() && last.is_bullish() && last.close > midpoint {
        return Some(PatternKind::MorningStar);
    }
    if first.is_bullish() && last.is_bearish() && last.close < midpoint {
        return Some(PatternKind::EveningStar);
    }
    None
}

fn engulfing(bars: &[Bar]) -> Option<PatternKind> {
    let [.., prev, cur] = bars else {
        return None;
    };
    if cur.body() <= prev.body() {
        return None;
    }
    if prev.is_bearish() && cur.is_bullish() && cur.open <= prev.close && cur.close >= prev.open {
        return Some(PatternKind::BullishEngulfing);
    }
    if prev.is_bullish() && cur.is_bearish() && cur.open >= prev.close && cur.close <= prev.open {
        return Some(PatternKind::BearishEngulfing);
    }
    None
}

fn single_bar(bar: &Bar) -> Option<PatternKind> {
    let body = bar.body();
    let range = bar.range();
    let upper = bar.upper_wick();
    let lower = bar.lower_wick();

    if lower > WICK_TO_BODY * body && upper < body {
        return Some(PatternKind::Hammer);
    }
    if upper > WICK_TO_BODY * body && lower < body {
        return Some(PatternKind::ShootingStar);
    }
    if body >= BIG_BODY * range {
        return Some(if bar.is_bullish() {
            PatternKind::BigBullishCandle
        } else {
            PatternKind::BigBearishCandle
        });
    }
    if body < DOJI_BODY * range {
        return Some(PatternKind::Doji);
    }
    None
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: 0,
            open,
            high,
            low,
            close,
            volume: 1_000.0,
        }
    }

    // ---- priority --------------------------------------------------------

    #[test]
    fn morning_star_beats_engulfing_on_its_last_two_bars() {
        // Bars two and three also form a bullish engulfing.
        let bars = vec![
            bar(110.0, 110.5, 99.5, 100.0),
            bar(99.5, 100.0, 98.5, 99.0),
            bar(98.8, 107.5, 98.5, 107.0),
        ];
        assert_eq!(engulfing(&bars), Some(PatternKind::BullishEngulfing));
        assert_eq!(star(&bars), Some(PatternKind::MorningStar));
        let p = classify(&bars);
        assert_eq!(p.kind, PatternKind::MorningStar);
        assert_eq!(p.bias, Bias::Bullish);
    }

    #[test]
    fn three_black_crows_with_growing_last_body() {
        // The last body dwarfs the one before it.  Both are bearish, so no
        // engulfing can form and the crows rule decides.
        let bars = vec![
            bar(110.0, 111.0, 104.0, 105.0),
            bar(104.5, 105.0, 102.0, 103.0),
            bar(103.5, 104.0, 95.0, 96.0),
        ];
        let p = classify(&bars);
        assert_eq!(p.kind, PatternKind::ThreeBlackCrows);
        assert_eq!(p.bias, Bias::Bearish);
        assert_eq!(engulfing(&bars), None);
    }

    #[test]
    fn crows_beat_bearish_engulfing_when_prior_bar_is_bullish_inside_window() {
        // Window of four: a bullish bar then three falling bearish bars.  The
        // last pair is bearish/bearish, and the crows rule fires first.
        let bars = vec![
            bar(100.0, 106.0, 99.0, 105.0),
            bar(105.0, 105.5, 100.0, 101.0),
            bar(101.0, 101.5, 97.0, 98.0),
            bar(98.0, 98.5, 90.0, 91.0),
        ];
        assert_eq!(classify(&bars).kind, PatternKind::ThreeBlackCrows);
    }

    #[test]
    fn three_white_soldiers() {
        let bars = vec![
            bar(100.0, 103.5, 99.5, 103.0),
            bar(103.0, 106.5, 102.5, 106.0),
            bar(106.0, 109.5, 105.5, 109.0),
        ];
        let p = classify(&bars);
        assert_eq!(p.kind, PatternKind::ThreeWhiteSoldiers);
        assert!(!p.strength);
    }

    #[test]
    fn soldiers_need_strictly_rising_closes() {
        let bars = vec![
            bar(100.0, 103.5, 99.5, 103.0),
            bar(101.0, 103.5, 100.5, 103.0),
            bar(102.0, 109.5, 101.5, 109.0),
        ];
        assert_ne!(classify(&bars).kind, PatternKind::ThreeWhiteSoldiers);
    }

    // ---- stars -----------------------------------------------------------

    #[test]
    fn morning_star() {
        let bars = vec![
            bar(110.0, 110.5, 99.5, 100.0), // large bearish, body 10 of 11
            bar(99.0, 100.0, 97.0, 99.5),   // small body 0.5
            bar(100.0, 108.0, 99.8, 107.0), // bullish close above 105 midpoint
        ];
        let p = classify(&bars);
        assert_eq!(p.kind, PatternKind::MorningStar);
        assert!(p.kind.is_dip_reversal());
    }

    #[test]
    fn evening_star() {
        let bars = vec![
            bar(100.0, 110.5, 99.5, 110.0),
            bar(111.0, 113.0, 110.0, 111.5),
            bar(110.0, 110.2, 102.0, 103.0),
        ];
        assert_eq!(classify(&bars).kind, PatternKind::EveningStar);
    }

    #[test]
    fn star_requires_close_past_midpoint() {
        let bars = vec![
            bar(110.0, 110.5, 99.5, 100.0),
            bar(99.0, 100.0, 97.0, 99.5),
            bar(100.0, 104.5, 99.8, 104.0), // below 105 midpoint
        ];
        assert_ne!(classify(&bars).kind, PatternKind::MorningStar);
    }

    // ---- engulfing -------------------------------------------------------

    #[test]
    fn bullish_engulfing() {
        let bars = vec![bar(102.0, 102.5, 99.5, 100.0), bar(99.5, 104.0, 99.0, 103.0)];
        assert_eq!(classify(&bars).kind, PatternKind::BullishEngulfing);
    }

    #[test]
    fn bearish_engulfing() {
        let bars = vec![bar(100.0, 102.5, 99.5, 102.0), bar(102.5, 103.0, 98.0, 99.0)];
        assert_eq!(classify(&bars).kind, PatternKind::BearishEngulfing);
    }

    // ---- single bar ------------------------------------------------------

    #[test]
    fn hammer_and_shooting_star() {
        let hammer = bar(100.0, 100.8, 96.0, 100.5);
        assert_eq!(classify(&[hammer]).kind, PatternKind::Hammer);

        let star = bar(100.5, 105.0, 99.8, 100.0);
        assert_eq!(classify(&[star]).kind, PatternKind::ShootingStar);
    }

    #[test]
    fn big_candles_flag_strength() {
        let p = classify(&[bar(100.0, 108.5, 99.5, 108.0)]);
        assert_eq!(p.kind, PatternKind::BigBullishCandle);
        assert!(p.strength);

        let p = classify(&[bar(108.0, 108.5, 99.5, 100.0)]);
        assert_eq!(p.kind, PatternKind::BigBearishCandle);
        assert!(p.strength);
        assert_eq!(p.bias, Bias::Bearish);
    }

    #[test]
    fn doji_and_normal() {
        // Long wicks both sides, tiny body: neither hammer nor star.
        let p = classify(&[bar(100.0, 105.0, 95.0, 100.2)]);
        assert_eq!(p.kind, PatternKind::Doji);
        assert_eq!(p.bias, Bias::Neutral);

        let p = classify(&[bar(100.0, 104.0, 98.0, 102.0)]);
        assert_eq!(p.kind, PatternKind::Normal);
    }

    #[test]
    fn degenerate_bar_is_indeterminate() {
        let p = classify(&[bar(100.0, 100.0, 100.0, 100.0)]);
        assert_eq!(p.kind, PatternKind::Indeterminate);
        assert_eq!(classify(&[]).kind, PatternKind::Indeterminate);
    }

    #[test]
    fn single_bar_input_skips_multi_bar_branches() {
        // On its own this is just a dominant candle.
        let p = classify(&[bar(99.5, 104.0, 99.0, 103.0)]);
        assert_eq!(p.kind, PatternKind::BigBullishCandle);
    }
}
