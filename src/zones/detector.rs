// =============================================================================
// Zone Detector: unmitigated supply / demand from swing extremes
// =============================================================================
//
// A bar is a swing low when its low is strictly below the lows of the
// `swing_strength` bars on either side (swing high: mirror on highs).  The
// newest `swing_strength` bars can never qualify, they lack confirmation.
//
// Each swing low seeds a demand zone [low, low + ATR * buffer]; each swing
// high seeds a supply zone [high - ATR * buffer, high].  A zone is dropped as
// soon as any later close crosses it in the adverse direction, and when its
// midpoint sits too far from the current price.  Any later bar that reaches
// into a surviving zone, the confirming bars included, marks it tested.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine_config::ZoneParams;
use crate::market_data::{Bar, BarSeries};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Demand,
    Supply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Price has not come back to the zone since it was confirmed.
    Fresh,
    /// Revisited at least once without a close through it.
    Tested,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub bottom: f64,
    pub top: f64,
    pub origin_timestamp: i64,
    pub freshness: Freshness,
}

impl Zone {
    pub fn mid(&self) -> f64 {
        (self.bottom + self.top) / 2.0
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.bottom && price <= self.top
    }

    /// True when the bar's high-low range intersects the zone band.
    pub fn overlaps(&self, bar: &Bar) -> bool {
        bar.low <= self.top && bar.high >= self.bottom
    }

    fn is_broken_by(&self, close: f64) -> bool {
        match self.kind {
            ZoneKind::Demand => close < self.bottom,
            ZoneKind::Supply => close > self.top,
        }
    }
}

/// Surviving zones.  Demand is ordered nearest-below-price first (highest
/// top), supply nearest-above-price first (lowest bottom).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneSet {
    pub demand: Vec<Zone>,
    pub supply: Vec<Zone>,
}

impl ZoneSet {
    pub fn is_empty(&self) -> bool {
        self.demand.is_empty() && self.supply.is_empty()
    }

    /// Demand zones the bar overlaps.
    pub fn demand_touching<'a>(&'a self, bar: &'a Bar) -> impl Iterator<Item = &'a Zone> + 'a {
        self.demand.iter().filter(move |z| z.overlaps(bar))
    }

    /// Supply zones the bar overlaps.
    pub fn supply_touching<'a>(&'a self, bar: &'a Bar) -> impl Iterator<Item = &'a Zone> + 'a {
        self.supply.iter().filter(move |z| z.overlaps(bar))
    }
}

// ---------------------------------------------------------------------------
// Swing detection
// ---------------------------------------------------------------------------

fn is_swing_low(bars: &[Bar], i: usize, strength: usize) -> bool {
    let low = bars[i].low;
    (1..=strength).all(|k| low < bars[i - k].low && low < bars[i + k].low)
}

fn is_swing_high(bars: &[Bar], i: usize, strength: usize) -> bool {
    let high = bars[i].high;
    (1..=strength).all(|k| high > bars[i - k].high && high > bars[i + k].high)
}

/// Indices of confirmed swing lows and highs, oldest first.
pub fn swing_points(bars: &[Bar], strength: usize) -> (Vec<usize>, Vec<usize>) {
    let mut lows = Vec::new();
    let mut highs = Vec::new();
    if strength == 0 || bars.len() < 2 * strength + 1 {
        return (lows, highs);
    }
    for i in strength..bars.len() - strength {
        if is_swing_low(bars, i, strength) {
            lows.push(i);
        }
        if is_swing_high(bars, i, strength) {
            highs.push(i);
        }
    }
    (lows, highs)
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Detect unmitigated zones over the whole series.
///
/// `atr` must be aligned with the bars.  Swings whose ATR is still undefined
/// produce no zone.
pub fn detect_zones(series: &BarSeries, atr: &[f64], params: &ZoneParams) -> ZoneSet {
    let bars = series.bars();
    let price = series.last().close;
    let (lows, highs) = swing_points(bars, params.swing_strength);

    let mut set = ZoneSet::default();
    let mut broken = 0usize;
    let mut distant = 0usize;

    let candidates = lows
        .into_iter()
        .map(|i| (i, ZoneKind::Demand))
        .chain(highs.into_iter().map(|i| (i, ZoneKind::Supply)));

    for (i, kind) in candidates {
        let Some(zone) = build_zone(bars, atr, i, kind, params) else {
            continue;
        };
        let Some(freshness) = survive(bars, i, &zone) else {
            broken += 1;
            continue;
        };
        if price > 0.0 && (zone.mid() - price).abs() / price * 100.0 > params.max_distance_pct {
            distant += 1;
            continue;
        }
        let zone = Zone { freshness, ..zone };
        match kind {
            ZoneKind::Demand => set.demand.push(zone),
            ZoneKind::Supply => set.supply.push(zone),
        }
    }

    set.demand.sort_by(|a, b| b.top.total_cmp(&a.top));
    set.supply.sort_by(|a, b| a.bottom.total_cmp(&b.bottom));

    debug!(
        demand = set.demand.len(),
        supply = set.supply.len(),
        broken,
        distant,
        "zone detection complete"
    );
    set
}

fn build_zone(bars: &[Bar], atr: &[f64], i: usize, kind: ZoneKind, params: &ZoneParams) -> Option<Zone> {
    let atr_i = atr.get(i).copied().filter(|a| a.is_finite())?;
    let buffer = atr_i * params.atr_buffer;
    let bar = &bars[i];
    let (bottom, top) = match kind {
        ZoneKind::Demand => (bar.low, bar.low + buffer),
        ZoneKind::Supply => (bar.high - buffer, bar.high),
    };
    Some(Zone {
        kind,
        bottom,
        top,
        origin_timestamp: bar.timestamp,
        freshness: Freshness::Fresh,
    })
}

/// Scan every bar after the origin.  `None` when a close broke the zone,
/// otherwise whether any later bar, confirming bars included, came back
/// into it.
fn survive(bars: &[Bar], origin: usize, zone: &Zone) -> Option<Freshness> {
    let mut freshness = Freshness::Fresh;
    for bar in &bars[origin + 1..] {
        if zone.is_broken_by(bar.close) {
            return None;
        }
        if zone.overlaps(bar) {
            freshness = Freshness::Tested;
        }
    }
    Some(freshness)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(t: i64, low: f64, high: f64, close: f64) -> Bar {
        Bar {
            timestamp: t,
            open: close,
            high,
            low,
            close,
            volume: 1_000.0,
        }
    }

    /// V shape with its trough at index 3, then a gentle drift.
    fn v_series(tail: &[(f64, f64, f64)]) -> BarSeries {
        let mut bars = vec![
            bar(0, 104.0, 106.0, 105.0),
            bar(1, 102.0, 104.0, 103.0),
            bar(2, 100.0, 102.0, 101.0),
            bar(3, 98.0, 100.0, 99.0),
            bar(4, 100.0, 102.0, 101.0),
            bar(5, 102.0, 104.0, 103.0),
        ];
        for (k, &(low, high, close)) in tail.iter().enumerate() {
            bars.push(bar(6 + k as i64, low, high, close));
        }
        BarSeries::new(bars).unwrap()
    }

    fn flat_atr(n: usize, value: f64) -> Vec<f64> {
        vec![value; n]
    }

    // ---- swing_points ----------------------------------------------------

    #[test]
    fn swing_low_needs_two_confirming_bars() {
        let s = v_series(&[]);
        let (lows, highs) = swing_points(s.bars(), 2);
        assert_eq!(lows, vec![3]);
        assert!(highs.is_empty());
    }

    #[test]
    fn newest_bars_are_never_swings() {
        // Trough on the second-to-last bar: unconfirmed.
        let bars = vec![
            bar(0, 104.0, 106.0, 105.0),
            bar(1, 102.0, 104.0, 103.0),
            bar(2, 100.0, 102.0, 101.0),
            bar(3, 98.0, 100.0, 99.0),
            bar(4, 100.0, 102.0, 101.0),
        ];
        let (lows, _) = swing_points(&bars, 2);
        assert!(lows.is_empty());
    }

    #[test]
    fn equal_lows_are_not_swings() {
        let bars = vec![
            bar(0, 100.0, 102.0, 101.0),
            bar(1, 99.0, 101.0, 100.0),
            bar(2, 98.0, 100.0, 99.0),
            bar(3, 98.0, 100.0, 99.0),
            bar(4, 99.0, 101.0, 100.0),
            bar(5, 100.0, 102.0, 101.0),
        ];
        let (lows, _) = swing_points(&bars, 2);
        assert!(lows.is_empty());
    }

    // ---- detect_zones ----------------------------------------------------

    #[test]
    fn demand_zone_band_uses_atr_at_swing() {
        let s = v_series(&[(103.0, 105.0, 104.0)]);
        let mut atr = flat_atr(s.len(), 2.0);
        atr[3] = 4.0;
        let zones = detect_zones(&s, &atr, &ZoneParams::default());
        assert_eq!(zones.demand.len(), 1);
        let z = &zones.demand[0];
        assert_eq!(z.bottom, 98.0);
        assert!((z.top - 99.0).abs() < 1e-12);
        assert_eq!(z.origin_timestamp, 3);
        assert_eq!(z.freshness, Freshness::Fresh);
    }

    #[test]
    fn undefined_atr_skips_swing() {
        let s = v_series(&[(103.0, 105.0, 104.0)]);
        let mut atr = flat_atr(s.len(), 2.0);
        atr[3] = f64::NAN;
        assert!(detect_zones(&s, &atr, &ZoneParams::default()).demand.is_empty());
    }

    #[test]
    fn close_below_bottom_breaks_demand_zone() {
        // Close at 97.5 < 98.0, then a recovery.  The zone stays gone.
        let s = v_series(&[(97.0, 101.0, 97.5), (100.0, 104.0, 103.0), (103.0, 106.0, 105.0)]);
        let atr = flat_atr(s.len(), 2.0);
        let zones = detect_zones(&s, &atr, &ZoneParams::default());
        assert!(zones.demand.iter().all(|z| z.origin_timestamp != 3));
    }

    #[test]
    fn wick_into_zone_marks_it_tested() {
        // Low dips to 98.2 inside [98, 98.5] but closes above.
        let s = v_series(&[(98.2, 102.0, 101.0), (101.0, 104.0, 103.0)]);
        let atr = flat_atr(s.len(), 2.0);
        let zones = detect_zones(&s, &atr, &ZoneParams::default());
        let z = zones.demand.iter().find(|z| z.origin_timestamp == 3).unwrap();
        assert_eq!(z.freshness, Freshness::Tested);
    }

    #[test]
    fn confirming_bar_touch_marks_it_tested() {
        // The first bar after the trough wicks to 98.3 inside [98, 98.5]
        // and still confirms the swing.
        let mut bars = v_series(&[(103.0, 105.0, 104.0)]).bars().to_vec();
        bars[4] = bar(4, 98.3, 102.0, 101.0);
        let s = BarSeries::new(bars).unwrap();
        let atr = flat_atr(s.len(), 2.0);
        let zones = detect_zones(&s, &atr, &ZoneParams::default());
        let z = zones.demand.iter().find(|z| z.origin_timestamp == 3).unwrap();
        assert_eq!(z.freshness, Freshness::Tested);
    }

    #[test]
    fn distant_zone_is_dropped() {
        let s = v_series(&[(150.0, 160.0, 155.0)]);
        let atr = flat_atr(s.len(), 2.0);
        let params = ZoneParams {
            max_distance_pct: 20.0,
            ..ZoneParams::default()
        };
        assert!(detect_zones(&s, &atr, &params).demand.is_empty());
    }

    #[test]
    fn supply_zone_mirrors_demand() {
        let bars = vec![
            bar(0, 94.0, 96.0, 95.0),
            bar(1, 96.0, 98.0, 97.0),
            bar(2, 98.0, 100.0, 99.0),
            bar(3, 100.0, 102.0, 101.0),
            bar(4, 98.0, 100.0, 99.0),
            bar(5, 96.0, 98.0, 97.0),
            bar(6, 95.0, 97.0, 96.0),
        ];
        let s = BarSeries::new(bars).unwrap();
        let atr = flat_atr(s.len(), 2.0);
        let zones = detect_zones(&s, &atr, &ZoneParams::default());
        assert_eq!(zones.supply.len(), 1);
        let z = &zones.supply[0];
        assert_eq!(z.top, 102.0);
        assert!((z.bottom - 101.5).abs() < 1e-12);
        assert_eq!(z.kind, ZoneKind::Supply);
    }

    #[test]
    fn overlap_uses_full_bar_range() {
        let z = Zone {
            kind: ZoneKind::Demand,
            bottom: 98.0,
            top: 99.0,
            origin_timestamp: 0,
            freshness: Freshness::Fresh,
        };
        assert!(z.overlaps(&bar(0, 98.5, 101.0, 100.0)));
        assert!(!z.overlaps(&bar(0, 99.5, 101.0, 100.0)));
        assert!(z.contains(98.0));
        assert!(!z.contains(99.5));
    }
}
