// =============================================================================
// Level Aggregator
// =============================================================================
//
// Collects indicator levels (EMA20/50/200, Bollinger bounds) and zone edges
// on each side of the current price, drops far-away candidates, merges
// near-duplicates into confluence levels and keeps the closest few.
//
// Merge rule: walking outward from price, a candidate within `tolerance` of
// the last kept non-VIP level folds into it (label joined with " + ", price of
// the nearer level kept).  VIP candidates are never merged in either
// direction.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine_config::LevelParams;
use crate::indicators::{IndicatorName, IndicatorSeries};
use crate::types::Side;
use crate::zones::{Freshness, Zone, ZoneKind, ZoneSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub label: String,
    pub side: Side,
    /// Exempt from the minimum-spacing merge.
    pub vip: bool,
}

/// Supports descend toward price, resistances ascend toward price, so in
/// both lists index 0 is the nearest level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelBook {
    pub supports: Vec<Level>,
    pub resistances: Vec<Level>,
}

/// A raw price point before filtering and merging.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub price: f64,
    pub label: String,
}

impl Candidate {
    pub fn new(price: f64, label: impl Into<String>) -> Self {
        Self {
            price,
            label: label.into(),
        }
    }
}

const INDICATOR_LEVELS: [(IndicatorName, &str); 5] = [
    (IndicatorName::Ema20, "EMA20"),
    (IndicatorName::Ema50, "EMA50"),
    (IndicatorName::Ema200, "EMA200"),
    (IndicatorName::BbUpper, "BB Upper"),
    (IndicatorName::BbLower, "BB Lower"),
];

fn zone_label(zone: &Zone) -> String {
    let kind = match zone.kind {
        ZoneKind::Demand => "Demand Zone",
        ZoneKind::Supply => "Supply Zone",
    };
    match zone.freshness {
        Freshness::Fresh => format!("{kind} (fresh)"),
        Freshness::Tested => format!("{kind} (tested)"),
    }
}

/// Merge tolerance in price units: the larger of the percentage and ATR forms.
pub fn merge_tolerance(price: f64, atr: Option<f64>, params: &LevelParams) -> f64 {
    let pct = price * params.merge_tolerance_pct / 100.0;
    let by_atr = atr.map(|a| a * params.merge_tolerance_atr).unwrap_or(0.0);
    pct.max(by_atr)
}

/// Build both level lists for the last bar.
pub fn aggregate_levels(
    price: f64,
    indicators: &IndicatorSeries,
    zones: &ZoneSet,
    params: &LevelParams,
) -> LevelBook {
    let mut candidates: Vec<Candidate> = INDICATOR_LEVELS
        .iter()
        .filter_map(|(name, label)| indicators.last(*name).map(|v| Candidate::new(v, *label)))
        .collect();

    for zone in zones.demand.iter().chain(zones.supply.iter()) {
        let label = zone_label(zone);
        candidates.push(Candidate::new(zone.bottom, label.clone()));
        candidates.push(Candidate::new(zone.top, label));
    }

    let tolerance = merge_tolerance(price, indicators.last(IndicatorName::Atr14), params);

    let (below, above): (Vec<Candidate>, Vec<Candidate>) = candidates
        .into_iter()
        .filter(|c| c.price.is_finite() && c.price != price)
        .partition(|c| c.price < price);

    let book = LevelBook {
        supports: merge_side(price, Side::Support, below, tolerance, params),
        resistances: merge_side(price, Side::Resistance, above, tolerance, params),
    };

    debug!(
        supports = book.supports.len(),
        resistances = book.resistances.len(),
        tolerance,
        "levels aggregated"
    );
    book
}

/// Filter, merge and truncate the candidates of one side.
///
/// Candidates on the wrong side of `price` are ignored.
pub fn merge_side(
    price: f64,
    side: Side,
    mut candidates: Vec<Candidate>,
    tolerance: f64,
    params: &LevelParams,
) -> Vec<Level> {
    candidates.retain(|c| {
        let correct_side = match side {
            Side::Support => c.price < price,
            Side::Resistance => c.price > price,
        };
        correct_side && price > 0.0 && (c.price - price).abs() / price * 100.0 <= params.max_distance_pct
    });
    candidates.sort_by(|a, b| (a.price - price).abs().total_cmp(&(b.price - price).abs()));

    let mut levels: Vec<Level> = Vec::new();
    // Index into `levels` of the most recent non-VIP entry.
    let mut anchor: Option<usize> = None;

    for c in candidates {
        let vip = params.vip_labels.iter().any(|v| v == &c.label);
        if vip {
            levels.push(Level {
                price: c.price,
                label: c.label,
                side,
                vip: true,
            });
            continue;
        }

        if let Some(level) = anchor.and_then(|i| levels.get_mut(i)) {
            if (c.price - level.price).abs() < tolerance {
                if !level.label.split(" + ").any(|l| l == c.label) {
                    level.label = format!("{} + {}", level.label, c.label);
                }
                continue;
            }
        }

        levels.push(Level {
            price: c.price,
            label: c.label,
            side,
            vip: false,
        });
        anchor = Some(levels.len() - 1);
    }

    levels.truncate(params.max_levels);
    levels
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> LevelParams {
        LevelParams::default()
    }

    fn prices(levels: &[Level]) -> Vec<f64> {
        levels.iter().map(|l| l.price).collect()
    }

    // ---- merge_side ------------------------------------------------------

    #[test]
    fn supports_descend_and_resistances_ascend() {
        let below = vec![
            Candidate::new(90.0, "A"),
            Candidate::new(95.0, "B"),
            Candidate::new(80.0, "C"),
        ];
        let s = merge_side(100.0, Side::Support, below, 1.0, &params());
        assert_eq!(prices(&s), vec![95.0, 90.0, 80.0]);

        let above = vec![Candidate::new(120.0, "X"), Candidate::new(105.0, "Y")];
        let r = merge_side(100.0, Side::Resistance, above, 1.0, &params());
        assert_eq!(prices(&r), vec![105.0, 120.0]);
        assert!(r.iter().all(|l| l.side == Side::Resistance));
    }

    #[test]
    fn near_candidates_merge_into_confluence() {
        let below = vec![Candidate::new(95.0, "EMA20"), Candidate::new(94.5, "BB Lower")];
        let s = merge_side(100.0, Side::Support, below, 1.0, &params());
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].price, 95.0);
        assert_eq!(s[0].label, "EMA20 + BB Lower");
    }

    #[test]
    fn duplicate_labels_fold_once() {
        let below = vec![
            Candidate::new(95.0, "Demand Zone (fresh)"),
            Candidate::new(94.8, "Demand Zone (fresh)"),
        ];
        let s = merge_side(100.0, Side::Support, below, 1.0, &params());
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].label, "Demand Zone (fresh)");
    }

    #[test]
    fn vip_level_is_never_merged() {
        let below = vec![
            Candidate::new(95.0, "EMA50"),
            Candidate::new(94.8, "EMA200"),
            Candidate::new(94.6, "BB Lower"),
        ];
        let s = merge_side(100.0, Side::Support, below, 1.0, &params());
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].label, "EMA50 + BB Lower");
        assert_eq!(s[1].label, "EMA200");
        assert!(s[1].vip);
    }

    #[test]
    fn far_and_wrong_side_candidates_dropped() {
        let below = vec![
            Candidate::new(60.0, "EMA200"),
            Candidate::new(101.0, "EMA20"),
            Candidate::new(100.0, "EMA50"),
        ];
        let s = merge_side(100.0, Side::Support, below, 1.0, &params());
        assert!(s.is_empty());
    }

    #[test]
    fn truncates_to_max_levels() {
        let below: Vec<Candidate> = (1..=8).map(|k| Candidate::new(100.0 - 2.0 * k as f64, format!("L{k}"))).collect();
        let s = merge_side(100.0, Side::Support, below, 1.0, &params());
        assert_eq!(s.len(), 4);
        assert_eq!(s[0].label, "L1");
    }

    #[test]
    fn kept_non_vip_levels_respect_tolerance() {
        let below: Vec<Candidate> = (0..40)
            .map(|k| Candidate::new(99.0 - 0.3 * k as f64, format!("L{k}")))
            .collect();
        let p = LevelParams {
            max_levels: 100,
            ..params()
        };
        let s = merge_side(100.0, Side::Support, below, 1.0, &p);
        for pair in s.windows(2) {
            assert!((pair[0].price - pair[1].price).abs() >= 1.0);
        }
    }

    // ---- merge_tolerance -------------------------------------------------

    #[test]
    fn tolerance_takes_larger_form() {
        let p = LevelParams {
            merge_tolerance_atr: 0.5,
            ..params()
        };
        assert_eq!(merge_tolerance(100.0, Some(4.0), &p), 2.0);
        assert_eq!(merge_tolerance(100.0, Some(1.0), &p), 1.0);
        assert_eq!(merge_tolerance(100.0, None, &params()), 1.0);
    }
}
