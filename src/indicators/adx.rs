// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// Trend strength regardless of direction.
//
//   +DM / -DM   directional movement into each bar (only the larger side counts)
//   +DI / -DI   Wilder-smoothed DM over Wilder-smoothed true range, x100
//   DX          |+DI - -DI| / (+DI + -DI) x100
//   ADX         Wilder-smoothed DX
//
// DX is first defined at index `period`, ADX at `2 * period - 1`.
// =============================================================================

use super::atr::true_range;
use super::wilder::wilder_smooth;
use crate::market_data::Bar;

/// ADX aligned with `bars`; NaN until `2 * period` bars are available.
pub fn calculate_adx(bars: &[Bar], period: usize) -> Vec<f64> {
    let n = bars.len();
    if period == 0 || n < 2 * period {
        return vec![f64::NAN; n];
    }

    let (plus_dm, minus_dm) = directional_movement(bars);
    let tr = wilder_smooth(&true_range(bars), period);
    let plus = wilder_smooth(&plus_dm, period);
    let minus = wilder_smooth(&minus_dm, period);

    let dx: Vec<f64> = (0..n)
        .map(|i| {
            if tr[i].is_finite() && plus[i].is_finite() && minus[i].is_finite() {
                compute_dx(plus[i], minus[i], tr[i])
            } else {
                f64::NAN
            }
        })
        .collect();

    wilder_smooth(&dx, period)
}

/// +DM and -DM per bar; index 0 has no prior bar and is NaN.
fn directional_movement(bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
    let mut plus = vec![f64::NAN; bars.len()];
    let mut minus = vec![f64::NAN; bars.len()];
    for (i, w) in bars.windows(2).enumerate() {
        let up = w[1].high - w[0].high;
        let down = w[0].low - w[1].low;
        plus[i + 1] = if up > down && up > 0.0 { up } else { 0.0 };
        minus[i + 1] = if down > up && down > 0.0 { down } else { 0.0 };
    }
    (plus, minus)
}

/// A window without range or direction carries no trend: DX is 0.
fn compute_dx(plus_dm: f64, minus_dm: f64, tr: f64) -> f64 {
    if tr == 0.0 {
        return 0.0;
    }
    let plus_di = plus_dm / tr * 100.0;
    let minus_di = minus_dm / tr * 100.0;
    let sum = plus_di + minus_di;
    if sum == 0.0 {
        0.0
    } else {
        (plus_di - minus_di).abs() / sum * 100.0
    }
}

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
            volume: 1.0,
        }
    }

    fn trending(n: usize, step: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * step;
                bar(base, base + 1.5, base - 0.5, base + 1.0)
            })
            .collect()
    }

    #[test]
    fn undefined_without_enough_bars() {
        let bars = vec![bar(1.0, 2.0, 0.5, 1.5); 27];
        assert!(calculate_adx(&bars, 14).iter().all(|v| v.is_nan()));
        assert!(calculate_adx(&bars, 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn first_defined_at_two_periods_minus_one() {
        let adx = calculate_adx(&trending(10, 1.0), 5);
        assert!(adx[8].is_nan());
        assert!(adx[9].is_finite());
    }

    #[test]
    fn strong_trend_reads_high() {
        let adx = calculate_adx(&trending(60, 2.0), 14);
        assert!(adx[59] > 25.0, "ADX {}", adx[59]);
    }

    #[test]
    fn flat_market_reads_zero() {
        let adx = calculate_adx(&vec![bar(100.0, 101.0, 99.0, 100.0); 60], 14);
        assert!(adx[59].abs() < 1e-12);
    }

    #[test]
    fn oscillation_stays_in_range() {
        let bars: Vec<Bar> = (0..100)
            .map(|i| {
                let base = 50.0 + (i as f64 * 0.3).sin() * 10.0;
                bar(base - 0.5, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        for &v in calculate_adx(&bars, 14).iter().filter(|v| v.is_finite()) {
            assert!((0.0..=100.0).contains(&v), "ADX {v}");
        }
    }
}
