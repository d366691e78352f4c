// =============================================================================
// On-Balance Volume (OBV) and its trailing slope
// =============================================================================
//
// OBV starts at 0 on the first bar and adds the bar's volume on an up close,
// subtracts it on a down close, and carries forward on a flat close.
//
// OBV_SLOPE is the least-squares slope of OBV over the trailing window,
// in volume units per bar.

use crate::market_data::Bar;

pub fn calculate_obv(bars: &[Bar]) -> Vec<f64> {
    let mut obv = Vec::with_capacity(bars.len());
    let mut running = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev_close = bars[i - 1].close;
            if bar.close > prev_close {
                running += bar.volume;
            } else if bar.close < prev_close {
                running -= bar.volume;
            }
        }
        obv.push(running);
    }
    obv
}

/// Rolling linear-regression slope over `window` points, aligned with
/// `values`.  The first `window - 1` entries are NaN.
pub fn rolling_slope(values: &[f64], window: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if window < 2 || values.len() < window {
        return result;
    }

    // x = 0..window, so mean(x) and Σ(x - x̄)² are constants.
    let n = window as f64;
    let x_mean = (n - 1.0) / 2.0;
    let sxx: f64 = (0..window).map(|x| (x as f64 - x_mean).powi(2)).sum();

    for end in window - 1..values.len() {
        let w = &values[end + 1 - window..=end];
        let y_mean = w.iter().sum::<f64>() / n;
        let sxy: f64 = w
            .iter()
            .enumerate()
            .map(|(x, y)| (x as f64 - x_mean) * (y - y_mean))
            .sum();
        result[end] = sxy / sxx;
    }
    result
}
