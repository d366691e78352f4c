// =============================================================================
// Average True Range (ATR)
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the rolling mean of the last `period` TR values.  The first bar has
// no previous close, so TR starts at index 1 and ATR at index `period`.
// =============================================================================

use crate::market_data::Bar;

/// True Range per bar, aligned with `bars`; index 0 is NaN.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let high = bars[i].high;
        let low = bars[i].low;
        let prev_close = bars[i - 1].close;

        let hl = high - low;
        let hc = (high - prev_close).abs();
        let lc = (low - prev_close).abs();
        tr[i] = hl.max(hc).max(lc);
    }
    tr
}

/// ATR series aligned with `bars`.
///
/// Entries before index `period` are NaN (fewer than `period` TR values).
pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; bars.len()];
    if period == 0 || bars.len() < period + 1 {
        return result;
    }

    let tr = true_range(bars);
    let mut sum: f64 = tr[1..=period].iter().sum();
    result[period] = sum / period as f64;

    for i in period + 1..bars.len() {
        sum += tr[i] - tr[i - period];
        result[i] = sum / period as f64;
    }
    result
}
