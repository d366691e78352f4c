// =============================================================================
// Relative Strength Index (RSI)
// =============================================================================
//
// Up-moves and down-moves between consecutive closes are Wilder-smoothed
// separately, then
//   RS  = avg_gain / avg_loss
//   RSI = 100 - 100 / (1 + RS)
//
// Index i carries the move into close i, so the first defined RSI sits at
// index `period`.
// =============================================================================

use super::wilder::wilder_smooth;

/// RSI aligned with `closes`; NaN until `period` moves have been seen.
///
/// A window with only gains reads 100, only losses 0, no movement 50.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        gains[i] = delta.max(0.0);
        losses[i] = (-delta).max(0.0);
    }

    let avg_gain = wilder_smooth(&gains, period);
    let avg_loss = wilder_smooth(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if !(avg_gain.is_finite() && avg_loss.is_finite()) {
        return f64::NAN;
    }
    match (avg_gain == 0.0, avg_loss == 0.0) {
        (true, true) => 50.0,
        (_, true) => 100.0,
        _ => 100.0 - 100.0 / (1.0 + avg_gain / avg_loss),
    }
}
