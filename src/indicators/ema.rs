// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The recursion is seeded with the first available value and runs from there.
// Outputs before `period` values have been consumed are NaN: the recursion
// has not yet forgotten its seed, so they are not trustworthy.
// =============================================================================

/// Compute the EMA series for `values`, aligned index-for-index with the input.
///
/// Leading NaNs in `values` are skipped (this is how EMA-of-MACD is seeded);
/// the first finite value seeds the recursion.
///
/// # Edge cases
/// - `period == 0` => all NaN
/// - fewer than `period` finite values => all NaN
/// - a NaN after the seed poisons the rest of the series
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 {
        return result;
    }

    let Some(start) = values.iter().position(|v| v.is_finite()) else {
        return result;
    };
    let first_defined = start + period - 1;
    if first_defined >= values.len() {
        return result;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);

    let mut prev_ema = values[start];
    if start >= first_defined {
        result[start] = prev_ema;
    }
    for i in start + 1..values.len() {
        let ema = values[i] * multiplier + prev_ema * (1.0 - multiplier);
        if !ema.is_finite() {
            // Leave the remainder NaN: downstream must not trust a broken series.
            break;
        }
        if i >= first_defined {
            result[i] = ema;
        }
        prev_ema = ema;
    }

    result
}
