// =============================================================================
// Wilder's smoothing
// =============================================================================
//
// Shared by RSI and ADX:
//   seed = simple mean of the first `period` defined inputs
//   avg  = (avg * (period - 1) + x) / period
//
// Equivalent to an EMA with alpha = 1 / period.
// =============================================================================

/// Wilder-smoothed series aligned with `values`.
///
/// Leading NaNs are skipped; the first output sits at
/// `first_defined_input + period - 1`.  A non-finite value after the seed
/// leaves the rest undefined.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(|v| v.is_finite()) else {
        return out;
    };
    let seed_end = start + period;
    if seed_end > values.len() {
        return out;
    }

    let p = period as f64;
    let mut avg = values[start..seed_end].iter().sum::<f64>() / p;
    if !avg.is_finite() {
        return out;
    }
    out[seed_end - 1] = avg;

    for (i, &x) in values.iter().enumerate().skip(seed_end) {
        avg = (avg * (p - 1.0) + x) / p;
        if !avg.is_finite() {
            break;
        }
        out[i] = avg;
    }
    out
}
