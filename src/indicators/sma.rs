// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Plain rolling mean over the trailing `period` values.  Used directly for the
// 20-bar volume average and as the middle Bollinger band.

/// Rolling mean aligned with `values`; the first `period - 1` entries are NaN.
///
/// Any NaN inside a window makes that window's mean NaN.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    for end in period - 1..values.len() {
        let window = &values[end + 1 - period..=end];
        result[end] = window.iter().sum::<f64>() / period as f64;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_known_values() {
        let sma = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(sma[0].is_nan() && sma[1].is_nan());
        assert!((sma[2] - 2.0).abs() < 1e-12);
        assert!((sma[3] - 3.0).abs() < 1e-12);
        assert!((sma[4] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn sma_insufficient_data() {
        assert!(calculate_sma(&[1.0, 2.0], 20).iter().all(|v| v.is_nan()));
        assert!(calculate_sma(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }
}
