// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ).  σ is the population standard deviation of
// the same window.

use super::sma::calculate_sma;

/// Band series aligned with the input closes.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Calculate Bollinger Bands for the given closing prices.
///
/// Entries before index `period - 1` are NaN in all three bands.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = calculate_sma(closes, period);
    let mut upper = vec![f64::NAN; closes.len()];
    let mut lower = vec![f64::NAN; closes.len()];

    for (end, &mean) in middle.iter().enumerate() {
        if !mean.is_finite() {
            continue;
        }
        let window = &closes[end + 1 - period..=end];
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let std_dev = variance.sqrt();
        upper[end] = mean + num_std * std_dev;
        lower[end] = mean - num_std * std_dev;
    }

    BollingerBands { upper, middle, lower }
}
