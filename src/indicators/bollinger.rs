// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band
// (SMA + k_upper*σ) and a lower band (SMA - k_lower*σ), where σ is the
// sample standard deviation (n - 1) of the same window.
//
// The watchlist report uses k_upper = 2 and k_lower = 1.  The asymmetry is
// what the downstream report consumers expect; keep the two multipliers
// separate.

/// Result of a Bollinger Band calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Sample standard deviation of `window`; `None` for fewer than two values.
pub fn sample_std_dev(window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Calculate Bollinger Bands over the trailing `period` closes.
///
/// Returns `None` when:
/// - Fewer than `period` data points.
/// - `period < 2` (no sample deviation).
/// - Any band is non-finite.
pub fn calculate_bollinger(
    closes: &[f64],
    period: usize,
    upper_k: f64,
    lower_k: f64,
) -> Option<BollingerResult> {
    if period < 2 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let std_dev = sample_std_dev(window)?;

    let upper = middle + upper_k * std_dev;
    let lower = middle - lower_k * std_dev;

    (upper.is_finite() && lower.is_finite()).then_some(BollingerResult {
        upper,
        middle,
        lower,
    })
}
