// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   alpha  = 2 / (window + 1)
//   EMA_0  = price_0
//   EMA_t  = (price_t - EMA_{t-1}) * alpha + EMA_{t-1}
//
// The sequence is seeded with the first raw price, not with the SMA of the
// first `window` prices, so every input position has a value.  Reports built
// by earlier tooling depend on this seeding.
// =============================================================================

/// Compute the EMA series for `prices`, aligned 1:1 with the input.
///
/// Returns an empty `Vec` for empty input or a zero window.
pub fn calculate_ema(prices: &[f64], window: usize) -> Vec<f64> {
    let Some((&first, rest)) = prices.split_first() else {
        return Vec::new();
    };
    if window == 0 {
        return Vec::new();
    }

    let alpha = 2.0 / (window as f64 + 1.0);

    let mut result = Vec::with_capacity(prices.len());
    result.push(first);

    let mut prev = first;
    for &price in rest {
        let ema = (price - prev) * alpha + prev;
        result.push(ema);
        prev = ema;
    }

    result
}

/// Most recent EMA value, or `None` when there is nothing to average or the
/// result is not finite.
pub fn latest_ema(prices: &[f64], window: usize) -> Option<f64> {
    calculate_ema(prices, window)
        .last()
        .copied()
        .filter(|v| v.is_finite())
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
        assert_eq!(latest_ema(&[], 5), None);
    }

    #[test]
    fn ema_window_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn single_price_is_its_own_ema() {
        assert_eq!(calculate_ema(&[42.5], 10), vec![42.5]);
        assert_eq!(calculate_ema(&[42.5], 40), vec![42.5]);
    }

    #[test]
    fn seeded_with_first_raw_price() {
        // window 3 => alpha = 0.5
        let ema = calculate_ema(&[10.0, 20.0, 30.0, 40.0], 3);
        assert_eq!(ema.len(), 4);
        assert_eq!(ema[0], 10.0);
        assert!((ema[1] - 15.0).abs() < 1e-12);
        assert!((ema[2] - 22.5).abs() < 1e-12);
        assert!((ema[3] - 31.25).abs() < 1e-12);
    }

    #[test]
    fn output_is_aligned_with_input_even_when_shorter_than_window() {
        let prices: Vec<f64> = (1..=5).map(f64::from).collect();
        assert_eq!(calculate_ema(&prices, 40).len(), prices.len());
    }

    #[test]
    fn flat_series_stays_flat() {
        let ema = calculate_ema(&[100.0; 50], 10);
        assert!(ema.iter().all(|v| (v - 100.0).abs() < 1e-12));
    }
}
