// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================

/// Mean of the last `window` values, or `None` with fewer than `window`.
pub fn latest_sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let slice = &values[values.len() - window..];
    Some(slice.iter().sum::<f64>() / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorter_than_window_is_undefined() {
        assert_eq!(latest_sma(&[1.0, 2.0, 3.0], 5), None);
        assert_eq!(latest_sma(&[1.0, 2.0, 3.0], 0), None);
    }

    #[test]
    fn length_equal_to_window_is_defined() {
        assert_eq!(latest_sma(&[2.0, 4.0, 6.0, 8.0], 4), Some(5.0));
    }

    #[test]
    fn only_the_trailing_window_counts() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(latest_sma(&values, 3), Some(4.0));
        assert_eq!(latest_sma(&values[..4], 3), Some(3.0));
    }
}
