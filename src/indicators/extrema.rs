// =============================================================================
// Rolling Extrema with Lag
// =============================================================================
//
// "One week ago 52-week high" style values: the rolling max/min over `window`
// positions, reported `lag` positions later.  A position is defined only once
// `window + lag` values exist up to and including it.

fn rolling(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            (i + 1 >= window).then(|| {
                values[i + 1 - window..=i]
                    .iter()
                    .copied()
                    .fold(values[i], pick)
            })
        })
        .collect()
}

/// Rolling maximum over the trailing `window` values.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, f64::max)
}

/// Rolling minimum over the trailing `window` values.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, f64::min)
}

/// Move every value `lag` positions later; the first `lag` positions become
/// `None`.
pub fn shift(series: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..series.len())
        .map(|i| if i >= lag { series[i - lag] } else { None })
        .collect()
}

pub fn lagged_max(values: &[f64], window: usize, lag: usize) -> Vec<Option<f64>> {
    shift(&rolling_max(values, window), lag)
}

pub fn lagged_min(values: &[f64], window: usize, lag: usize) -> Vec<Option<f64>> {
    shift(&rolling_min(values, window), lag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_extrema() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(
            rolling_max(&values, 3),
            vec![None, None, Some(4.0), Some(4.0), Some(5.0)]
        );
        assert_eq!(
            rolling_min(&values, 3),
            vec![None, None, Some(1.0), Some(1.0), Some(1.0)]
        );
    }

    #[test]
    fn lag_reports_stale_extremum() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        // window 2, lag 1: at position 5 report max(values[3..=4]) = 5
        let lagged = lagged_max(&values, 2, 1);
        assert_eq!(lagged[5], Some(5.0));
        // first defined position is window + lag - 1
        assert_eq!(lagged[1], None);
        assert_eq!(lagged[2], Some(2.0));
    }

    #[test]
    fn undefined_until_window_plus_lag() {
        let values: Vec<f64> = (0..266).map(f64::from).collect();
        let lagged = lagged_min(&values, 260, 7);
        assert!(lagged.iter().all(Option::is_none));

        let values: Vec<f64> = (0..267).map(f64::from).collect();
        let lagged = lagged_min(&values, 260, 7);
        assert_eq!(lagged.last().copied().flatten(), Some(0.0));
    }
}
