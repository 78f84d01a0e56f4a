// =============================================================================
// Rate of Change (ROCR) — Momentum Indicator and Relative-Strength Composite
// =============================================================================
//
// ROCR is the ratio form of rate of change over a look-back period:
//   ROCR_N = close_t / close_{t-N}
//
// The relative-strength composite blends four quarterly look-backs, with the
// most recent quarter counted twice:
//   RS = (ROCR_63 * 2 + ROCR_126 + ROCR_189 + ROCR_252) / 5
//
// Without the 63-day term there is no composite.  A longer term that lacks
// history is left out and the remaining weights are renormalised.

use serde::Serialize;

/// Look-back periods (trading days) and weights of the composite.
pub const RS_TERMS: [(usize, f64); 4] = [(63, 2.0), (126, 1.0), (189, 1.0), (252, 1.0)];

/// Most recent ROCR value.
pub fn latest_rocr(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let base = closes[closes.len() - 1 - period];
    if base == 0.0 {
        return None;
    }
    Some(closes[closes.len() - 1] / base).filter(|v| v.is_finite())
}

/// Individual terms of the composite, for diagnostics and ranking output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelativeStrength {
    pub rocr_63: Option<f64>,
    pub rocr_126: Option<f64>,
    pub rocr_189: Option<f64>,
    pub rocr_252: Option<f64>,
    pub composite: Option<f64>,
}

impl RelativeStrength {
    pub fn from_closes(closes: &[f64]) -> Self {
        let terms = RS_TERMS.map(|(period, _)| latest_rocr(closes, period));
        Self {
            rocr_63: terms[0],
            rocr_126: terms[1],
            rocr_189: terms[2],
            rocr_252: terms[3],
            composite: composite(&terms),
        }
    }
}

fn composite(terms: &[Option<f64>; 4]) -> Option<f64> {
    terms[0]?;
    let (sum, weight) = terms
        .iter()
        .zip(RS_TERMS)
        .filter_map(|(term, (_, w))| term.map(|r| (r * w, w)))
        .fold((0.0, 0.0), |(s, tw), (v, w)| (s + v, tw + w));
    Some(sum / weight)
}

/// Composite relative-strength score of the latest close.
pub fn relative_strength(closes: &[f64]) -> Option<f64> {
    RelativeStrength::from_closes(closes).composite
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rocr_basic() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(latest_rocr(&closes[..14], 14), None);
        // 15 / 1
        assert_eq!(latest_rocr(&closes[..15], 14), Some(15.0));
        assert_eq!(latest_rocr(&closes, 14), Some(20.0 / 6.0));
        assert_eq!(latest_rocr(&closes, 0), None);
    }

    #[test]
    fn rocr_needs_period_plus_one_points() {
        let closes = vec![1.0; 63];
        assert_eq!(latest_rocr(&closes, 63), None);
        let closes = vec![1.0; 64];
        assert_eq!(latest_rocr(&closes, 63), Some(1.0));
    }

    #[test]
    fn constant_series_of_252_scores_exactly_one() {
        let closes = vec![250.0; 252];
        let rs = RelativeStrength::from_closes(&closes);
        assert_eq!(rs.rocr_252, None);
        assert_eq!(rs.composite, Some(1.0));
    }

    #[test]
    fn full_history_uses_documented_weights() {
        // Price doubles every 63 days going back: ratios 2, 4, 8, 16.
        let mut closes = vec![0.0; 253];
        for (i, c) in closes.iter_mut().enumerate() {
            *c = match i {
                0 => 1.0,
                63 => 2.0,
                126 => 4.0,
                189 => 8.0,
                _ => 1.0,
            };
        }
        closes[252] = 16.0;
        let rs = RelativeStrength::from_closes(&closes);
        assert_eq!(rs.rocr_63, Some(2.0));
        assert_eq!(rs.rocr_126, Some(4.0));
        assert_eq!(rs.rocr_189, Some(8.0));
        assert_eq!(rs.rocr_252, Some(16.0));
        assert_eq!(rs.composite, Some((2.0 * 2.0 + 4.0 + 8.0 + 16.0) / 5.0));
    }

    #[test]
    fn missing_primary_term_leaves_composite_undefined() {
        assert_eq!(relative_strength(&[100.0; 63]), None);
        assert_eq!(relative_strength(&[]), None);
    }
}
