// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators reported per
// watchlist symbol.  Window functions return one `Option<f64>` per input
// position; `None` marks positions with insufficient history and is never
// replaced by zero.

pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod extrema;
pub mod roc;
pub mod sma;

pub use engine::{compute_indicators, IndicatorRecord};

/// Value at the last position of a window series, if defined.
pub(crate) fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}
