// =============================================================================
// Report Module
// =============================================================================
//
// Joins a watchlist against the historical store, runs the indicator engine
// per symbol and writes the rows ranked by relative strength.

pub mod builder;
pub mod rank;
pub mod watchlist;

pub use builder::{build_report, write_report};
pub use rank::rank_store;
pub use watchlist::Watchlist;

use std::cmp::Ordering;

/// Descending by score, undefined scores last.
pub(crate) fn by_strength_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
