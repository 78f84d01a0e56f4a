// =============================================================================
// Relative-Strength Ranking of the whole store
// =============================================================================

use serde::Serialize;
use tracing::info;

use super::by_strength_desc;
use crate::indicators::roc::RelativeStrength;
use crate::store::HistoricalStore;

#[derive(Debug, Clone, Serialize)]
pub struct RankedSymbol {
    pub symbol: String,
    pub rows: usize,
    pub strength: RelativeStrength,
}

/// Composite relative strength of every symbol in the store, strongest
/// first. Symbols without a defined score are left out. `top == 0` keeps all.
pub fn rank_store(store: &HistoricalStore, top: usize) -> Vec<RankedSymbol> {
    let mut ranked: Vec<RankedSymbol> = store
        .all_series()
        .into_iter()
        .map(|series| RankedSymbol {
            rows: series.len(),
            strength: RelativeStrength::from_closes(&series.closes()),
            symbol: series.symbol,
        })
        .filter(|r| r.strength.composite.is_some())
        .collect();

    ranked.sort_by(|a, b| by_strength_desc(a.strength.composite, b.strength.composite));
    if top > 0 {
        ranked.truncate(top);
    }

    info!(ranked = ranked.len(), "relative strength ranking complete");
    ranked
}
