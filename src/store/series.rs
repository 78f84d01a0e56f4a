use crate::types::DailySnapshot;

/// One symbol's rows, strictly ascending by date.
#[derive(Debug, Clone)]
pub struct SymbolSeries {
    pub symbol: String,
    rows: Vec<DailySnapshot>,
}

impl SymbolSeries {
    /// Build a series from unordered rows of a single symbol. Rows must already
    /// be unique per date (the store guarantees it).
    pub fn new(symbol: impl Into<String>, mut rows: Vec<DailySnapshot>) -> Self {
        rows.sort_by_key(|r| r.timestamp);
        Self {
            symbol: symbol.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn latest(&self) -> Option<&DailySnapshot> {
        self.rows.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }
}
