pub mod historical;
pub mod series;

pub use historical::{retention_cutoff, AppendOutcome, HistoricalStore};
pub use series::SymbolSeries;
