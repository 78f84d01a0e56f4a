// =============================================================================
// Pipeline error taxonomy
// =============================================================================
//
// Per-item failures (a missing day, a broken file, an unknown symbol) are
// caught at the day/symbol boundary and logged. Only a broken store key space
// stops a run.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::format_bhav_date;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The snapshot for a date could not be fetched or extracted.
    #[error("snapshot for {} unavailable: {reason}", day(.date))]
    SourceUnavailable { date: NaiveDate, reason: String },

    /// A raw snapshot is missing an expected column or cannot be read.
    #[error("malformed snapshot '{source_name}': {reason}")]
    MalformedSnapshot { source_name: String, reason: String },

    /// A watchlist symbol has no rows in the store.
    #[error("symbol '{0}' not found in store")]
    SymbolNotFound(String),

    /// More than one row exists for a (symbol, date) pair.
    #[error("store corruption: duplicate row for {symbol} on {}", day(.date))]
    StoreCorruption { symbol: String, date: NaiveDate },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn day(date: &NaiveDate) -> String {
    format_bhav_date(*date)
}

impl PipelineError {
    /// Whether this error must abort the whole run rather than skip one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreCorruption { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_corruption_is_fatal() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let corrupt = PipelineError::StoreCorruption {
            symbol: "INFY".into(),
            date,
        };
        assert!(corrupt.is_fatal());
        assert!(corrupt.to_string().contains("04-JAN-2024"));

        let missing = PipelineError::SourceUnavailable {
            date,
            reason: "404".into(),
        };
        assert!(!missing.is_fatal());
        assert!(!PipelineError::SymbolNotFound("TCS".into()).is_fatal());
    }
}
