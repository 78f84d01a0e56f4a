// =============================================================================
// Watchlist Report Builder
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use tracing::{debug, info, warn};

use super::{by_strength_desc, Watchlist};
use crate::error::PipelineError;
use crate::indicators::engine::REPORT_HEADER;
use crate::indicators::{compute_indicators, IndicatorRecord};
use crate::store::HistoricalStore;

/// Ranked indicator rows plus the watchlist entries that had no data.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub records: Vec<IndicatorRecord>,
    pub missing: Vec<String>,
}

/// Build the report for every watchlist symbol present in `store`, sorted by
/// relative strength descending (stable, undefined scores last).
pub fn build_report(store: &HistoricalStore, watchlist: &Watchlist) -> Report {
    let mut report = Report::default();

    for symbol in watchlist.symbols() {
        let Some(series) = store.series(symbol) else {
            let err = PipelineError::SymbolNotFound(symbol.clone());
            warn!(symbol = %symbol, error = %err, "watchlist symbol skipped");
            report.missing.push(symbol.clone());
            continue;
        };

        match compute_indicators(&series) {
            Some(record) if record.has_any_indicator() => report.records.push(record),
            _ => debug!(symbol = %symbol, "no indicator defined, row dropped"),
        }
    }

    report
        .records
        .sort_by(|a, b| by_strength_desc(a.relative_strength, b.relative_strength));

    info!(
        symbols = watchlist.len(),
        rows = report.records.len(),
        missing = report.missing.len(),
        "watchlist report built"
    );
    report
}

/// Write `records` as CSV with the fixed report header.
pub fn write_report(path: impl AsRef<Path>, records: &[IndicatorRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create report {}", path.display()))?;

    writer.write_record(REPORT_HEADER)?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("failed to write report row for {}", record.symbol))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = records.len(), "report written");
    Ok(())
}
