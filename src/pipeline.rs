// =============================================================================
// Ingest Pipeline — fetch → normalize → merge, one day at a time
// =============================================================================
//
// Days are processed strictly in sequence.  A day that cannot be fetched or
// normalized is logged and skipped so a multi-day backfill survives holidays,
// weekends and archive hiccups.  Only store corruption stops the loop.
// =============================================================================

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bhavcopy::{Normalizer, SnapshotSource};
use crate::error::PipelineError;
use crate::store::{AppendOutcome, HistoricalStore};

/// Fetch, normalize and merge a single day.
pub async fn ingest_day<S: SnapshotSource>(
    store: &mut HistoricalStore,
    source: &S,
    normalizer: &Normalizer,
    date: NaiveDate,
) -> Result<AppendOutcome, PipelineError> {
    let raw = source.fetch(date).await?;
    let day = normalizer.normalize(&raw)?;

    if day.skipped_rows > 0 {
        warn!(
            date = %date,
            source = %raw.source_name,
            skipped_rows = day.skipped_rows,
            "rows with unparseable prices skipped"
        );
    }
    if !day.dropped_columns.is_empty() {
        debug!(date = %date, dropped = ?day.dropped_columns, "columns not carried into the store");
    }
    if day.rows.is_empty() {
        warn!(date = %date, source = %raw.source_name, "no matching rows in snapshot");
        return Ok(AppendOutcome::default());
    }

    let outcome = store.append(&day.rows)?;
    if outcome.already_merged() {
        info!(date = %date, rows = outcome.duplicates, "day already in store, skipping");
    } else {
        info!(
            date = %date,
            appended = outcome.appended,
            duplicates = outcome.duplicates,
            "day merged into store"
        );
    }
    Ok(outcome)
}

/// Knobs for [`backfill`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillOptions {
    pub skip_weekends: bool,
    /// Fetch dates the store already has rows for.
    pub force: bool,
}

impl BackfillOptions {
    /// One explicitly requested day: always attempted, weekday or not.
    pub fn single_day() -> Self {
        Self {
            skip_weekends: false,
            force: true,
        }
    }
}

/// Tally of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    /// Days whose rows were merged.
    pub merged: usize,
    /// Days already present in the store.
    pub already_present: usize,
    /// Days that failed and were skipped.
    pub skipped: usize,
    /// Days whose file had no row of the instrument class.
    pub empty: usize,
    /// Weekend days not attempted.
    pub weekends: usize,
    pub rows_appended: usize,
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Merge every day from `from` to `to` inclusive, then check the store for
/// duplicate keys.
///
/// Per-day failures are logged and counted; the error is returned only for
/// store corruption.
pub async fn backfill<S: SnapshotSource>(
    store: &mut HistoricalStore,
    source: &S,
    normalizer: &Normalizer,
    from: NaiveDate,
    to: NaiveDate,
    options: BackfillOptions,
) -> Result<BackfillSummary, PipelineError> {
    let mut summary = BackfillSummary::default();
    info!(from = %from, to = %to, "backfill starting");

    for date in from.iter_days().take_while(|d| *d <= to) {
        if options.skip_weekends && is_weekend(date) {
            summary.weekends += 1;
            continue;
        }
        if !options.force && store.contains_date(date) {
            debug!(date = %date, "already in store");
            summary.already_present += 1;
            continue;
        }

        match ingest_day(store, source, normalizer, date).await {
            Ok(outcome) if outcome.already_merged() => summary.already_present += 1,
            Ok(outcome) if outcome.is_empty() => summary.empty += 1,
            Ok(outcome) => {
                summary.merged += 1;
                summary.rows_appended += outcome.appended;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(date = %date, error = %e, "day skipped");
                summary.skipped += 1;
            }
        }
    }

    info!(
        merged = summary.merged,
        already_present = summary.already_present,
        skipped = summary.skipped,
        empty = summary.empty,
        rows = summary.rows_appended,
        "backfill complete"
    );
    store.verify()?;
    Ok(summary)
}
