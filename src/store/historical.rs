// =============================================================================
// Historical Store — deduplicated, append-only Bhavcopy database
// =============================================================================
//
// The store is a single CSV file (header written once) plus an in-memory
// index keyed by (symbol, date).  New days are appended to the file without
// touching existing rows; only retention pruning and compaction rewrite it,
// and they do so atomically (tmp + rename).
//
// Invariant: at most one row per (symbol, date).  Anything that would break
// it is reported as `StoreCorruption` and stops the run.
// =============================================================================

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use csv::WriterBuilder;
use tracing::{debug, info, warn};

use super::series::SymbolSeries;
use crate::error::PipelineError;
use crate::types::{DailySnapshot, SnapshotKey, STORE_HEADER};

/// What a single `append` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Rows written to the store.
    pub appended: usize,
    /// Rows skipped because their (symbol, date) was already present.
    pub duplicates: usize,
    /// Duplicates whose prices differ from the stored row (the stored row wins).
    pub conflicts: usize,
}

impl AppendOutcome {
    /// The whole batch was already in the store.
    pub fn already_merged(&self) -> bool {
        self.appended == 0 && self.duplicates > 0
    }

    /// The batch held no rows at all.
    pub fn is_empty(&self) -> bool {
        self.appended == 0 && self.duplicates == 0
    }
}

/// What a retention pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub removed: usize,
    pub retained: usize,
}

/// First date kept by a retention window of `days` ending at `today`, or
/// `None` when the window reaches past the calendar.
pub fn retention_cutoff(today: NaiveDate, days: u32) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(u64::from(days)))
}

pub struct HistoricalStore {
    path: PathBuf,
    rows: Vec<DailySnapshot>,
    /// (symbol, date) -> position in `rows`.
    index: HashMap<SnapshotKey, usize>,
    /// Row count per trading date.
    dates: BTreeMap<NaiveDate, usize>,
    /// File columns are exactly `STORE_HEADER`, so rows can be appended.
    canonical_layout: bool,
}

impl HistoricalStore {
    /// Empty store bound to `path`; nothing is written until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Vec::new(),
            index: HashMap::new(),
            dates: BTreeMap::new(),
            canonical_layout: true,
        }
    }

    /// Load the store at `path`. A missing file is an empty store; a duplicate
    /// (symbol, date) in the file is `StoreCorruption`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let (store, dropped) = Self::read(path.as_ref(), false)?;
        debug_assert_eq!(dropped, 0);
        Ok(store)
    }

    /// Load the store, dropping duplicate keys (first occurrence wins).
    /// Returns the store and how many rows were dropped; call [`compact`]
    /// to persist the cleanup.
    ///
    /// [`compact`]: HistoricalStore::compact
    pub fn load_lenient(path: impl AsRef<Path>) -> Result<(Self, usize), PipelineError> {
        Self::read(path.as_ref(), true)
    }

    fn read(path: &Path, lenient: bool) -> Result<(Self, usize), PipelineError> {
        let mut store = Self::new(path);
        if !path.exists() {
            info!(path = %path.display(), "no store file yet, starting empty");
            return Ok((store, 0));
        }

        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let headers = reader.headers()?.clone();
        store.canonical_layout = headers.is_empty() || headers.iter().eq(STORE_HEADER);
        if !store.canonical_layout {
            warn!(
                path = %path.display(),
                header = ?headers,
                "store columns differ from the canonical layout, next write rewrites the file"
            );
        }
        let mut dropped = 0usize;

        for row in reader.deserialize::<DailySnapshot>() {
            let row = row?;
            let key = row.key();
            if store.index.contains_key(&key) {
                if lenient {
                    dropped += 1;
                    continue;
                }
                return Err(PipelineError::StoreCorruption {
                    symbol: key.symbol,
                    date: key.date,
                });
            }
            store.insert(key, row);
        }

        if dropped > 0 {
            warn!(path = %path.display(), dropped, "duplicate rows dropped while loading store");
        }
        info!(
            path = %path.display(),
            rows = store.rows.len(),
            dates = store.dates.len(),
            "store loaded"
        );
        Ok((store, dropped))
    }

    fn insert(&mut self, key: SnapshotKey, row: DailySnapshot) {
        *self.dates.entry(row.timestamp).or_insert(0) += 1;
        self.index.insert(key, self.rows.len());
        self.rows.push(row);
    }

    fn rebuild_index(&mut self) {
        let rows = std::mem::take(&mut self.rows);
        self.index.clear();
        self.dates.clear();
        for row in rows {
            self.insert(row.key(), row);
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Merge a normalized batch. Only (symbol, date) pairs not yet present are
    /// appended to the file; merging the same batch twice writes nothing the
    /// second time.
    pub fn append(&mut self, batch: &[DailySnapshot]) -> Result<AppendOutcome, PipelineError> {
        let mut outcome = AppendOutcome::default();
        let mut batch_keys: HashSet<SnapshotKey> = HashSet::with_capacity(batch.len());
        let mut fresh: Vec<&DailySnapshot> = Vec::with_capacity(batch.len());

        for row in batch {
            let key = row.key();
            if let Some(&pos) = self.index.get(&key) {
                outcome.duplicates += 1;
                if self.rows[pos] != *row {
                    outcome.conflicts += 1;
                    debug!(key = %key, "incoming row differs from stored row, keeping stored");
                }
                continue;
            }
            if !batch_keys.insert(key) {
                outcome.duplicates += 1;
                continue;
            }
            fresh.push(row);
        }

        if fresh.is_empty() {
            return Ok(outcome);
        }

        if self.canonical_layout {
            self.write_rows(&fresh)?;
            for row in fresh {
                self.insert(row.key(), row.clone());
            }
        } else {
            for row in fresh {
                self.insert(row.key(), row.clone());
            }
            self.rewrite()?;
        }
        outcome.appended = batch_keys.len();

        if self.index.len() != self.rows.len() {
            return Err(self.find_duplicate());
        }

        if outcome.conflicts > 0 {
            warn!(conflicts = outcome.conflicts, "conflicting duplicate rows ignored");
        }
        Ok(outcome)
    }

    /// Append rows to the file, writing the header only for a new/empty file.
    fn write_rows(&self, rows: &[&DailySnapshot]) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let needs_header = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        let mut writer = WriterBuilder::new().has_headers(needs_header).from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Drop every row dated before `before` and rewrite the file.
    pub fn prune(&mut self, before: NaiveDate) -> Result<PruneOutcome, PipelineError> {
        let total = self.rows.len();
        self.rows.retain(|r| r.timestamp >= before);
        let retained = self.rows.len();
        let outcome = PruneOutcome {
            removed: total - retained,
            retained,
        };

        if outcome.removed > 0 {
            self.rebuild_index();
            self.rewrite()?;
        }

        info!(
            before = %before,
            removed = outcome.removed,
            retained = outcome.retained,
            "retention prune complete"
        );
        Ok(outcome)
    }

    /// Rewrite the file from memory, e.g. after [`load_lenient`] dropped
    /// duplicates.
    ///
    /// [`load_lenient`]: HistoricalStore::load_lenient
    pub fn compact(&mut self) -> Result<(), PipelineError> {
        self.rewrite()
    }

    fn rewrite(&mut self) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = WriterBuilder::new().has_headers(true).from_path(&tmp_path)?;
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        self.canonical_layout = true;
        debug!(path = %self.path.display(), rows = self.rows.len(), "store rewritten (atomic)");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invariant
    // -------------------------------------------------------------------------

    /// Full scan for duplicate keys.
    pub fn verify(&self) -> Result<(), PipelineError> {
        let mut seen = HashSet::with_capacity(self.rows.len());
        for row in &self.rows {
            if !seen.insert(row.key()) {
                return Err(PipelineError::StoreCorruption {
                    symbol: row.symbol.clone(),
                    date: row.timestamp,
                });
            }
        }
        Ok(())
    }

    fn find_duplicate(&self) -> PipelineError {
        match self.verify() {
            Err(e) => e,
            // Index out of step with rows without a visible duplicate.
            Ok(()) => PipelineError::StoreCorruption {
                symbol: String::new(),
                date: self.latest_date().unwrap_or_default(),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// False when the file was written with other columns and needs a rewrite.
    pub fn has_canonical_layout(&self) -> bool {
        self.canonical_layout
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.dates.contains_key(&date)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.keys().next_back().copied()
    }

    /// Rows of one symbol in ascending date order, or `None` if the symbol
    /// has no rows.
    pub fn series(&self, symbol: &str) -> Option<SymbolSeries> {
        let rows: Vec<DailySnapshot> = self
            .rows
            .iter()
            .filter(|r| r.symbol == symbol)
            .cloned()
            .collect();
        if rows.is_empty() {
            None
        } else {
            Some(SymbolSeries::new(symbol, rows))
        }
    }

    /// Every symbol's series in one pass, in first-seen symbol order.
    pub fn all_series(&self) -> Vec<SymbolSeries> {
        let mut order: Vec<&str> = Vec::new();
        let mut grouped: HashMap<&str, Vec<DailySnapshot>> = HashMap::new();
        for row in &self.rows {
            grouped
                .entry(row.symbol.as_str())
                .or_insert_with(|| {
                    order.push(row.symbol.as_str());
                    Vec::new()
                })
                .push(row.clone());
        }
        order
            .into_iter()
            .filter_map(|sym| grouped.remove(sym).map(|rows| SymbolSeries::new(sym, rows)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{date, snapshot};
    use chrono::{Duration, Months};

    fn store_in(dir: &tempfile::TempDir) -> HistoricalStore {
        HistoricalStore::new(dir.path().join("BhavDB.csv"))
    }

    #[test]
    fn merging_same_day_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let day = vec![
            snapshot("INFY", date(2024, 1, 4), 1510.0),
            snapshot("TCS", date(2024, 1, 4), 3740.0),
        ];

        let first = store.append(&day).unwrap();
        assert_eq!(first.appended, 2);
        assert!(!first.already_merged());

        let second = store.append(&day).unwrap();
        assert_eq!(second.appended, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(second.conflicts, 0);
        assert!(second.already_merged());
        assert_eq!(store.len(), 2);

        let reloaded = HistoricalStore::load(store.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.series("INFY").unwrap().closes(), vec![1510.0]);
    }

    #[test]
    fn duplicate_inside_one_batch_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let d = date(2024, 1, 4);
        let outcome = store
            .append(&[snapshot("INFY", d, 1.0), snapshot("INFY", d, 2.0)])
            .unwrap();
        assert_eq!(outcome.appended, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(store.series("INFY").unwrap().closes(), vec![1.0]);
    }

    #[test]
    fn conflicting_duplicate_keeps_stored_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let d = date(2024, 1, 4);
        store.append(&[snapshot("INFY", d, 100.0)]).unwrap();
        let outcome = store.append(&[snapshot("INFY", d, 999.0)]).unwrap();
        assert_eq!(outcome.conflicts, 1);
        assert_eq!(store.series("INFY").unwrap().closes(), vec![100.0]);
    }

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.append(&[snapshot("INFY", date(2024, 1, 4), 1.0)]).unwrap();
        store.append(&[snapshot("INFY", date(2024, 1, 5), 2.0)]).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("SYMBOL")).count(), 1);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("05-JAN-2024"));
    }

    #[test]
    fn series_is_strictly_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        for d in [5, 3, 9, 4] {
            store.append(&[snapshot("SBIN", date(2024, 1, d), f64::from(d))]).unwrap();
        }
        store.append(&[snapshot("INFY", date(2024, 1, 1), 1.0)]).unwrap();

        let series = store.series("SBIN").unwrap();
        assert_eq!(series.closes(), vec![3.0, 4.0, 5.0, 9.0]);
        assert_eq!(series.latest().unwrap().timestamp, date(2024, 1, 9));
        assert!(store.series("WIPRO").is_none());
        assert_eq!(store.latest_date(), Some(date(2024, 1, 9)));
    }

    #[test]
    fn all_series_groups_every_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store
            .append(&[
                snapshot("A", date(2024, 1, 2), 2.0),
                snapshot("B", date(2024, 1, 2), 20.0),
            ])
            .unwrap();
        store.append(&[snapshot("A", date(2024, 1, 1), 1.0)]).unwrap();

        let all = store.all_series();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].symbol, "A");
        assert_eq!(all[0].closes(), vec![1.0, 2.0]);
        assert_eq!(all[1].closes(), vec![20.0]);
    }

    #[test]
    fn prune_honours_two_year_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let today = date(2024, 6, 15);
        let two_years_ago = today.checked_sub_months(Months::new(24)).unwrap();
        let too_old = two_years_ago - Duration::days(1);
        let just_inside = two_years_ago + Duration::days(1);

        store
            .append(&[
                snapshot("INFY", too_old, 1.0),
                snapshot("INFY", just_inside, 2.0),
                snapshot("INFY", today, 3.0),
            ])
            .unwrap();

        let outcome = store.prune(retention_cutoff(today, 730).unwrap()).unwrap();
        assert_eq!(outcome, PruneOutcome { removed: 1, retained: 2 });
        assert!(!store.contains_date(too_old));
        assert!(store.contains_date(just_inside));

        let reloaded = HistoricalStore::load(store.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn load_rejects_duplicates_and_lenient_load_compacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BhavDB.csv");
        {
            let mut writer = WriterBuilder::new().from_path(&path).unwrap();
            let d = date(2024, 1, 4);
            writer.serialize(snapshot("INFY", d, 1.0)).unwrap();
            writer.serialize(snapshot("INFY", d, 2.0)).unwrap();
            writer.serialize(snapshot("TCS", d, 3.0)).unwrap();
            writer.flush().unwrap();
        }

        let err = HistoricalStore::load(&path).err().unwrap();
        assert!(err.is_fatal());

        let (mut store, dropped) = HistoricalStore::load_lenient(&path).unwrap();
        assert_eq!(dropped, 1);
        store.compact().unwrap();

        let clean = HistoricalStore::load(&path).unwrap();
        assert_eq!(clean.len(), 2);
        assert_eq!(clean.series("INFY").unwrap().closes(), vec![1.0]);
        clean.verify().unwrap();
    }

    #[test]
    fn retention_window_past_the_calendar_has_no_cutoff() {
        assert_eq!(retention_cutoff(date(2024, 6, 15), 0), Some(date(2024, 6, 15)));
        assert_eq!(retention_cutoff(date(2024, 6, 15), u32::MAX), None);
    }

    #[test]
    fn append_to_foreign_layout_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BhavDB.csv");
        std::fs::write(
            &path,
            "Unnamed: 0,SYMBOL,SERIES,OPEN,HIGH,LOW,CLOSE,LAST,PREVCLOSE,TOTTRDQTY,TOTTRDVAL,TIMESTAMP,TOTALTRADES,ISIN\n\
             0,INFY,EQ,1,1,1,1,1,,100,,04-JAN-2024,,\n",
        )
        .unwrap();

        let mut store = HistoricalStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.has_canonical_layout());

        let outcome = store.append(&[snapshot("TCS", date(2024, 1, 4), 3740.0)]).unwrap();
        assert_eq!(outcome.appended, 1);
        assert!(store.has_canonical_layout());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&STORE_HEADER.join(",")));

        let reloaded = HistoricalStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.has_canonical_layout());
        assert_eq!(reloaded.series("INFY").unwrap().closes(), vec![1.0]);
        assert_eq!(reloaded.series("TCS").unwrap().closes(), vec![3740.0]);
    }

    #[test]
    fn canonical_file_is_appended_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.append(&[snapshot("INFY", date(2024, 1, 4), 1.0)]).unwrap();

        let mut reloaded = HistoricalStore::load(store.path()).unwrap();
        assert!(reloaded.has_canonical_layout());
        reloaded.append(&[snapshot("INFY", date(2024, 1, 5), 2.0)]).unwrap();
        assert_eq!(HistoricalStore::load(store.path()).unwrap().len(), 2);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoricalStore::load(dir.path().join("absent.csv")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.latest_date(), None);
    }
}
