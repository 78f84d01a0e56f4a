// =============================================================================
// Snapshot Normalizer
// =============================================================================
//
// Reduces one day's raw listing to the regular-lot equity rows, keeping only
// the portable columns. No I/O happens here; the caller supplies the text.

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use super::RawSnapshot;
use crate::error::PipelineError;
use crate::types::{parse_bhav_date, DailySnapshot};

/// Columns a snapshot cannot be normalized without.
const REQUIRED_COLUMNS: [&str; 7] = ["SYMBOL", "SERIES", "OPEN", "HIGH", "LOW", "CLOSE", "LAST"];

/// Optional columns carried through when present.
const OPTIONAL_COLUMNS: [&str; 6] = [
    "PREVCLOSE",
    "TOTTRDQTY",
    "TOTTRDVAL",
    "TIMESTAMP",
    "TOTALTRADES",
    "ISIN",
];

/// Result of normalizing one day.
#[derive(Debug, Clone)]
pub struct NormalizedDay {
    pub rows: Vec<DailySnapshot>,
    /// Header names that were discarded (blank trailing columns included).
    pub dropped_columns: Vec<String>,
    /// Matching rows whose numeric fields could not be parsed.
    pub skipped_rows: usize,
}

impl NormalizedDay {
    /// Symbols retained for the day, in file order.
    pub fn symbols(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.symbol.as_str()).collect()
    }
}

/// Header-name to position lookup for one file.
struct ColumnMap {
    required: [usize; 7],
    optional: [Option<usize>; 6],
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord, source_name: &str) -> Result<(Self, Vec<String>), PipelineError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_uppercase()).collect();
        let position = |col: &str| names.iter().position(|n| n == col);

        let mut required = [0usize; 7];
        for (slot, col) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = position(col).ok_or_else(|| PipelineError::MalformedSnapshot {
                source_name: source_name.to_string(),
                reason: format!("missing column {col}"),
            })?;
        }

        let mut optional = [None; 6];
        for (slot, col) in optional.iter_mut().zip(OPTIONAL_COLUMNS) {
            *slot = position(col);
        }

        let dropped = names
            .iter()
            .filter(|n| !REQUIRED_COLUMNS.contains(&n.as_str()) && !OPTIONAL_COLUMNS.contains(&n.as_str()))
            .map(|n| if n.is_empty() { "<unnamed>".to_string() } else { n.clone() })
            .collect();

        Ok((Self { required, optional }, dropped))
    }
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).map(str::trim).unwrap_or("")
}

fn optional_field<'r>(record: &'r StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.map(|i| field(record, i)).filter(|s| !s.is_empty())
}

fn parse_volume(raw: &str) -> Option<u64> {
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

/// Filters raw listings down to one instrument class.
#[derive(Debug, Clone)]
pub struct Normalizer {
    instrument_class: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new("EQ")
    }
}

impl Normalizer {
    pub fn new(instrument_class: impl Into<String>) -> Self {
        Self {
            instrument_class: instrument_class.into(),
        }
    }

    /// Normalize one day's raw feed.
    ///
    /// Fails with [`PipelineError::MalformedSnapshot`] when a required column
    /// (notably SERIES) is absent or the text is not readable CSV.
    pub fn normalize(&self, raw: &RawSnapshot) -> Result<NormalizedDay, PipelineError> {
        let malformed = |reason: String| PipelineError::MalformedSnapshot {
            source_name: raw.source_name.clone(),
            reason,
        };

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(raw.content.as_bytes());

        let headers = reader.headers().map_err(|e| malformed(e.to_string()))?.clone();
        let (cols, dropped_columns) = ColumnMap::from_headers(&headers, &raw.source_name)?;

        let mut rows = Vec::new();
        let mut skipped_rows = 0usize;

        for record in reader.records() {
            let record = record.map_err(|e| malformed(e.to_string()))?;
            let [sym_i, series_i, open_i, high_i, low_i, close_i, last_i] = cols.required;

            if field(&record, series_i) != self.instrument_class {
                continue;
            }

            let price = |idx: usize| {
                field(&record, idx)
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
            };
            let (Some(open), Some(high), Some(low), Some(close), Some(last)) =
                (price(open_i), price(high_i), price(low_i), price(close_i), price(last_i))
            else {
                skipped_rows += 1;
                continue;
            };

            let symbol = field(&record, sym_i);
            if symbol.is_empty() {
                skipped_rows += 1;
                continue;
            }

            let [prev_i, qty_i, val_i, ts_i, trades_i, isin_i] = cols.optional;
            let timestamp = optional_field(&record, ts_i)
                .and_then(parse_bhav_date)
                .unwrap_or(raw.date);

            rows.push(DailySnapshot {
                symbol: symbol.to_string(),
                series: self.instrument_class.clone(),
                open,
                high,
                low,
                close,
                last,
                prev_close: optional_field(&record, prev_i).and_then(|s| s.parse().ok()),
                volume: optional_field(&record, qty_i).and_then(parse_volume).unwrap_or(0),
                traded_value: optional_field(&record, val_i).and_then(|s| s.parse().ok()),
                timestamp,
                total_trades: optional_field(&record, trades_i).and_then(parse_volume),
                isin: optional_field(&record, isin_i).map(str::to_string),
            });
        }

        debug!(source = %raw.source_name, rows = rows.len(), "snapshot normalized");

        Ok(NormalizedDay {
            rows,
            dropped_columns,
            skipped_rows,
        })
    }
}
