// =============================================================================
// Indicator Engine — one report row per symbol
// =============================================================================
//
// Runs the fixed indicator battery over a symbol's ascending close series and
// keeps the value at the most recent date.  "Weekly" and "Daily" in the
// column names are labels only; every window is counted in rows of the
// series it is given.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::trace;

use super::bollinger::calculate_bollinger;
use super::ema::latest_ema;
use super::extrema::{lagged_max, lagged_min};
use super::latest;
use super::roc::relative_strength;
use super::sma::latest_sma;
use crate::store::SymbolSeries;
use crate::types::bhav_date;

const WEEKLY_EMA_FAST: usize = 10;
const WEEKLY_EMA_SLOW: usize = 40;
const DAILY_EMA_FAST: usize = 10;
const DAILY_EMA_SLOW: usize = 30;

const SMA_WINDOWS: [usize; 3] = [50, 200, 250];

/// 52 weeks of five trading days, reported one week (7 rows) late.
const YEAR_WINDOW: usize = 5 * 52;
const YEAR_LAG: usize = 7;

/// 100 trading days, reported one row late.
const HUNDRED_DAY_WINDOW: usize = 100;
const HUNDRED_DAY_LAG: usize = 1;

const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_UPPER_K: f64 = 2.0;
const BOLLINGER_LOWER_K: f64 = 1.0;

/// Column order of the report file.
pub const REPORT_HEADER: [&str; 20] = [
    "Date",
    "Symbol",
    "R.S.",
    "High",
    "Low",
    "Close",
    "Last",
    "Weekly EMA(10)",
    "Weekly EMA(40)",
    "Daily SMA(50)",
    "Daily SMA(200)",
    "Daily SMA(250)",
    "Daily EMA(10)",
    "Daily EMA(30)",
    "One Week Ago 52-week High",
    "One Week Ago 52-week Low",
    "One Day Ago 100-day High",
    "One Day Ago 100-day Low",
    "Weekly Upper Bollinger Band(20,2)",
    "Weekly Lower Bollinger Band(20,1)",
];

/// Indicator values of one symbol as of its latest date.
///
/// Field order matches [`REPORT_HEADER`]; `None` is written as an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRecord {
    #[serde(with = "bhav_date")]
    pub date: NaiveDate,
    pub symbol: String,
    pub relative_strength: Option<f64>,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub last: f64,
    pub weekly_ema_10: Option<f64>,
    pub weekly_ema_40: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub sma_250: Option<f64>,
    pub daily_ema_10: Option<f64>,
    pub daily_ema_30: Option<f64>,
    pub week_ago_52w_high: Option<f64>,
    pub week_ago_52w_low: Option<f64>,
    pub day_ago_100d_high: Option<f64>,
    pub day_ago_100d_low: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
}

impl IndicatorRecord {
    fn computed(&self) -> [Option<f64>; 14] {
        [
            self.relative_strength,
            self.weekly_ema_10,
            self.weekly_ema_40,
            self.sma_50,
            self.sma_200,
            self.sma_250,
            self.daily_ema_10,
            self.daily_ema_30,
            self.week_ago_52w_high,
            self.week_ago_52w_low,
            self.day_ago_100d_high,
            self.day_ago_100d_low,
            self.bollinger_upper,
            self.bollinger_lower,
        ]
    }

    /// Whether at least one computed indicator is defined.
    pub fn has_any_indicator(&self) -> bool {
        self.computed().iter().any(Option::is_some)
    }
}

/// Compute the indicator row for the latest date of `series`.
///
/// Returns `None` for an empty series.
pub fn compute_indicators(series: &SymbolSeries) -> Option<IndicatorRecord> {
    let latest_row = series.latest()?;
    let closes = series.closes();

    let [sma_50, sma_200, sma_250] = SMA_WINDOWS.map(|w| latest_sma(&closes, w));
    let bands = calculate_bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_UPPER_K, BOLLINGER_LOWER_K);

    let record = IndicatorRecord {
        date: latest_row.timestamp,
        symbol: series.symbol.clone(),
        relative_strength: relative_strength(&closes),
        high: latest_row.high,
        low: latest_row.low,
        close: latest_row.close,
        last: latest_row.last,
        weekly_ema_10: latest_ema(&closes, WEEKLY_EMA_FAST),
        weekly_ema_40: latest_ema(&closes, WEEKLY_EMA_SLOW),
        sma_50,
        sma_200,
        sma_250,
        daily_ema_10: latest_ema(&closes, DAILY_EMA_FAST),
        daily_ema_30: latest_ema(&closes, DAILY_EMA_SLOW),
        week_ago_52w_high: latest(&lagged_max(&closes, YEAR_WINDOW, YEAR_LAG)),
        week_ago_52w_low: latest(&lagged_min(&closes, YEAR_WINDOW, YEAR_LAG)),
        day_ago_100d_high: latest(&lagged_max(&closes, HUNDRED_DAY_WINDOW, HUNDRED_DAY_LAG)),
        day_ago_100d_low: latest(&lagged_min(&closes, HUNDRED_DAY_WINDOW, HUNDRED_DAY_LAG)),
        bollinger_upper: bands.map(|b| b.upper),
        bollinger_lower: bands.map(|b| b.lower),
    };

    trace!(
        symbol = %record.symbol,
        rows = series.len(),
        rs = ?record.relative_strength,
        "indicators computed"
    );
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::{date, snapshot};
    use chrono::Duration;

    fn series_of(closes: &[f64]) -> SymbolSeries {
        let start = date(2023, 1, 2);
        let rows = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| snapshot("INFY", start + Duration::days(i as i64), c))
            .collect();
        SymbolSeries::new("INFY", rows)
    }

    #[test]
    fn empty_series_has_no_record() {
        assert!(compute_indicators(&SymbolSeries::new("INFY", Vec::new())).is_none());
    }

    #[test]
    fn single_row_has_emas_only() {
        let record = compute_indicators(&series_of(&[123.0])).unwrap();
        assert_eq!(record.close, 123.0);
        assert_eq!(record.weekly_ema_10, Some(123.0));
        assert_eq!(record.daily_ema_30, Some(123.0));
        assert_eq!(record.relative_strength, None);
        assert_eq!(record.sma_50, None);
        assert_eq!(record.bollinger_upper, None);
        assert_eq!(record.day_ago_100d_high, None);
        assert!(record.has_any_indicator());
    }

    #[test]
    fn full_history_defines_every_column() {
        let closes: Vec<f64> = (1..=300).map(f64::from).collect();
        let record = compute_indicators(&series_of(&closes)).unwrap();

        assert_eq!(record.date, date(2023, 1, 2) + Duration::days(299));
        assert_eq!(record.computed().iter().filter(|v| v.is_none()).count(), 0);
        // SMA(50) of 251..=300
        assert_eq!(record.sma_50, Some(275.5));
        // one day ago 100-day window = 200..=299
        assert_eq!(record.day_ago_100d_high, Some(299.0));
        assert_eq!(record.day_ago_100d_low, Some(200.0));
        // one week ago 260-day window ends at position 292 (value 293)
        assert_eq!(record.week_ago_52w_high, Some(293.0));
        assert_eq!(record.week_ago_52w_low, Some(34.0));
        let upper = record.bollinger_upper.unwrap();
        let lower = record.bollinger_lower.unwrap();
        assert!(upper > 290.5 && lower < 290.5);
    }

    #[test]
    fn flat_history_scores_one() {
        let record = compute_indicators(&series_of(&[500.0; 252])).unwrap();
        assert_eq!(record.relative_strength, Some(1.0));
        assert_eq!(record.sma_250, Some(500.0));
    }
}
