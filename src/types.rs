// =============================================================================
// Shared types used across the Bhavcopy pipeline
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date layout used by the exchange files and by the persisted store,
/// e.g. `04-JAN-2024`.
pub const BHAV_DATE_FORMAT: &str = "%d-%b-%Y";

/// Date layout accepted on the command line, e.g. `04/01/2024`.
pub const INPUT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Format a date the way the exchange does: zero-padded day, upper-case
/// three-letter month, four-digit year.
pub fn format_bhav_date(date: NaiveDate) -> String {
    date.format(BHAV_DATE_FORMAT).to_string().to_uppercase()
}

/// Parse a `DD-MON-YYYY` date (month name is case-insensitive). ISO dates are
/// accepted as a fallback so hand-edited store files still load.
pub fn parse_bhav_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, BHAV_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Parse a `DD/MM/YYYY` command-line date.
pub fn parse_input_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), INPUT_DATE_FORMAT).ok()
}

/// Serde adapter for `DD-MON-YYYY` dates.
pub mod bhav_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_bhav_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_bhav_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid bhavcopy date '{raw}'")))
    }
}

/// Uniqueness key of the historical store.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct SnapshotKey {
    pub symbol: String,
    pub date: NaiveDate,
}

impl std::fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, format_bhav_date(self.date))
    }
}

/// Header of the store file, in [`DailySnapshot`] field order.
pub const STORE_HEADER: [&str; 13] = [
    "SYMBOL",
    "SERIES",
    "OPEN",
    "HIGH",
    "LOW",
    "CLOSE",
    "LAST",
    "PREVCLOSE",
    "TOTTRDQTY",
    "TOTTRDVAL",
    "TIMESTAMP",
    "TOTALTRADES",
    "ISIN",
];

/// One instrument's end-of-day row for one date.
///
/// Field order is the persisted column order of the store file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    #[serde(rename = "SYMBOL")]
    pub symbol: String,
    #[serde(rename = "SERIES")]
    pub series: String,
    #[serde(rename = "OPEN")]
    pub open: f64,
    #[serde(rename = "HIGH")]
    pub high: f64,
    #[serde(rename = "LOW")]
    pub low: f64,
    #[serde(rename = "CLOSE")]
    pub close: f64,
    #[serde(rename = "LAST")]
    pub last: f64,
    #[serde(rename = "PREVCLOSE", default)]
    pub prev_close: Option<f64>,
    #[serde(rename = "TOTTRDQTY", default)]
    pub volume: u64,
    #[serde(rename = "TOTTRDVAL", default)]
    pub traded_value: Option<f64>,
    #[serde(rename = "TIMESTAMP", with = "bhav_date")]
    pub timestamp: NaiveDate,
    #[serde(rename = "TOTALTRADES", default)]
    pub total_trades: Option<u64>,
    #[serde(rename = "ISIN", default)]
    pub isin: Option<String>,
}

impl DailySnapshot {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            symbol: self.symbol.clone(),
            date: self.timestamp,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::date;
    use super::*;

    #[test]
    fn bhav_date_is_upper_case_and_zero_padded() {
        assert_eq!(format_bhav_date(date(2024, 1, 4)), "04-JAN-2024");
    }

    #[test]
    fn parse_accepts_any_month_case() {
        assert_eq!(parse_bhav_date("04-JAN-2024"), Some(date(2024, 1, 4)));
        assert_eq!(parse_bhav_date("04-Jan-2024"), Some(date(2024, 1, 4)));
        assert_eq!(parse_bhav_date(" 2024-01-04 "), Some(date(2024, 1, 4)));
        assert_eq!(parse_bhav_date("garbage"), None);
    }

    #[test]
    fn input_date_is_day_first() {
        assert_eq!(parse_input_date("04/01/2024"), Some(date(2024, 1, 4)));
        assert_eq!(parse_input_date("2024/01/04"), None);
    }
}
