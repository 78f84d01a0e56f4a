// =============================================================================
// Bhavcopy Module
// =============================================================================
//
// Everything that touches one day's raw exchange file: where it lives in the
// archive, how it is fetched, and how it is reduced to portable rows.

pub mod normalizer;
pub mod source;

use chrono::NaiveDate;

pub use normalizer::Normalizer;
pub use source::{CachedSource, SnapshotSource};

/// One day's raw feed as handed over by a [`SnapshotSource`].
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub date: NaiveDate,
    /// File name or URL the content came from (used in log lines and errors).
    pub source_name: String,
    pub content: String,
}

/// Upper-case three-letter month, e.g. `JAN`.
fn month_abbr(date: NaiveDate) -> String {
    date.format("%b").to_string().to_uppercase()
}

/// Name of the extracted day file, e.g. `cm04JAN2024bhav.csv`.
pub fn csv_file_name(date: NaiveDate) -> String {
    format!(
        "cm{}{}{}bhav.csv",
        date.format("%d"),
        month_abbr(date),
        date.format("%Y")
    )
}

/// Archive URL of the zipped day file under `base_url`.
pub fn archive_url(base_url: &str, date: NaiveDate) -> String {
    format!(
        "{}/{}/{}/{}.zip",
        base_url.trim_end_matches('/'),
        date.format("%Y"),
        month_abbr(date),
        csv_file_name(date)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::date;

    #[test]
    fn file_name_uses_padded_day_and_upper_month() {
        assert_eq!(csv_file_name(date(2024, 1, 4)), "cm04JAN2024bhav.csv");
        assert_eq!(csv_file_name(date(2023, 12, 29)), "cm29DEC2023bhav.csv");
    }

    #[test]
    fn archive_url_layout() {
        assert_eq!(
            archive_url("https://example.org/EQUITIES/", date(2024, 1, 4)),
            "https://example.org/EQUITIES/2024/JAN/cm04JAN2024bhav.csv.zip"
        );
    }
}
