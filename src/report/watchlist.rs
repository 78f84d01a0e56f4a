use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Ordered, duplicate-free list of symbols to report on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchlist {
    symbols: Vec<String>,
}

impl Watchlist {
    /// One symbol per line, no header. Blank lines are ignored; for CSV-style
    /// lines only the first field counts.
    pub fn parse(text: &str) -> Self {
        let mut seen = HashSet::new();
        let symbols = text
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(|s| s.trim().trim_matches('"').trim())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.to_string()))
            .map(str::to_string)
            .collect();
        Self { symbols }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read watchlist from {}", path.display()))?;
        let watchlist = Self::parse(&text);
        info!(path = %path.display(), symbols = watchlist.len(), "watchlist loaded");
        Ok(watchlist)
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_order_and_drops_blanks_and_repeats() {
        let wl = Watchlist::parse("INFY\n\n TCS \nINFY\n\"SBIN\",x\n");
        assert_eq!(wl.symbols(), ["INFY", "TCS", "SBIN"]);
    }

    #[test]
    fn empty_text_is_empty_watchlist() {
        assert!(Watchlist::parse("").is_empty());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.csv");
        std::fs::write(&path, "RELIANCE\nHDFCBANK\n").unwrap();
        assert_eq!(Watchlist::load(&path).unwrap().len(), 2);
        assert!(Watchlist::load(dir.path().join("missing.csv")).is_err());
    }
}
