// =============================================================================
// Runtime Configuration — pipeline paths, retention and fetch settings
// =============================================================================
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("bhav_data")
}

fn default_store_file() -> String {
    "BhavDB.csv".to_string()
}

fn default_watchlist_file() -> String {
    "watchlist.csv".to_string()
}

fn default_report_file() -> String {
    "UPD.csv".to_string()
}

fn default_retention_days() -> u32 {
    730
}

fn default_archive_base_url() -> String {
    "https://nsearchives.nseindia.com/content/historical/EQUITIES".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/108.0.0.0 Safari/537.36"
        .to_string()
}

fn default_referer() -> String {
    "https://www.nseindia.com/".to_string()
}

fn default_instrument_class() -> String {
    "EQ".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the Bhavcopy pipeline.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Files ---------------------------------------------------------------

    /// Folder holding the store, watchlist, report and extracted day files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Historical store file name inside `data_dir`.
    #[serde(default = "default_store_file")]
    pub store_file: String,

    /// Watchlist file name inside `data_dir` (one symbol per line).
    #[serde(default = "default_watchlist_file")]
    pub watchlist_file: String,

    /// Report file name inside `data_dir`.
    #[serde(default = "default_report_file")]
    pub report_file: String,

    // --- Store maintenance ---------------------------------------------------

    /// Rows older than this many days are dropped by `prune`.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Instrument class kept by the normalizer (regular-lot equity).
    #[serde(default = "default_instrument_class")]
    pub instrument_class: String,

    // --- Fetching ------------------------------------------------------------

    /// Base URL of the exchange's historical equity archive.
    #[serde(default = "default_archive_base_url")]
    pub archive_base_url: String,

    /// Upper bound on a single archive download.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_referer")]
    pub referer: String,

    /// Never hit the network; only read day files already in `data_dir`.
    #[serde(default)]
    pub offline: bool,

    /// Keep the extracted day CSV next to the store after a download.
    #[serde(default = "default_true")]
    pub keep_extracted: bool,

    /// Do not attempt Saturdays and Sundays during a backfill.
    #[serde(default = "default_true")]
    pub skip_weekends: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_file: default_store_file(),
            watchlist_file: default_watchlist_file(),
            report_file: default_report_file(),
            retention_days: default_retention_days(),
            instrument_class: default_instrument_class(),
            archive_base_url: default_archive_base_url(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            offline: false,
            keep_extracted: true,
            skip_weekends: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            data_dir = %config.data_dir.display(),
            retention_days = config.retention_days,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `BHAV_DATA_DIR` / `BHAV_OFFLINE` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("BHAV_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(flag) = std::env::var("BHAV_OFFLINE") {
            self.offline = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    pub fn watchlist_path(&self) -> PathBuf {
        self.data_dir.join(&self.watchlist_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.data_dir.join(&self.report_file)
    }
}
