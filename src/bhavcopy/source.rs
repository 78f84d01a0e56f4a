// =============================================================================
// Snapshot Sources — where one day's raw file comes from
// =============================================================================
//
// A source makes exactly one attempt per date. Every failure (missing file,
// HTTP error, timeout, broken archive) surfaces as `SourceUnavailable` so the
// backfill loop can log it and move on to the next day.
// =============================================================================

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use tracing::{debug, instrument, warn};

use super::{archive_url, csv_file_name, RawSnapshot};
use crate::error::PipelineError;
use crate::runtime_config::RuntimeConfig;

/// Anything that can hand over one day's raw Bhavcopy text.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    async fn fetch(&self, date: NaiveDate) -> Result<RawSnapshot, PipelineError>;
}

fn unavailable(date: NaiveDate, reason: impl Into<String>) -> PipelineError {
    PipelineError::SourceUnavailable {
        date,
        reason: reason.into(),
    }
}

// -----------------------------------------------------------------------------
// FolderSource
// -----------------------------------------------------------------------------

/// Reads already-extracted `cmDDMONYYYYbhav.csv` files from a folder.
#[derive(Debug, Clone)]
pub struct FolderSource {
    dir: PathBuf,
}

impl FolderSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(csv_file_name(date))
    }
}

impl SnapshotSource for FolderSource {
    async fn fetch(&self, date: NaiveDate) -> Result<RawSnapshot, PipelineError> {
        let path = self.path_for(date);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(RawSnapshot {
                date,
                source_name: path.display().to_string(),
                content,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(unavailable(date, format!("file '{}' not found", path.display())))
            }
            Err(e) => Err(unavailable(date, format!("cannot read '{}': {e}", path.display()))),
        }
    }
}

// -----------------------------------------------------------------------------
// ArchiveClient
// -----------------------------------------------------------------------------

/// Downloads the zipped day file from the exchange archive and extracts the
/// CSV in memory.
#[derive(Clone)]
pub struct ArchiveClient {
    base_url: String,
    client: reqwest::Client,
    /// Folder to keep the extracted CSV in, if any.
    keep_dir: Option<PathBuf>,
}

impl ArchiveClient {
    /// Build a client with a bounded request timeout and browser-like headers
    /// (the archive rejects bare clients).
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        if let Ok(val) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, val);
        }
        if let Ok(val) = HeaderValue::from_str(&config.referer) {
            headers.insert(REFERER, val);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .context("failed to build archive HTTP client")?;

        debug!(base_url = %config.archive_base_url, "ArchiveClient initialised");

        Ok(Self {
            base_url: config.archive_base_url.clone(),
            client,
            keep_dir: config.keep_extracted.then(|| config.data_dir.clone()),
        })
    }

    #[instrument(skip(self), name = "archive::download")]
    async fn download(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("archive returned {status}"));
        }

        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| format!("failed to read body: {e}"))
    }

    async fn keep_copy(&self, dir: &Path, date: NaiveDate, content: &str) {
        let path = dir.join(csv_file_name(date));
        if let Err(e) = tokio::fs::write(&path, content).await {
            warn!(path = %path.display(), error = %e, "failed to keep extracted day file");
        }
    }
}

/// Return the name and text of the first `.csv` entry in a zip archive.
fn extract_csv(bytes: &[u8]) -> std::result::Result<(String, String), String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("bad archive: {e}"))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| format!("bad archive entry: {e}"))?;
        if entry.name().to_ascii_lowercase().ends_with(".csv") {
            let name = entry.name().to_string();
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| format!("failed to extract {name}: {e}"))?;
            return Ok((name, content));
        }
    }

    Err("archive contains no CSV entry".to_string())
}

impl SnapshotSource for ArchiveClient {
    async fn fetch(&self, date: NaiveDate) -> Result<RawSnapshot, PipelineError> {
        let url = archive_url(&self.base_url, date);
        debug!(url = %url, "downloading bhavcopy archive");

        let bytes = self.download(&url).await.map_err(|r| unavailable(date, r))?;
        let (name, content) = extract_csv(&bytes).map_err(|r| unavailable(date, r))?;

        if let Some(dir) = &self.keep_dir {
            self.keep_copy(dir, date, &content).await;
        }

        debug!(entry = %name, bytes = bytes.len(), "bhavcopy archive extracted");
        Ok(RawSnapshot {
            date,
            source_name: url,
            content,
        })
    }
}

// -----------------------------------------------------------------------------
// CachedSource
// -----------------------------------------------------------------------------

/// Folder first, archive second. With no archive (offline mode) this is just
/// the folder.
#[derive(Clone)]
pub struct CachedSource {
    folder: FolderSource,
    archive: Option<ArchiveClient>,
}

impl CachedSource {
    pub fn new(folder: FolderSource, archive: Option<ArchiveClient>) -> Self {
        Self { folder, archive }
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let folder = FolderSource::new(&config.data_dir);
        let archive = if config.offline {
            None
        } else {
            Some(ArchiveClient::new(config)?)
        };
        Ok(Self::new(folder, archive))
    }
}

impl SnapshotSource for CachedSource {
    async fn fetch(&self, date: NaiveDate) -> Result<RawSnapshot, PipelineError> {
        match self.folder.fetch(date).await {
            Ok(raw) => Ok(raw),
            Err(local) => match &self.archive {
                Some(archive) => archive.fetch(date).await,
                None => Err(local),
            },
        }
    }
}
