use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::PipelineError;
use crate::ingest::Dataset;

/// Where dataset files come from. The pipeline only needs a local path per
/// dataset; tests substitute a fixture directory for the HTTP source.
pub trait DatasetSource {
    fn fetch(&self, dataset: Dataset) -> Result<PathBuf, PipelineError>;
}

/// Fetches dataset files over HTTP into the configured data directory,
/// skipping the download when the local copy already matches the remote
/// byte size.
pub struct HttpSource {
    client: Client,
    base_url: String,
    data_dir: PathBuf,
}

impl HttpSource {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory: {}", config.data_dir.display())
        })?;

        Ok(HttpSource {
            client,
            base_url: config.base_url.clone(),
            data_dir: config.data_dir.clone(),
        })
    }

    /// HEAD the remote file for its byte size. Probe failures are logged
    /// and swallowed — the caller falls back to an unconditional download.
    fn probe_remote_size(&self, url: &str) -> Option<u64> {
        let resp = match self.client.head(url).send().and_then(|r| r.error_for_status()) {
            Ok(resp) => resp,
            Err(err) => {
                warn!(url, error = %err, "size probe failed, downloading unconditionally");
                return None;
            }
        };
        resp.headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
    }
}

impl DatasetSource for HttpSource {
    fn fetch(&self, dataset: Dataset) -> Result<PathBuf, PipelineError> {
        let filename = dataset.filename();
        let url = format!("{}{}", self.base_url, filename);
        let local_path = self.data_dir.join(filename);

        let remote_size = self.probe_remote_size(&url);
        if local_matches(&local_path, remote_size) {
            info!(
                dataset = dataset.key(),
                path = %local_path.display(),
                "local copy matches remote size, skipping download"
            );
            return Ok(local_path);
        }

        let fetch_err = |reason: String| PipelineError::Fetch {
            dataset: dataset.key(),
            reason,
        };

        info!(dataset = dataset.key(), url = %url, "downloading");
        let mut resp = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?;

        let file = File::create(&local_path).map_err(|e| {
            fetch_err(format!("cannot create {}: {e}", local_path.display()))
        })?;
        let mut out = BufWriter::new(file);
        // Streams the body in chunks; the file is never held in memory.
        let bytes = std::io::copy(&mut resp, &mut out).map_err(|e| fetch_err(e.to_string()))?;
        out.flush().map_err(|e| fetch_err(e.to_string()))?;

        info!(dataset = dataset.key(), bytes, "download complete");
        Ok(local_path)
    }
}

/// A local file is reusable only when the probe produced a size and the
/// local byte count equals it.
fn local_matches(path: &Path, remote_size: Option<u64>) -> bool {
    match (std::fs::metadata(path), remote_size) {
        (Ok(meta), Some(size)) => meta.len() == size,
        _ => false,
    }
}
