//! Download collaborator.
//!
//! The download stage only needs "put the bytes behind this URL at that
//! path". `HttpFetcher` does it over HTTP(S) with reqwest and also accepts
//! `file://` URLs so an archive mirrored on local disk can stand in for the
//! remote one.

use crate::models::{DownloadConfig, PipelineError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Something that can materialize a URL as a file.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// Write the content behind `url` to `dest`, returning the byte count.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// HTTP(S) fetcher with optional progress bar.
///
/// No retries: a failed request fails the download stage.
pub struct HttpFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl HttpFetcher {
    /// Create a new fetcher.
    pub fn new(timeout_secs: u64, show_progress: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("geoprep/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Internal(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            show_progress,
        })
    }

    pub fn from_config(config: &DownloadConfig) -> Result<Self> {
        Self::new(config.timeout_secs, config.show_progress)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| PipelineError::Download {
                    url: url.to_string(),
                    source: e,
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let pb = self.progress_bar(response.content_length());
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| PipelineError::io(format!("creating {}", dest.display()), e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PipelineError::Download {
                url: url.to_string(),
                source: e,
            })?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| PipelineError::io(format!("writing {}", dest.display()), e))?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }

        file.flush()
            .await
            .map_err(|e| PipelineError::io(format!("flushing {}", dest.display()), e))?;
        pb.finish_and_clear();

        Ok(written)
    }

    fn progress_bar(&self, len: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match len {
            Some(len) => {
                let pb = ProgressBar::new(len);
                pb.set_style(
                    ProgressStyle::with_template(
                        "[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::with_template("{spinner} {bytes} ({bytes_per_sec})")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let result = match url.strip_prefix("file://") {
            Some(local) => copy_local(Path::new(local), dest).await,
            None => self.download(url, dest).await,
        };

        match &result {
            Ok(bytes) => info!(url, bytes, dest = %dest.display(), "Download finished"),
            Err(e) => {
                // A partial file would otherwise pass the existence checkpoint.
                if tokio::fs::remove_file(dest).await.is_ok() {
                    debug!(dest = %dest.display(), "Removed partial download");
                }
                warn!(url, error = %e, "Download failed");
            }
        }
        result
    }
}

async fn copy_local(src: &Path, dest: &Path) -> Result<u64> {
    tokio::fs::copy(src, dest).await.map_err(|e| {
        PipelineError::io(
            format!("copying {} to {}", src.display(), dest.display()),
            e,
        )
    })
}
