//! Image preview for the selected item.

use anyhow::{anyhow, bail, Result};
use image::DynamicImage;
use std::time::Duration;
use tracing::debug;

/// Largest download accepted for a preview.
const MAX_PREVIEW_BYTES: usize = 16 * 1024 * 1024;

/// Downloads and decodes item images.
#[derive(Clone)]
pub struct PreviewFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl PreviewFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { http: reqwest::Client::new(), timeout }
    }

    pub async fn fetch(&self, link: &str) -> Result<DynamicImage> {
        if !is_web_link(link) {
            bail!("Not an http(s) link");
        }

        let bytes = tokio::time::timeout(self.timeout, self.download(link))
            .await
            .map_err(|_| anyhow!("Timed out after {}s", self.timeout.as_secs()))??;
        debug!(%link, size = bytes.len(), "Downloaded preview");
        decode(&bytes)
    }

    /// Read the body in chunks, giving up as soon as it passes the size cap.
    async fn download(&self, link: &str) -> Result<Vec<u8>> {
        let mut resp = self.http.get(link).send().await?.error_for_status()?;
        if let Some(len) = resp.content_length() {
            check_size(len as usize)?;
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            check_size(body.len() + chunk.len())?;
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn check_size(len: usize) -> Result<()> {
    if len > MAX_PREVIEW_BYTES {
        bail!("Image is larger than {} MiB", MAX_PREVIEW_BYTES / (1024 * 1024));
    }
    Ok(())
}

pub fn is_web_link(link: &str) -> bool {
    link.starts_with("https://") || link.starts_with("http://")
}

/// Decode downloaded bytes. Animated GIFs yield their first frame.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    check_size(bytes.len())?;
    image::load_from_memory(bytes).map_err(|e| anyhow!("Unsupported image: {}", e))
}
