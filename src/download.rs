use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `destination`, returning the written file.
    async fn download(&self, url: &str, destination: &Path) -> Result<PathBuf>;
}

pub struct HttpDownloader {
    client: reqwest::Client,
    user_agent: String,
    show_progress: bool,
}

impl HttpDownloader {
    pub fn new(user_agent: &str, show_progress: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.to_string(),
            show_progress,
        }
    }

    fn progress_bar(&self, total_size: u64, filename: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(format!("Downloading {}", filename));
        pb
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<PathBuf> {
        let filename = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "update".to_string());
        tracing::info!("Downloading {}...", filename);

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("Download of {} failed: {}", url, response.status()));
        }
        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(destination)
            .await
            .with_context(|| format!("Could not create {}", destination.display()))?;

        let pb = self.progress_bar(total_size, &filename);
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush().await?;

        pb.finish_with_message("Download complete");
        tracing::debug!("Wrote {} bytes to {}", downloaded, destination.display());
        Ok(destination.to_path_buf())
    }
}

/// File name for a downloaded asset, falling back to the URL's last segment.
pub fn asset_file_name(asset_name: &str, url: &str) -> String {
    let name = asset_name.trim();
    if !name.is_empty() && !name.contains(['/', '\\']) {
        return name.to_string();
    }
    url.split('?')
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("update.zip")
        .to_string()
}
