//! Release metadata lookup
//!
//! `ReleaseClient` asks a [`ReleaseEndpoint`] for the latest release at most
//! once and serves every later read from its cache.

pub mod github;

pub use github::{build_gh_release_url, HttpReleaseEndpoint, ReleaseError};

use crate::types::{ReleaseAsset, ReleaseMetadata};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::OnceCell;

#[async_trait]
pub trait ReleaseEndpoint: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ReleaseMetadata>;
}

pub struct ReleaseClient {
    endpoint: Box<dyn ReleaseEndpoint>,
    url: String,
    cached: OnceCell<Option<ReleaseMetadata>>,
}

impl ReleaseClient {
    pub fn new(endpoint: Box<dyn ReleaseEndpoint>, url: impl Into<String>) -> Self {
        Self {
            endpoint,
            url: url.into(),
            cached: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Latest release, or `None` when the endpoint could not be read.
    ///
    /// A failed fetch is cached like a successful one.
    pub async fn latest_release(&self) -> Option<&ReleaseMetadata> {
        self.cached
            .get_or_init(|| async {
                match self.endpoint.fetch(&self.url).await {
                    Ok(release) => Some(release),
                    Err(e) => {
                        tracing::warn!("Could not get latest release from {}: {:#}", self.url, e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    /// Cached release without triggering a fetch.
    pub fn cached_release(&self) -> Option<&ReleaseMetadata> {
        self.cached.get().and_then(|release| release.as_ref())
    }

    pub fn version_tag(&self) -> Option<&str> {
        self.cached_release().map(|r| r.tag_name.as_str())
    }

    pub fn changelog(&self) -> &str {
        self.cached_release()
            .and_then(|r| r.body.as_deref())
            .unwrap_or("")
    }

    pub fn primary_asset(&self) -> Option<&ReleaseAsset> {
        self.cached_release().and_then(|r| r.primary_asset())
    }

    pub fn download_url(&self) -> Option<&str> {
        self.primary_asset()
            .map(|asset| asset.browser_download_url.as_str())
    }

    pub fn asset_name(&self) -> Option<&str> {
        self.primary_asset().map(|asset| asset.name.as_str())
    }
}
