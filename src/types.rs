use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The package being kept up to date. Loaded once from its manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageInfo {
    #[serde(alias = "packageName")]
    pub name: String,
    #[serde(default, alias = "packageFullName")]
    pub full_name: Option<String>,
    #[serde(default, alias = "packageShortName")]
    pub short_name: Option<String>,
    #[serde(alias = "packageVersion")]
    pub version: String,
    #[serde(alias = "packageFolder")]
    pub install_dir: PathBuf,
    #[serde(alias = "packageApiURL")]
    pub api_url: String,
    #[serde(default, alias = "debugMode")]
    pub debug: bool,
    /// Where the package lives inside the extracted archive, relative to its root.
    #[serde(default)]
    pub payload_dir: Option<String>,
}

impl PackageInfo {
    pub fn full_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }

    pub fn short_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or_else(|| self.full_name())
    }

    pub fn payload_subdir(&self) -> PathBuf {
        match &self.payload_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from("packages").join(&self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdaterSettings {
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir()
}
fn default_show_progress() -> bool {
    true
}
fn default_user_agent() -> String {
    format!("pkg-updater/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            show_progress: default_show_progress(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseMetadata {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default)]
    pub body: Option<String>,
}

impl ReleaseMetadata {
    /// The first asset, when it carries a download URL. Later assets are never considered.
    pub fn primary_asset(&self) -> Option<&ReleaseAsset> {
        self.assets
            .first()
            .filter(|asset| !asset.browser_download_url.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: String,
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseDetails {
    pub title: String,
    pub version_label: String,
    pub changelog: String,
}

/// Machine-readable result of `pkg-updater check`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckReport {
    pub package: String,
    pub current_version: String,
    pub latest_version: Option<String>,
    pub update_available: bool,
    pub checked_at: String,
}
