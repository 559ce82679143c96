use crate::install::absolute_path;
use crate::types::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "pkg-updater";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_MANIFEST: &str = "package-info.json";

pub fn get_user_config_dir() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join(APP_NAME);
    Ok(path)
}

pub fn get_settings_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("PKG_UPDATER_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let path = get_user_config_dir()?.join(CONFIG_FILE_NAME);
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

pub fn load_settings() -> Result<UpdaterSettings> {
    let config_path = get_settings_file_path()?;

    let mut settings = if config_path.exists() {
        let content = fs::read_to_string(&config_path).with_context(|| {
            format!("Could not read config file at {}", config_path.display())
        })?;
        serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")?
    } else {
        UpdaterSettings::default()
    };

    if let Ok(dir) = std::env::var("PKG_UPDATER_STAGING_DIR") {
        settings.staging_dir = PathBuf::from(dir);
    }

    if let Ok(show_progress) = std::env::var("PKG_UPDATER_SHOW_PROGRESS") {
        settings.show_progress = parse_bool(&show_progress);
    }

    Ok(settings)
}

pub fn save_settings(settings: &UpdaterSettings) -> Result<()> {
    let config_path = get_settings_file_path()?;
    if let Some(config_dir) = config_path.parent() {
        fs::create_dir_all(config_dir)?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(&config_path, content)?;

    Ok(())
}

pub fn manifest_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var("PKG_UPDATER_MANIFEST")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MANIFEST))
}

/// Parse a package manifest. YAML when `yaml` is set, JSON otherwise.
pub fn parse_package_info(content: &str, yaml: bool) -> Result<PackageInfo> {
    if yaml {
        serde_yaml::from_str(content).with_context(|| "Could not parse manifest as YAML")
    } else {
        serde_json::from_str(content).with_context(|| "Could not parse manifest as JSON")
    }
}

pub fn load_package_info(path: &Path) -> Result<PackageInfo> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read manifest at {}", path.display()))?;

    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let mut package = parse_package_info(&content, yaml)?;

    // Relative install directories are relative to the manifest
    if package.install_dir.is_relative() {
        if let Some(base) = path.parent() {
            package.install_dir = base.join(&package.install_dir);
        }
    }
    package.install_dir = absolute_path(&package.install_dir).with_context(|| {
        format!("Could not resolve install directory {}", package.install_dir.display())
    })?;

    if let Ok(url) = std::env::var("PKG_UPDATER_API_URL") {
        package.api_url = url;
    }

    if let Ok(debug) = std::env::var("PKG_UPDATER_DEBUG") {
        package.debug = parse_bool(&debug);
    }

    tracing::debug!("Loaded manifest for {} from {}", package.name, path.display());
    Ok(package)
}

pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}
