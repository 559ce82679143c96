// Each test crate uses a different subset of these helpers.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use pkg_updater::archive::{ArchiveExtractor, ExtractProgress};
use pkg_updater::download::Downloader;
use pkg_updater::types::ReleaseDetails;
use pkg_updater::ui::UpdateView;
use pkg_updater::{
    Collaborators, PackageInfo, ReleaseAsset, ReleaseEndpoint, ReleaseMetadata, UpdaterSettings,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use walkdir::WalkDir;

pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub staging_dir: PathBuf,
    pub bin_path: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config").join("config.json");
        let staging_dir = temp_dir.path().join("staging");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_pkg-updater"));

        Self {
            _temp_dir: temp_dir,
            config_path,
            staging_dir,
            bin_path,
        }
    }

    pub fn root(&self) -> &Path {
        self._temp_dir.path()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("PKG_UPDATER_CONFIG", &self.config_path);
        cmd.env("PKG_UPDATER_STAGING_DIR", &self.staging_dir);
        cmd.env("PKG_UPDATER_SHOW_PROGRESS", "false");
        cmd.env("HOME", self._temp_dir.path());
        cmd.env("XDG_CONFIG_HOME", self._temp_dir.path().join("xdg"));
        cmd.env_remove("PKG_UPDATER_MANIFEST");
        cmd.env_remove("PKG_UPDATER_API_URL");
        cmd.env_remove("PKG_UPDATER_DEBUG");
        cmd.env_remove("GITHUB_TOKEN");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Write a JSON manifest for a package installed under the test root.
    pub fn write_manifest(&self, version: &str, api_url: &str) -> PathBuf {
        let content = manifest_json(version, api_url, "install/demo");
        write_manifest_at(&self.root().join("package-info.json"), &content)
    }
}

pub fn manifest_json(version: &str, api_url: &str, install_dir: &str) -> serde_json::Value {
    serde_json::json!({
        "name": "demo",
        "full_name": "Demo Scripts",
        "version": version,
        "install_dir": install_dir,
        "api_url": api_url,
    })
}

pub fn write_manifest_at(manifest: &Path, content: &serde_json::Value) -> PathBuf {
    if let Some(parent) = manifest.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(manifest, serde_json::to_string_pretty(content).unwrap()).unwrap();
    manifest.to_path_buf()
}

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        if self.status.success() {
            panic!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }
}

pub fn package(install_dir: &Path, version: &str) -> PackageInfo {
    PackageInfo {
        name: "demo".to_string(),
        full_name: Some("Demo Scripts".to_string()),
        short_name: Some("Demo".to_string()),
        version: version.to_string(),
        install_dir: install_dir.to_path_buf(),
        api_url: "https://example.invalid/repos/acme/demo/releases/latest".to_string(),
        debug: true,
        payload_dir: None,
    }
}

pub fn settings(staging_dir: &Path) -> UpdaterSettings {
    UpdaterSettings {
        staging_dir: staging_dir.to_path_buf(),
        show_progress: false,
        ..UpdaterSettings::default()
    }
}

pub fn release(tag: &str) -> ReleaseMetadata {
    ReleaseMetadata {
        tag_name: tag.to_string(),
        assets: vec![ReleaseAsset {
            name: "demo.zip".to_string(),
            browser_download_url: "https://example.invalid/download/demo.zip".to_string(),
        }],
        body: Some("- New brushes\n- Fixed export".to_string()),
    }
}

pub fn release_without_assets(tag: &str) -> ReleaseMetadata {
    ReleaseMetadata {
        assets: Vec::new(),
        ..release(tag)
    }
}

pub struct StaticEndpoint {
    pub release: Option<ReleaseMetadata>,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ReleaseEndpoint for StaticEndpoint {
    async fn fetch(&self, _url: &str) -> Result<ReleaseMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release
            .clone()
            .ok_or_else(|| anyhow!("connection refused"))
    }
}

/// Writes a placeholder archive. The first `failures` downloads fail.
pub struct FakeDownloader {
    pub failures: AtomicUsize,
    pub destinations: Arc<Mutex<Vec<PathBuf>>>,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, _url: &str, destination: &Path) -> Result<PathBuf> {
        self.destinations
            .lock()
            .unwrap()
            .push(destination.to_path_buf());
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(anyhow!("connection reset by peer"));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(destination, b"archive")?;
        Ok(destination.to_path_buf())
    }
}

/// Materialises `files` under the destination instead of reading the archive.
pub struct FakeExtractor {
    pub files: Vec<(String, String)>,
    pub fail: bool,
}

#[async_trait]
impl ArchiveExtractor for FakeExtractor {
    async fn extract(
        &self,
        _archive: &Path,
        destination: &Path,
        progress: &mut dyn ExtractProgress,
    ) -> Result<()> {
        progress.on_start();
        if self.fail {
            return Err(anyhow!("archive is corrupt"));
        }
        let total = self.files.len().max(1);
        for (i, (relative, content)) in self.files.iter().enumerate() {
            let path = destination.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
            progress.on_progress(((i + 1) * 100 / total) as u8);
        }
        progress.on_end();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Available(String),
    Hidden,
    Details(ReleaseDetails),
    Downloading,
    Installing,
    Progress(u8),
    Done,
}

#[derive(Clone, Default)]
pub struct RecordingView {
    pub events: Arc<Mutex<Vec<ViewEvent>>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ViewEvent> {
        self.events.lock().unwrap().last().cloned()
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl UpdateView for RecordingView {
    fn show_update_available(&mut self, label: &str) {
        self.push(ViewEvent::Available(label.to_string()));
    }
    fn hide_update_available(&mut self) {
        self.push(ViewEvent::Hidden);
    }
    fn show_details(&mut self, details: &ReleaseDetails) {
        self.push(ViewEvent::Details(details.clone()));
    }
    fn show_downloading(&mut self) {
        self.push(ViewEvent::Downloading);
    }
    fn show_installing(&mut self) {
        self.push(ViewEvent::Installing);
    }
    fn show_install_progress(&mut self, percent: u8) {
        self.push(ViewEvent::Progress(percent));
    }
    fn show_done(&mut self) {
        self.push(ViewEvent::Done);
    }
}

/// Handles into the fakes so a test can inspect them after handing them over.
pub struct Harness {
    pub calls: Arc<AtomicUsize>,
    pub destinations: Arc<Mutex<Vec<PathBuf>>>,
    pub view: RecordingView,
}

pub struct FakeSetup {
    pub release: Option<ReleaseMetadata>,
    pub download_failures: usize,
    pub extracted_files: Vec<(String, String)>,
    pub extract_fails: bool,
}

impl FakeSetup {
    pub fn new(release: Option<ReleaseMetadata>) -> Self {
        Self {
            release,
            download_failures: 0,
            extracted_files: vec![
                ("packages/demo/script.js".to_string(), "new script".to_string()),
                ("packages/demo/icons/brush.png".to_string(), "new icon".to_string()),
            ],
            extract_fails: false,
        }
    }

    pub fn build(self) -> (Collaborators, Harness) {
        let calls = Arc::new(AtomicUsize::new(0));
        let destinations = Arc::new(Mutex::new(Vec::new()));
        let view = RecordingView::default();

        let collaborators = Collaborators {
            endpoint: Box::new(StaticEndpoint {
                release: self.release,
                calls: calls.clone(),
            }),
            downloader: Box::new(FakeDownloader {
                failures: AtomicUsize::new(self.download_failures),
                destinations: destinations.clone(),
            }),
            extractor: Box::new(FakeExtractor {
                files: self.extracted_files,
                fail: self.extract_fails,
            }),
            view: Box::new(view.clone()),
        };

        (
            collaborators,
            Harness {
                calls,
                destinations,
                view,
            },
        )
    }
}

pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, content) in files {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Relative path → bytes for every file under `root`.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, fs::read(e.path()).unwrap())
        })
        .collect()
}

pub fn dir_is_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

/// A zip archive holding `files` at the given paths.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// GitHub-shaped release JSON with a single zip asset served from `base_url`.
pub fn release_json(base_url: &str, tag: &str) -> serde_json::Value {
    serde_json::json!({
        "tag_name": tag,
        "name": format!("Release {}", tag),
        "body": "- New brushes",
        "assets": [{
            "name": "demo.zip",
            "browser_download_url": format!("{}/download/demo.zip", base_url),
            "size": 1024,
        }],
    })
}
