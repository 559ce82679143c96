//! Update orchestration
//!
//! [`UpdateOrchestrator`] checks for a release when it is built and, if one is
//! newer, walks the user through details → download → extract → install →
//! done. Each step is awaited before the next begins. Failures never reach
//! the caller: they are logged, remembered as [`UpdateOrchestrator::last_error`]
//! and the view falls back to the release details so the user can try again.

use crate::archive::{ArchiveExtractor, ExtractProgress, LocalArchiveExtractor};
use crate::download::{asset_file_name, Downloader, HttpDownloader};
use crate::error::UpdateError;
use crate::install::InstallationReplacer;
use crate::release::{HttpReleaseEndpoint, ReleaseClient, ReleaseEndpoint};
use crate::staging::StagingArea;
use crate::types::{PackageInfo, ReleaseDetails, UpdaterSettings};
use crate::ui::UpdateView;
use crate::version::is_newer;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Checking,
    /// The remote release is not newer. Terminal.
    UpToDate,
    /// No metadata or no downloadable asset. Terminal.
    Failed,
    UpdateAvailable,
    AwaitingUserConfirmation,
    Downloading,
    Extracting,
    Installing,
    Done,
}

/// Runs after the user dismisses the completion view.
pub type CompletionCallback = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// Capabilities the orchestrator drives.
pub struct Collaborators {
    pub endpoint: Box<dyn ReleaseEndpoint>,
    pub downloader: Box<dyn Downloader>,
    pub extractor: Box<dyn ArchiveExtractor>,
    pub view: Box<dyn UpdateView>,
}

impl Collaborators {
    /// GitHub endpoint, HTTP downloader and local archive extraction.
    pub fn http(settings: &UpdaterSettings, view: Box<dyn UpdateView>) -> Self {
        Self {
            endpoint: Box::new(HttpReleaseEndpoint::new(&settings.user_agent)),
            downloader: Box::new(HttpDownloader::new(
                &settings.user_agent,
                settings.show_progress,
            )),
            extractor: Box::new(LocalArchiveExtractor),
            view,
        }
    }
}

pub struct UpdateOrchestrator {
    package: PackageInfo,
    settings: UpdaterSettings,
    release: ReleaseClient,
    downloader: Box<dyn Downloader>,
    extractor: Box<dyn ArchiveExtractor>,
    view: Box<dyn UpdateView>,
    state: UpdateState,
    on_complete: Option<CompletionCallback>,
    last_error: Option<UpdateError>,
}

impl UpdateOrchestrator {
    /// Build the orchestrator and run the update check.
    pub async fn new(
        package: PackageInfo,
        settings: UpdaterSettings,
        collaborators: Collaborators,
        on_complete: Option<CompletionCallback>,
    ) -> Self {
        let Collaborators {
            endpoint,
            downloader,
            extractor,
            view,
        } = collaborators;
        let release = ReleaseClient::new(endpoint, package.api_url.clone());

        let mut orchestrator = Self {
            package,
            settings,
            release,
            downloader,
            extractor,
            view,
            state: UpdateState::Idle,
            on_complete,
            last_error: None,
        };
        orchestrator.check().await;
        orchestrator
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn package(&self) -> &PackageInfo {
        &self.package
    }

    pub fn is_update_available(&self) -> bool {
        matches!(
            self.state,
            UpdateState::UpdateAvailable
                | UpdateState::AwaitingUserConfirmation
                | UpdateState::Downloading
                | UpdateState::Extracting
                | UpdateState::Installing
        )
    }

    pub fn remote_version(&self) -> Option<&str> {
        self.release.version_tag()
    }

    pub fn last_error(&self) -> Option<&UpdateError> {
        self.last_error.as_ref()
    }

    async fn check(&mut self) {
        self.state = UpdateState::Checking;

        let checked = match self.release.latest_release().await {
            None => Err(UpdateError::EndpointUnreachable {
                url: self.release.url().to_string(),
            }),
            Some(release) if release.primary_asset().is_none() => Err(UpdateError::NoUsableAsset {
                tag: release.tag_name.clone(),
            }),
            Some(release) => Ok(release.tag_name.clone()),
        };
        let tag = match checked {
            Ok(tag) => tag,
            Err(error) => {
                self.fail_check(error);
                return;
            }
        };

        if is_newer(&self.package.version, &tag) {
            self.log(&format!(
                "New Update Found | v{} to v{}",
                self.package.version, tag
            ));
            self.state = UpdateState::UpdateAvailable;
            let label = format!("{} v{} → v{}", self.package.full_name(), self.package.version, tag);
            self.view.show_update_available(&label);
        } else {
            self.log("No Updates found.");
            self.state = UpdateState::UpToDate;
        }
    }

    fn fail_check(&mut self, error: UpdateError) {
        tracing::warn!("Update server is down: {}", error);
        self.state = UpdateState::Failed;
        self.last_error = Some(error);
    }

    /// The user triggered the update affordance.
    pub fn open_details(&mut self) {
        match self.state {
            UpdateState::UpdateAvailable | UpdateState::AwaitingUserConfirmation => {
                self.show_details();
            }
            state => self.log(&format!("Ignoring update details request while {:?}", state)),
        }
    }

    fn show_details(&mut self) {
        let details = ReleaseDetails {
            title: format!("{} Update Available", self.package.short_name()),
            version_label: format!("New Version: {}", self.release.version_tag().unwrap_or("")),
            changelog: self.release.changelog().to_string(),
        };
        self.state = UpdateState::AwaitingUserConfirmation;
        self.view.show_details(&details);
    }

    /// The user confirmed the update. Runs download, extraction and install,
    /// and returns the resulting state.
    pub async fn confirm(&mut self) -> UpdateState {
        if self.state != UpdateState::AwaitingUserConfirmation {
            self.log(&format!("Ignoring update confirmation while {:?}", self.state));
            return self.state;
        }
        self.last_error = None;

        match self.run_session().await {
            Ok(()) => {
                self.state = UpdateState::Done;
                self.view.show_done();
                self.view.hide_update_available();
                self.log("Updated Successfully");
            }
            Err(error) => {
                tracing::error!("[ {} ] > Update failed: {}", self.package.full_name(), error);
                self.last_error = Some(error);
                self.show_details();
            }
        }
        self.state
    }

    async fn run_session(&mut self) -> Result<(), UpdateError> {
        self.log("Downloading Update...");
        self.state = UpdateState::Downloading;
        self.view.show_downloading();

        let (url, file_name) = match (self.release.download_url(), self.release.asset_name()) {
            (Some(url), Some(name)) => (url.to_string(), asset_file_name(name, url)),
            _ => {
                return Err(UpdateError::NoUsableAsset {
                    tag: self.release.version_tag().unwrap_or("").to_string(),
                })
            }
        };

        let staging = StagingArea::create(&self.settings.staging_dir, &self.package.name)
            .map_err(|e| UpdateError::Staging(format!("{:#}", e)))?;

        // The staging area is removed on every path out of here.
        let result = self.install_from(&staging, &url, &file_name).await;
        staging.close();
        result
    }

    async fn install_from(
        &mut self,
        staging: &StagingArea,
        url: &str,
        file_name: &str,
    ) -> Result<(), UpdateError> {
        let archive = self
            .downloader
            .download(url, &staging.archive_path(file_name))
            .await
            .map_err(|e| UpdateError::DownloadFailed(format!("{:#}", e)))?;

        self.log("Installing Update...");
        self.log(&format!("Source File: {}", archive.display()));
        self.log(&format!("Destination: {}", staging.extract_dir().display()));
        self.state = UpdateState::Extracting;

        let mut progress = ViewProgress {
            view: self.view.as_mut(),
            package: &self.package,
        };
        self.extractor
            .extract(&archive, &staging.extract_dir(), &mut progress)
            .await
            .map_err(|e| UpdateError::ExtractionFailed(format!("{:#}", e)))?;

        let payload = staging.extract_dir().join(self.package.payload_subdir());
        if !payload.is_dir() {
            self.log("Source folder does not exist.");
            return Err(UpdateError::ExtractionMissingPayload(payload));
        }

        self.state = UpdateState::Installing;
        let report = InstallationReplacer::new(&self.package.install_dir).replace(&payload)?;
        if !report.is_complete() {
            tracing::warn!(
                "[ {} ] > {} file(s) could not be copied into {}",
                self.package.full_name(),
                report.failed.len(),
                self.package.install_dir.display()
            );
        }
        Ok(())
    }

    /// The user closed the completion view. Runs the completion callback once.
    pub fn dismiss(&mut self) {
        if self.state != UpdateState::Done {
            self.log(&format!("Ignoring dismiss while {:?}", self.state));
            return;
        }
        let Some(callback) = self.on_complete.take() else {
            return;
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{:#}", e)),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        if let Some(message) = outcome {
            tracing::error!("Completion callback failed: {}", message);
            self.last_error = Some(UpdateError::CallbackFailed(message));
        }
    }

    fn log(&self, message: &str) {
        log_for(&self.package, message);
    }
}

fn log_for(package: &PackageInfo, message: &str) {
    if package.debug {
        tracing::info!("[ {} ] > {}", package.full_name(), message);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}

struct ViewProgress<'a> {
    view: &'a mut dyn UpdateView,
    package: &'a PackageInfo,
}

impl ExtractProgress for ViewProgress<'_> {
    fn on_start(&mut self) {
        self.view.show_installing();
    }

    fn on_progress(&mut self, percent: u8) {
        log_for(self.package, &format!("Progress > {}%", percent));
        self.view.show_install_progress(percent);
    }

    fn on_end(&mut self) {
        log_for(self.package, "Extraction finished");
    }
}
