use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Source folder does not exist: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("Source folder is empty: {}", .0.display())]
    EmptySource(PathBuf),
    #[error("Install directory has no parent: {}", .0.display())]
    NoParent(PathBuf),
    #[error("Could not prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not move new files into {}: {source}", .install_dir.display())]
    Swap {
        install_dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything that can stop an update. None of these escape the orchestrator;
/// they are logged and kept as its last error.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Update server is down: {url}")]
    EndpointUnreachable { url: String },
    #[error("Release {tag} has no downloadable asset")]
    NoUsableAsset { tag: String },
    #[error("Could not create staging area: {0}")]
    Staging(String),
    #[error("Download Failed: {0}")]
    DownloadFailed(String),
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("Source folder does not exist: {}", .0.display())]
    ExtractionMissingPayload(PathBuf),
    #[error("Installation failed: {0}")]
    InstallationFailed(#[from] InstallError),
    #[error("Completion callback failed: {0}")]
    CallbackFailed(String),
}
