//! Replacement of a live installation directory
//!
//! The new tree is copied next to the install directory first and swapped in
//! with two renames, so a failed copy never leaves a half-deleted
//! installation behind. When the parent directory is not writable the
//! install directory is emptied and refilled in place instead. Individual file copy failures are logged and reported
//! but do not stop the copy.

use crate::error::InstallError;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub copied: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct InstallationReplacer {
    install_dir: PathBuf,
}

impl InstallationReplacer {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Make the install directory's contents an exact copy of `new_content_dir`.
    pub fn replace(&self, new_content_dir: &Path) -> Result<InstallReport, InstallError> {
        if !new_content_dir.is_dir() {
            return Err(InstallError::MissingSource(new_content_dir.to_path_buf()));
        }
        let has_entries = fs::read_dir(new_content_dir)
            .map_err(|source| io_error(new_content_dir, source))?
            .next()
            .is_some();
        if !has_entries {
            return Err(InstallError::EmptySource(new_content_dir.to_path_buf()));
        }

        let install_dir =
            absolute_path(&self.install_dir).map_err(|source| io_error(&self.install_dir, source))?;
        let parent = install_dir
            .parent()
            .ok_or_else(|| InstallError::NoParent(install_dir.clone()))?;
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;

        let dir_name = install_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "install".to_string());

        let incoming = match sibling_dir(parent, &format!(".{}-incoming-", dir_name)) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                tracing::warn!(
                    "Cannot write to {}, replacing {} in place",
                    parent.display(),
                    install_dir.display()
                );
                return replace_in_place(&install_dir, new_content_dir);
            }
            Err(source) => return Err(io_error(parent, source)),
        };
        let report = copy_tree(new_content_dir, incoming.path());
        tracing::info!(
            "Copied {} file(s) into {}",
            report.copied.len(),
            incoming.path().display()
        );

        let retired = if install_dir.exists() {
            let holder = sibling_dir(parent, &format!(".{}-retired-", dir_name))
                .map_err(|source| io_error(parent, source))?;
            let previous = holder.path().join("previous");
            fs::rename(&install_dir, &previous).map_err(|source| io_error(&install_dir, source))?;
            Some((holder, previous))
        } else {
            None
        };

        if let Err(source) = fs::rename(incoming.path(), &install_dir) {
            if let Some((_, previous)) = &retired {
                if let Err(e) = fs::rename(previous, &install_dir) {
                    tracing::error!(
                        "Could not restore previous installation from {}: {}",
                        previous.display(),
                        e
                    );
                }
            }
            return Err(InstallError::Swap { install_dir, source });
        }
        // The incoming guard now points at a moved path; dropping it is a no-op.
        drop(incoming);

        if let Some((holder, _)) = retired {
            let holder_path = holder.path().to_path_buf();
            if let Err(e) = holder.close() {
                tracing::warn!(
                    "Could not remove previous installation at {}: {}",
                    holder_path.display(),
                    e
                );
            }
        }

        Ok(report)
    }
}

/// Empty `install_dir` and copy `new_content_dir` into it. Used when the
/// parent directory cannot hold the swap siblings.
fn replace_in_place(install_dir: &Path, new_content_dir: &Path) -> Result<InstallReport, InstallError> {
    if install_dir.is_dir() {
        let entries = fs::read_dir(install_dir).map_err(|source| io_error(install_dir, source))?;
        for entry in entries {
            let path = entry.map_err(|source| io_error(install_dir, source))?.path();
            let removed = if path.is_dir() && !path.is_symlink() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|source| io_error(&path, source))?;
            tracing::debug!("Removed: {}", path.display());
        }
    }
    Ok(copy_tree(new_content_dir, install_dir))
}

/// `path` made absolute against the working directory, with `.` and `..`
/// resolved lexically.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    Ok(normalize(&std::env::current_dir()?.join(path)))
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn sibling_dir(parent: &Path, prefix: &str) -> io::Result<tempfile::TempDir> {
    tempfile::Builder::new().prefix(prefix).tempdir_in(parent)
}

fn io_error(path: &Path, source: io::Error) -> InstallError {
    InstallError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Copy every file and directory under `source` into `destination`,
/// preserving relative paths. Failures are recorded per entry.
pub fn copy_tree(source: &Path, destination: &Path) -> InstallReport {
    let mut report = InstallReport::default();

    if let Err(e) = fs::create_dir_all(destination) {
        tracing::warn!("Could not create {}: {}", destination.display(), e);
        report.failed.push(destination.to_path_buf());
        return report;
    }

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                tracing::warn!("Could not read {}: {}", path.display(), e);
                report.failed.push(path);
                continue;
            }
        };

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            if let Err(e) = fs::create_dir_all(&target) {
                tracing::warn!("Error creating folder {}: {}", target.display(), e);
                report.failed.push(target);
            }
            continue;
        }

        match fs::copy(entry.path(), &target) {
            Ok(_) => {
                tracing::debug!("File copied: {}", target.display());
                report.copied.push(target);
            }
            Err(e) => {
                tracing::warn!("Error copying file {}: {}", target.display(), e);
                report.failed.push(target);
            }
        }
    }

    report
}
