use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch space for one update attempt: `download/` holds the archive,
/// `extracted/` its contents. Removed when dropped.
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn create(root: &Path, package_name: &str) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Could not create staging root {}", root.display()))?;

        let prefix = format!("{}-update-", sanitize(package_name));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(root)
            .with_context(|| format!("Could not create staging directory in {}", root.display()))?;

        std::fs::create_dir_all(dir.path().join("download"))?;
        std::fs::create_dir_all(dir.path().join("extracted"))?;
        tracing::debug!("Staging directory: {}", dir.path().display());

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join("download").join(file_name)
    }

    pub fn extract_dir(&self) -> PathBuf {
        self.dir.path().join("extracted")
    }

    /// Delete the staging area now, logging instead of failing.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!("Removed staging directory {}", path.display()),
            Err(e) => tracing::warn!(
                "Could not remove staging directory {}: {}",
                path.display(),
                e
            ),
        }
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "package".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_areas_do_not_collide() {
        let root = TempDir::new().unwrap();
        let first = StagingArea::create(root.path(), "demo").unwrap();
        let second = StagingArea::create(root.path(), "demo").unwrap();

        assert_ne!(first.path(), second.path());
        assert!(first.extract_dir().is_dir());
        assert!(first.archive_path("update.zip").starts_with(first.path()));
    }

    #[test]
    fn test_close_removes_directory() {
        let root = TempDir::new().unwrap();
        let staging = StagingArea::create(root.path(), "my package").unwrap();
        let path = staging.path().to_path_buf();
        std::fs::write(staging.extract_dir().join("file"), b"x").unwrap();

        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("my_package-update-"));

        staging.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = TempDir::new().unwrap();
        let path = {
            let staging = StagingArea::create(root.path(), "demo").unwrap();
            staging.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
