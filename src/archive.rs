use anyhow::{anyhow, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tar::Archive;

/// Extraction lifecycle notifications.
pub trait ExtractProgress: Send {
    fn on_start(&mut self);
    fn on_progress(&mut self, percent: u8);
    fn on_end(&mut self);
}

#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Unpack `archive` into `destination`. `on_end` fires only after every entry is written.
    async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        progress: &mut dyn ExtractProgress,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    TarGz,
    TarXz,
}

fn archive_kind(archive_path: &Path) -> Option<ArchiveKind> {
    let name = archive_path.to_string_lossy().to_lowercase();
    if name.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if name.ends_with(".tar.xz") {
        Some(ArchiveKind::TarXz)
    } else {
        None
    }
}

/// Format from the leading magic bytes, for assets without a telling extension.
fn sniff_archive_kind(archive_path: &Path) -> Option<ArchiveKind> {
    let mut header = [0u8; 6];
    let mut file = fs::File::open(archive_path).ok()?;
    let read = file.read(&mut header).ok()?;
    let header = &header[..read];

    if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
        Some(ArchiveKind::Zip)
    } else if header.starts_with(&[0x1f, 0x8b]) {
        Some(ArchiveKind::TarGz)
    } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
        Some(ArchiveKind::TarXz)
    } else {
        None
    }
}

/// Reports whole-percent steps only, so listeners see each value once.
struct PercentTracker<'a> {
    progress: &'a mut dyn ExtractProgress,
    total: usize,
    last: Option<u8>,
}

impl<'a> PercentTracker<'a> {
    fn new(progress: &'a mut dyn ExtractProgress, total: usize) -> Self {
        Self {
            progress,
            total,
            last: None,
        }
    }

    fn advance(&mut self, done: usize) {
        let percent = if self.total == 0 {
            100
        } else {
            ((done.min(self.total) * 100) / self.total) as u8
        };
        if self.last != Some(percent) {
            self.last = Some(percent);
            self.progress.on_progress(percent);
        }
    }
}

pub struct LocalArchiveExtractor;

#[async_trait]
impl ArchiveExtractor for LocalArchiveExtractor {
    async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
        progress: &mut dyn ExtractProgress,
    ) -> Result<()> {
        tracing::info!(
            "Extracting {}...",
            archive
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        );

        let kind = archive_kind(archive)
            .or_else(|| sniff_archive_kind(archive))
            .ok_or_else(|| anyhow!("Unsupported archive format: {}", archive.display()))?;

        fs::create_dir_all(destination)?;
        progress.on_start();

        match kind {
            ArchiveKind::Zip => extract_zip(archive, destination, progress)?,
            ArchiveKind::TarGz => extract_tar(
                || Ok(GzDecoder::new(fs::File::open(archive)?)),
                destination,
                progress,
            )?,
            ArchiveKind::TarXz => extract_tar(
                || Ok(xz2::read::XzDecoder::new(fs::File::open(archive)?)),
                destination,
                progress,
            )?,
        }

        progress.on_end();
        tracing::debug!("Extracted {} into {}", archive.display(), destination.display());
        Ok(())
    }
}

fn extract_zip(
    archive_path: &Path,
    extract_dir: &Path,
    progress: &mut dyn ExtractProgress,
) -> Result<()> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut tracker = PercentTracker::new(progress, archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(relative) = file.enclosed_name().map(|p| p.to_path_buf()) else {
            tracing::warn!("Skipping unsafe path in zip: {}", file.name());
            tracker.advance(i + 1);
            continue;
        };
        let outpath = extract_dir.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = fs::File::create(&outpath)?;
            io::copy(&mut file, &mut outfile)?;
        }
        tracker.advance(i + 1);
    }

    Ok(())
}

/// Tar streams carry no index, so the archive is read once to count entries
/// and a second time to unpack them.
fn extract_tar<R, F>(open: F, extract_dir: &Path, progress: &mut dyn ExtractProgress) -> Result<()>
where
    R: Read,
    F: Fn() -> Result<R>,
{
    let total = Archive::new(open()?).entries()?.count();
    let mut tracker = PercentTracker::new(progress, total);

    let mut archive = Archive::new(open()?);
    for (i, entry) in archive.entries()?.enumerate() {
        let mut entry = entry?;
        // unpack_in refuses entries escaping extract_dir
        if !entry.unpack_in(extract_dir)? {
            tracing::warn!("Skipping unsafe path in tar: {}", entry.path()?.display());
        }
        tracker.advance(i + 1);
    }

    Ok(())
}
