mod tar_gz;
mod zip;

use crate::error::{BoxError, ExtractionError};
use crate::runtime::Runtime;
use log::debug;
use std::io::{ErrorKind, Read, Write};
use std::path::{Component, Path, PathBuf};

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// Number of leading bytes inspected to recognize a format.
const SIGNATURE_LEN: u64 = 4;

/// Trait for format-specific archive extractors
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive by its file name
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Check if the leading bytes of an archive belong to this format
    fn matches_signature(&self, header: &[u8]) -> bool;

    /// Extract the archive into `extract_to`, returning the number of files
    /// written. Existing files with the same name are overwritten.
    fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<usize, ExtractionError>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
/// Content signatures take precedence over the file extension.
pub struct ArchiveExtractorImpl {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl Default for ArchiveExtractorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzExtractor,
            zip: ZipExtractor,
        }
    }

    fn read_signature<R: Runtime>(
        runtime: &R,
        archive_path: &Path,
    ) -> Result<Vec<u8>, ExtractionError> {
        let reader = runtime
            .open(archive_path)
            .map_err(|e| io_error(archive_path, e.into()))?;
        let mut header = Vec::with_capacity(SIGNATURE_LEN as usize);
        reader
            .take(SIGNATURE_LEN)
            .read_to_end(&mut header)
            .map_err(|e| io_error(archive_path, e.into()))?;
        Ok(header)
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path) || self.zip.can_handle(archive_path)
    }

    fn matches_signature(&self, header: &[u8]) -> bool {
        self.tar_gz.matches_signature(header) || self.zip.matches_signature(header)
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<usize, ExtractionError> {
        let header = Self::read_signature(runtime, archive_path)?;

        let files = if self.tar_gz.matches_signature(&header) {
            self.tar_gz.extract(runtime, archive_path, extract_to)?
        } else if self.zip.matches_signature(&header) {
            self.zip.extract(runtime, archive_path, extract_to)?
        } else if self.tar_gz.can_handle(archive_path) {
            debug!("No known signature, trying tar.gz by extension");
            self.tar_gz.extract(runtime, archive_path, extract_to)?
        } else if self.zip.can_handle(archive_path) {
            debug!("No known signature, trying zip by extension");
            self.zip.extract(runtime, archive_path, extract_to)?
        } else {
            return Err(ExtractionError::UnsupportedFormat {
                path: archive_path.to_path_buf(),
            });
        };

        if files == 0 {
            return Err(ExtractionError::Empty {
                path: archive_path.to_path_buf(),
            });
        }
        Ok(files)
    }
}

/// Joinable relative path for an archive entry, or `None` if the entry is
/// absolute or climbs out of the extraction directory.
pub(crate) fn safe_relative_path(entry_path: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in entry_path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Copies one entry, attributing read failures to the archive and write
/// failures to the destination.
pub(crate) fn copy_entry(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    archive_path: &Path,
    dest: &Path,
) -> Result<u64, ExtractionError> {
    let mut buf = [0u8; 8 * 1024];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(corrupt(archive_path, e.into())),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| io_error(dest, e.into()))?;
        copied += n as u64;
    }
    writer.flush().map_err(|e| io_error(dest, e.into()))?;
    Ok(copied)
}

/// Applies archived permission bits, keeping the owner able to overwrite the
/// file on a later reinstall.
pub(crate) fn apply_mode<R: Runtime>(runtime: &R, path: &Path, mode: u32) {
    if let Err(e) = runtime.set_permissions(path, (mode & 0o777) | 0o600) {
        debug!("Failed to set permissions on {:?}: {}", path, e);
    }
}

pub(crate) fn corrupt(archive_path: &Path, source: BoxError) -> ExtractionError {
    ExtractionError::Corrupt {
        path: archive_path.to_path_buf(),
        source,
    }
}

pub(crate) fn io_error(path: &Path, source: BoxError) -> ExtractionError {
    ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    }
}
