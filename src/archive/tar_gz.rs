use crate::error::ExtractionError;
use crate::runtime::Runtime;
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use std::io;
use std::path::Path;
use tar::Archive;

use super::{ArchiveExtractor, apply_mode, copy_entry, corrupt, io_error, safe_relative_path};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Extractor for .tar.gz / .tgz archives (the npm tarball format)
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn matches_signature(&self, header: &[u8]) -> bool {
        header.starts_with(&GZIP_MAGIC)
    }

    fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<usize, ExtractionError> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .map_err(|e| io_error(archive_path, e.into()))?;
        let mut archive = Archive::new(GzDecoder::new(file));

        let entries = archive
            .entries()
            .map_err(|e| corrupt(archive_path, e.into()))?;

        let mut files = 0;
        for entry in entries {
            let mut entry = entry.map_err(|e| corrupt(archive_path, e.into()))?;
            let entry_path = entry
                .path()
                .map_err(|e| corrupt(archive_path, e.into()))?
                .into_owned();

            let Some(relative) = safe_relative_path(&entry_path) else {
                warn!("Skipping entry with unsafe path {:?}", entry_path);
                continue;
            };
            let full_path = extract_to.join(&relative);

            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                runtime
                    .create_dir_all(&full_path)
                    .map_err(|e| io_error(&full_path, e.into()))?;
                continue;
            }
            if !entry_type.is_file() {
                debug!("Skipping {:?} entry {:?}", entry_type, entry_path);
                continue;
            }

            if let Some(parent) = full_path.parent() {
                runtime
                    .create_dir_all(parent)
                    .map_err(|e| io_error(parent, e.into()))?;
            }
            {
                let mut dest = runtime
                    .create_file(&full_path)
                    .map_err(|e| io_error(&full_path, e.into()))?;
                copy_entry(&mut entry, &mut dest, archive_path, &full_path)?;
            }

            if let Ok(mode) = entry.header().mode() {
                apply_mode(runtime, &full_path, mode);
            }
            files += 1;
        }

        // The tar reader stops at the end-of-archive block, before the gzip
        // trailer, so drain the decoder to run its CRC and length checks.
        let mut decoder = archive.into_inner();
        io::copy(&mut decoder, &mut io::sink()).map_err(|e| corrupt(archive_path, e.into()))?;

        info!("Extracted {} files.", files);
        Ok(files)
    }
}
