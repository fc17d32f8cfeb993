use crate::error::ExtractionError;
use crate::runtime::Runtime;
use log::{debug, info, warn};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::{ArchiveExtractor, apply_mode, copy_entry, corrupt, io_error};

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Extractor for .zip archives
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".zip")
    }

    fn matches_signature(&self, header: &[u8]) -> bool {
        header.starts_with(&ZIP_MAGIC)
    }

    fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<usize, ExtractionError> {
        debug!("Extracting zip archive to {:?}...", extract_to);
        let mut file = runtime
            .open(archive_path)
            .map_err(|e| io_error(archive_path, e.into()))?;

        // zip needs Read + Seek, but Runtime::open returns Box<dyn Read + Send>
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|e| io_error(archive_path, e.into()))?;

        let mut archive = ZipArchive::new(std::io::Cursor::new(buffer))
            .map_err(|e| corrupt(archive_path, e.into()))?;

        let mut files = 0;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| corrupt(archive_path, e.into()))?;

            let Some(entry_path) = entry.enclosed_name() else {
                warn!("Skipping entry with unsafe path {:?}", entry.name());
                continue;
            };
            let full_path = extract_to.join(&entry_path);

            if entry.is_dir() {
                runtime
                    .create_dir_all(&full_path)
                    .map_err(|e| io_error(&full_path, e.into()))?;
                continue;
            }
            if entry
                .unix_mode()
                .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
            {
                debug!("Skipping symlink entry {:?}", entry_path);
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

            if let Some(mode) = entry.unix_mode() {
                apply_mode(runtime, &full_path, mode);
            }
            files += 1;
        }

        info!("Extracted {} files.", files);
        Ok(files)
    }
}
