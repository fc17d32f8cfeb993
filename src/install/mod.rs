use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::{
    archive::ArchiveExtractor, cleanup::ScratchFileGuard, error::ExtractionError,
    package::PackageName, runtime::Runtime,
};

/// Unpacks downloaded archives into `<managed root>/<package id>`.
///
/// The consumed archive is removed whether or not extraction succeeds. On
/// failure, whatever was already written to the target stays there.
pub struct ArchiveInstaller<R: Runtime, E: ArchiveExtractor> {
    runtime: R,
    extractor: E,
    managed_root: PathBuf,
}

impl<R: Runtime, E: ArchiveExtractor> ArchiveInstaller<R, E> {
    pub fn new(runtime: R, extractor: E, managed_root: PathBuf) -> Self {
        Self {
            runtime,
            extractor,
            managed_root,
        }
    }

    pub fn managed_root(&self) -> &Path {
        &self.managed_root
    }

    /// Target directory for a package. Always a direct child of the root.
    pub fn package_dir(&self, id: &PackageName) -> PathBuf {
        self.managed_root.join(id.as_str())
    }

    #[tracing::instrument(skip(self))]
    pub fn install(
        &self,
        archive_path: &Path,
        package_id: &str,
    ) -> Result<PathBuf, ExtractionError> {
        let _archive = ScratchFileGuard::new(&self.runtime, archive_path);

        let id = PackageName::parse(package_id)?;
        let target = self.package_dir(&id);
        debug!("Installing {} into {:?}", id, target);

        self.runtime
            .create_dir_all(&target)
            .map_err(|e| ExtractionError::Io {
                path: target.clone(),
                source: e.into(),
            })?;

        match self.extractor.extract(&self.runtime, archive_path, &target) {
            Ok(files) => {
                info!("Installed {} ({} files) to {:?}", id, files, target);
                Ok(target)
            }
            Err(e) => {
                warn!(
                    "Extraction of {} failed, partial output left in {:?}",
                    id, target
                );
                Err(e)
            }
        }
    }
}
