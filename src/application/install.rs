//! Install use case - runs one addon through metadata, download and
//! extraction, reporting progress to a [`ProgressSink`].
//!
//! Installs of different names may run concurrently. Installs of the same
//! name are queued so they never write into the same directory at once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::archive::ArchiveExtractor;
use crate::download::Downloader;
use crate::error::{InstallError, MetadataError, Stage};
use crate::install::ArchiveInstaller;
use crate::package::{PackageDescriptor, PackageName, Rejection, rejection_reason};
use crate::registry::DescriptorSource;
use crate::runtime::Runtime;

/// Receives progress and the terminal result of each install.
///
/// Exactly one of `on_installed`, `on_rejected` or `on_failed` is called per
/// install. Implementations may be called from several installs at once.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressSink: Send + Sync {
    fn on_start(&self, name: &str, stage: Stage);
    fn on_finish(&self, name: &str, stage: Stage);
    fn on_installed(&self, descriptor: &PackageDescriptor, path: &Path);
    fn on_rejected(&self, name: &str, reason: &Rejection);
    fn on_failed(&self, name: &str, stage: Stage, error: &InstallError);
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn on_start(&self, name: &str, stage: Stage) {
        (**self).on_start(name, stage)
    }

    fn on_finish(&self, name: &str, stage: Stage) {
        (**self).on_finish(name, stage)
    }

    fn on_installed(&self, descriptor: &PackageDescriptor, path: &Path) {
        (**self).on_installed(descriptor, path)
    }

    fn on_rejected(&self, name: &str, reason: &Rejection) {
        (**self).on_rejected(name, reason)
    }

    fn on_failed(&self, name: &str, stage: Stage, error: &InstallError) {
        (**self).on_failed(name, stage, error)
    }
}

/// Terminal result of one install.
#[derive(Debug)]
pub enum InstallOutcome {
    Installed {
        descriptor: PackageDescriptor,
        path: PathBuf,
    },
    Rejected {
        name: String,
        reason: Rejection,
    },
    Failed {
        name: String,
        stage: Stage,
        error: InstallError,
    },
}

impl InstallOutcome {
    fn failed(name: &str, error: impl Into<InstallError>) -> Self {
        let error = error.into();
        InstallOutcome::Failed {
            name: name.to_string(),
            stage: error.stage(),
            error,
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, InstallOutcome::Installed { .. })
    }
}

/// One lock per package name; entries nobody is waiting on are pruned.
#[derive(Default)]
struct InstallQueue {
    locks: Mutex<HashMap<PackageName, Arc<AsyncMutex<()>>>>,
}

impl InstallQueue {
    async fn acquire(&self, name: &PackageName) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(name.clone()).or_default().clone()
        };
        if lock.try_lock().is_err() {
            debug!("Install of {} already in progress, waiting", name);
        }
        lock.lock_owned().await
    }
}

/// Coordinates the registry, the downloader and the installer for one addon
/// at a time. The orchestrator holds no per-install state, so a single
/// instance serves any number of concurrent installs.
pub struct InstallOrchestrator<S, D, R, E, P>
where
    S: DescriptorSource,
    D: Downloader,
    R: Runtime,
    E: ArchiveExtractor,
    P: ProgressSink,
{
    registry: S,
    downloader: D,
    installer: ArchiveInstaller<R, E>,
    sink: P,
    queue: InstallQueue,
}

impl<S, D, R, E, P> InstallOrchestrator<S, D, R, E, P>
where
    S: DescriptorSource,
    D: Downloader,
    R: Runtime,
    E: ArchiveExtractor,
    P: ProgressSink,
{
    pub fn new(registry: S, downloader: D, installer: ArchiveInstaller<R, E>, sink: P) -> Self {
        Self {
            registry,
            downloader,
            installer,
            sink,
            queue: InstallQueue::default(),
        }
    }

    pub fn managed_root(&self) -> &Path {
        self.installer.managed_root()
    }

    /// Installs the latest published version of `name`.
    #[tracing::instrument(skip(self))]
    pub async fn install(&self, name: &str) -> InstallOutcome {
        let outcome = match PackageName::parse(name) {
            Ok(package) => {
                let _turn = self.queue.acquire(&package).await;
                self.run(&package).await
            }
            Err(e) => InstallOutcome::failed(name, MetadataError::from(e)),
        };
        self.report(&outcome);
        outcome
    }

    async fn run(&self, package: &PackageName) -> InstallOutcome {
        let name = package.as_str();

        self.sink.on_start(name, Stage::Metadata);
        let fetched = self.registry.fetch_descriptor(package).await;
        self.sink.on_finish(name, Stage::Metadata);
        let descriptor = match fetched {
            Ok(descriptor) => descriptor,
            Err(e) => return InstallOutcome::failed(name, e),
        };

        if let Some(reason) = rejection_reason(&descriptor) {
            return InstallOutcome::Rejected {
                name: name.to_string(),
                reason,
            };
        }
        let Some(tarball) = descriptor.tarball_url().map(str::to_owned) else {
            return InstallOutcome::Rejected {
                name: name.to_string(),
                reason: Rejection::MissingTarball,
            };
        };

        self.sink.on_start(name, Stage::Download);
        let downloaded = self.downloader.fetch(&tarball).await;
        self.sink.on_finish(name, Stage::Download);
        let archive = match downloaded {
            Ok(archive) => archive,
            Err(e) => return InstallOutcome::failed(name, e),
        };

        self.sink.on_start(name, Stage::Extraction);
        let installed = self.installer.install(&archive, name);
        self.sink.on_finish(name, Stage::Extraction);
        match installed {
            Ok(path) => InstallOutcome::Installed { descriptor, path },
            Err(e) => InstallOutcome::failed(name, e),
        }
    }

    fn report(&self, outcome: &InstallOutcome) {
        match outcome {
            InstallOutcome::Installed { descriptor, path } => {
                info!("Installed {} to {:?}", descriptor.display_name(), path);
                self.sink.on_installed(descriptor, path);
            }
            InstallOutcome::Rejected { name, reason } => {
                info!("Rejected {}: {}", name, reason);
                self.sink.on_rejected(name, reason);
            }
            InstallOutcome::Failed { name, stage, error } => {
                warn!("Install of {} failed during {}: {}", name, stage, error);
                self.sink.on_failed(name, *stage, error);
            }
        }
    }
}
