use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::path::PathBuf;

use crate::{
    application::{InstallOrchestrator, ProgressSink},
    archive::ArchiveExtractorImpl,
    download::HttpDownloader,
    http::HttpClient,
    install::ArchiveInstaller,
    registry::Registry,
    runtime::Runtime,
};

const USER_AGENT: &str = "jsaddon-cli";

/// Settings shared by every subcommand. Unset values fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub root: Option<PathBuf>,
    pub registry_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

pub type Orchestrator<R, P> =
    InstallOrchestrator<Registry, HttpDownloader<R>, R, ArchiveExtractorImpl, P>;

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub http_client: HttpClient,
    pub registry_url: Option<String>,
    pub managed_root: PathBuf,
    pub scratch_dir: PathBuf,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, options: Options) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        let managed_root = match options.root {
            Some(root) => root,
            None => default_managed_root(&runtime)?,
        };
        let scratch_dir = options
            .cache_dir
            .unwrap_or_else(|| default_scratch_dir(&runtime));
        debug!(
            "Using managed root {:?} and scratch dir {:?}",
            managed_root, scratch_dir
        );

        Ok(Self {
            runtime,
            http_client: HttpClient::new(client),
            registry_url: options.registry_url,
            managed_root,
            scratch_dir,
        })
    }

    pub fn registry(&self) -> Registry {
        Registry::new(self.http_client.clone(), self.registry_url.clone())
    }
}

impl<R: Runtime + Clone> Config<R> {
    pub fn into_orchestrator<P: ProgressSink>(self, sink: P) -> Orchestrator<R, P> {
        let registry = self.registry();
        let downloader =
            HttpDownloader::new(self.runtime.clone(), self.http_client, self.scratch_dir);
        let installer =
            ArchiveInstaller::new(self.runtime, ArchiveExtractorImpl::new(), self.managed_root);
        InstallOrchestrator::new(registry, downloader, installer, sink)
    }
}

/// `~/.jsaddon/addons`
pub fn default_managed_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home = runtime
        .home_dir()
        .context("Could not find home directory; pass --root")?;
    Ok(home.join(".jsaddon").join("addons"))
}

/// Per-user cache directory, or the system temp directory without one.
pub fn default_scratch_dir<R: Runtime>(runtime: &R) -> PathBuf {
    runtime
        .cache_dir()
        .unwrap_or_else(|| runtime.temp_dir())
        .join("jsaddon")
}
