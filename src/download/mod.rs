use anyhow::Context;
use async_trait::async_trait;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DownloadError;
use crate::http::{HttpClient, HttpError};
use crate::runtime::Runtime;

/// Name used when the URL has no usable last path segment.
const FALLBACK_FILE_NAME: &str = "package.tgz";

static NEXT_SCRATCH_ID: AtomicU64 = AtomicU64::new(0);

/// Brings a remote archive to local scratch storage.
///
/// The returned file belongs to the caller, which is responsible for
/// removing it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PathBuf, DownloadError>;
}

/// Downloads over HTTP into a scratch directory.
pub struct HttpDownloader<R: Runtime> {
    runtime: R,
    http_client: HttpClient,
    scratch_dir: PathBuf,
}

impl<R: Runtime> HttpDownloader<R> {
    pub fn new(runtime: R, http_client: HttpClient, scratch_dir: PathBuf) -> Self {
        Self {
            runtime,
            http_client,
            scratch_dir,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    fn discard_partial(&self, path: &Path) {
        if self.runtime.exists(path)
            && let Err(e) = self.runtime.remove_file(path)
        {
            warn!("Failed to remove partial download {:?}: {}", path, e);
        }
    }
}

#[async_trait]
impl<R: Runtime> Downloader for HttpDownloader<R> {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<PathBuf, DownloadError> {
        info!("Downloading {}...", url);

        self.runtime
            .create_dir_all(&self.scratch_dir)
            .map_err(|e| DownloadError::Io {
                path: self.scratch_dir.clone(),
                source: e.into(),
            })?;

        let path = self.scratch_dir.join(scratch_file_name(url));
        let result = self
            .http_client
            .download_file(url, || {
                self.runtime
                    .create_file(&path)
                    .with_context(|| format!("Failed to create scratch file at {:?}", path))
            })
            .await;

        match result {
            Ok(bytes) => {
                info!("Download complete ({} bytes).", bytes);
                Ok(path)
            }
            Err(e) => {
                self.discard_partial(&path);
                Err(classify(url, path, e))
            }
        }
    }
}

fn classify(url: &str, path: PathBuf, error: HttpError) -> DownloadError {
    match error {
        HttpError::Write(source) => DownloadError::Io {
            path,
            source: Box::new(source),
        },
        source @ HttpError::Status { .. } => DownloadError::Status {
            url: url.to_string(),
            source,
        },
        source => DownloadError::Transport {
            url: url.to_string(),
            source,
        },
    }
}

/// Unique per call, keeping the URL's file name so the extension survives.
fn scratch_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let last_segment = without_query.rsplit('/').next().unwrap_or_default();
    let sanitized: String = last_segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let file_name = if sanitized.is_empty() || sanitized.starts_with('.') {
        FALLBACK_FILE_NAME
    } else {
        sanitized.as_str()
    };

    format!(
        "{}-{}-{}",
        std::process::id(),
        NEXT_SCRATCH_ID.fetch_add(1, Ordering::Relaxed),
        file_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use reqwest::Client;
    use tempfile::tempdir;

    #[test]
    fn test_scratch_file_name_keeps_extension() {
        let name = scratch_file_name(
            "https://registry.npmjs.org/my-addon/-/my-addon-1.0.0.tgz?cache=no",
        );
        assert!(name.ends_with("-my-addon-1.0.0.tgz"), "{name}");
        assert!(name.starts_with(&format!("{}-", std::process::id())));
    }

    #[test]
    fn test_scratch_file_name_is_unique() {
        let a = scratch_file_name("https://example.com/a.tgz");
        let b = scratch_file_name("https://example.com/a.tgz");
        assert_ne!(a, b);
    }

    #[test]
    fn test_scratch_file_name_sanitizes_segment() {
        assert!(scratch_file_name("https://example.com/").ends_with(FALLBACK_FILE_NAME));
        assert!(scratch_file_name("https://example.com/..").ends_with(FALLBACK_FILE_NAME));
        assert!(!scratch_file_name("https://example.com/a%2F..%2Fb.tgz").contains('/'));
    }

    #[tokio::test]
    async fn test_fetch_with_mock_runtime() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/addon-1.0.0.tgz")
            .with_status(200)
            .with_body("archive bytes")
            .create_async()
            .await;

        let scratch = PathBuf::from("/scratch");
        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_dir_all()
            .with(eq(scratch.clone()))
            .times(1)
            .returning(|_| Ok(()));
        runtime
            .expect_create_file()
            .withf(|path| path.starts_with("/scratch") && path.to_string_lossy().ends_with(".tgz"))
            .times(1)
            .returning(|_| Ok(Box::new(std::io::sink())));

        let downloader = HttpDownloader::new(runtime, HttpClient::new(Client::new()), scratch);
        let path = downloader
            .fetch(&format!("{}/addon-1.0.0.tgz", url))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(path.starts_with("/scratch"));
        assert!(path.to_string_lossy().ends_with("addon-1.0.0.tgz"));
    }

    #[tokio::test]
    async fn test_fetch_writes_body_to_scratch_dir() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/addon.tgz")
            .with_status(200)
            .with_body("archive bytes")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let scratch = dir.path().join("cache");
        let downloader = HttpDownloader::new(
            RealRuntime,
            HttpClient::new(Client::new()),
            scratch.clone(),
        );

        let path = downloader
            .fetch(&format!("{}/addon.tgz", server.url()))
            .await
            .unwrap();

        assert_eq!(path.parent(), Some(scratch.as_path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "archive bytes");
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/addon.tgz")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let downloader = HttpDownloader::new(
            RealRuntime,
            HttpClient::new(Client::new()),
            dir.path().to_path_buf(),
        );

        let result = downloader
            .fetch(&format!("{}/addon.tgz", server.url()))
            .await;

        assert!(matches!(result, Err(DownloadError::Status { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_transport_error() {
        let dir = tempdir().unwrap();
        let downloader = HttpDownloader::new(
            RealRuntime,
            HttpClient::new(Client::new()),
            dir.path().to_path_buf(),
        );

        let result = downloader.fetch("http://127.0.0.1:1/addon.tgz").await;

        assert!(matches!(result, Err(DownloadError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_fetch_scratch_dir_failure_is_io_error() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_dir_all()
            .returning(|_| Err(anyhow::anyhow!("permission denied")));

        let downloader = HttpDownloader::new(
            runtime,
            HttpClient::new(Client::new()),
            PathBuf::from("/readonly/cache"),
        );

        // No request is made, so the URL does not need to resolve.
        let result = downloader.fetch("http://127.0.0.1:1/addon.tgz").await;

        assert!(matches!(result, Err(DownloadError::Io { .. })));
    }
}
