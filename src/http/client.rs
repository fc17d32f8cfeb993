//! HTTP client for registry lookups and archive downloads.

use anyhow::Result;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::io::Write;

use super::error::HttpError;

/// Thin wrapper over `reqwest::Client` that classifies failures into
/// [`HttpError`]. Every call is a single attempt.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Performs a GET request and deserializes the JSON response.
    ///
    /// Fields of `T` that are absent from the body must be optional in `T`;
    /// unknown fields in the body are ignored by serde's defaults.
    #[tracing::instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        debug!("GET JSON from {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| HttpError::Unreachable {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|source| HttpError::Body {
            url: url.to_string(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| HttpError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Downloads a URL chunk by chunk into the writer produced by
    /// `create_writer`, returning the number of bytes written.
    ///
    /// The writer is only created once the server has answered with a
    /// success status, so a failed request leaves nothing on disk.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64, HttpError>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| HttpError::Unreachable {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status,
            });
        }

        let mut writer = create_writer().map_err(|e| HttpError::Write(std::io::Error::other(e)))?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(|source| HttpError::Body {
            url: url.to_string(),
            source,
        })? {
            writer.write_all(&chunk).map_err(HttpError::Write)?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().map_err(HttpError::Write)?;

        debug!("Downloaded {:.2} KB", downloaded_bytes as f64 / 1024.0);

        Ok(downloaded_bytes)
    }
}
