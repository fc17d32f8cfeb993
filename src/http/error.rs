//! Classification of HTTP failures.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by [`HttpClient`](super::HttpClient).
///
/// The variants separate "the host could not be reached" from "the host
/// answered with something we cannot use", which callers map onto their own
/// failure stages.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection, DNS or TLS failure before a response arrived.
    #[error("could not reach {url}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {}", .status.as_u16())]
    Status { url: String, status: StatusCode },

    /// The response body could not be read to the end.
    #[error("failed to read response body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body is not the JSON shape the caller asked for.
    #[error("failed to decode JSON from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The local sink for a download could not be created or written.
    #[error("failed to write downloaded data")]
    Write(#[source] std::io::Error),
}

impl HttpError {
    /// Returns the HTTP status if the server answered with an error status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a 404 answer.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
