//! Error types for each stage of an addon install.
//!
//! Every stage has its own error enum so that the orchestrator can report
//! which stage failed together with the underlying cause.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpError;
use crate::package::InvalidName;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The stages of one install, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Metadata,
    Download,
    Extraction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Metadata => f.write_str("metadata"),
            Stage::Download => f.write_str("download"),
            Stage::Extraction => f.write_str("extraction"),
        }
    }
}

/// Failure to obtain a descriptor from the registry.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The requested name is not a usable registry identifier.
    #[error(transparent)]
    InvalidName(#[from] InvalidName),

    /// The registry host could not be reached or answered with a server error.
    #[error("registry is unavailable while looking up '{name}'")]
    Unavailable {
        name: String,
        #[source]
        source: HttpError,
    },

    /// The registry has no entry for the name.
    #[error("'{name}' was not found in the registry")]
    Missing {
        name: String,
        #[source]
        source: HttpError,
    },

    /// The registry answered, but not with a descriptor.
    #[error("registry metadata for '{name}' is malformed")]
    Malformed {
        name: String,
        #[source]
        source: HttpError,
    },

    /// The registry answered for a different package than the one requested.
    #[error("registry returned '{found}' when asked for '{name}'")]
    NameMismatch { name: String, found: String },
}

/// Failure to bring the distribution archive to scratch storage.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to download {url}")]
    Transport {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("download of {url} was refused")]
    Status {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("failed to write download to {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// Failure to unpack an archive into the managed root.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("refusing to install under an unsafe package id")]
    InvalidPackageId(#[from] InvalidName),

    #[error("unrecognized archive format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("archive {} is corrupt", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("archive {} contains no files", .path.display())]
    Empty { path: PathBuf },

    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// A failed install, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl InstallError {
    pub fn stage(&self) -> Stage {
        match self {
            InstallError::Metadata(_) => Stage::Metadata,
            InstallError::Download(_) => Stage::Download,
            InstallError::Extraction(_) => Stage::Extraction,
        }
    }
}

/// Renders an error and its sources as `outer: inner: innermost`.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_of_each_variant() {
        let err = InstallError::from(MetadataError::InvalidName(InvalidName::Empty));
        assert_eq!(err.stage(), Stage::Metadata);

        let err = InstallError::from(DownloadError::Io {
            path: PathBuf::from("/tmp/x.tgz"),
            source: "disk full".into(),
        });
        assert_eq!(err.stage(), Stage::Download);

        let err = InstallError::from(ExtractionError::Empty {
            path: PathBuf::from("/tmp/x.tgz"),
        });
        assert_eq!(err.stage(), Stage::Extraction);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Metadata.to_string(), "metadata");
        assert_eq!(Stage::Download.to_string(), "download");
        assert_eq!(Stage::Extraction.to_string(), "extraction");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = ExtractionError::Corrupt {
            path: PathBuf::from("addon.tgz"),
            source: Box::new(std::io::Error::other("invalid gzip header")),
        };
        assert_eq!(
            error_chain(&err),
            "archive addon.tgz is corrupt: invalid gzip header"
        );
    }

    #[test]
    fn test_transparent_metadata_error_keeps_message() {
        let err = InstallError::from(MetadataError::InvalidName(InvalidName::Empty));
        assert_eq!(err.to_string(), "package name is empty");
    }
}
