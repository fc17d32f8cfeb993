//! HTTP client module and its error type.

mod client;
mod error;

pub use client::HttpClient;
pub use error::HttpError;
