//! npm registry lookups.

use async_trait::async_trait;
use log::debug;

use crate::error::MetadataError;
use crate::http::{HttpClient, HttpError};
use crate::package::{PackageDescriptor, PackageName};

/// Public npm registry.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Source of package descriptors, keyed by package name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Fetches the descriptor of the latest published version of `name`.
    async fn fetch_descriptor(&self, name: &PackageName)
    -> Result<PackageDescriptor, MetadataError>;
}

/// [`DescriptorSource`] backed by an npm-compatible registry.
pub struct Registry {
    http_client: HttpClient,
    base_url: String,
}

impl Registry {
    pub fn new(http_client: HttpClient, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string());
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<registry>/<name>/latest`
    pub fn descriptor_url(&self, name: &PackageName) -> String {
        format!("{}/{}/latest", self.base_url, name)
    }
}

#[async_trait]
impl DescriptorSource for Registry {
    #[tracing::instrument(skip(self))]
    async fn fetch_descriptor(
        &self,
        name: &PackageName,
    ) -> Result<PackageDescriptor, MetadataError> {
        let url = self.descriptor_url(name);
        debug!("Fetching descriptor for {} from {}", name, url);

        let descriptor = self
            .http_client
            .get_json::<PackageDescriptor>(&url)
            .await
            .map_err(|source| classify(name, source))?;

        match descriptor.name.as_deref() {
            Some(found) if found != name.as_str() => Err(MetadataError::NameMismatch {
                name: name.to_string(),
                found: found.to_string(),
            }),
            _ => Ok(descriptor),
        }
    }
}

fn classify(name: &PackageName, source: HttpError) -> MetadataError {
    let name = name.to_string();
    if matches!(source, HttpError::Decode { .. }) {
        MetadataError::Malformed { name, source }
    } else if source.is_not_found() {
        MetadataError::Missing { name, source }
    } else {
        MetadataError::Unavailable { name, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    fn registry(url: &str) -> Registry {
        Registry::new(HttpClient::new(Client::new()), Some(url.to_string()))
    }

    fn name(s: &str) -> PackageName {
        PackageName::parse(s).unwrap()
    }

    #[test]
    fn test_descriptor_url() {
        let registry = registry("https://registry.example/");
        assert_eq!(
            registry.descriptor_url(&name("my-addon")),
            "https://registry.example/my-addon/latest"
        );
    }

    #[test]
    fn test_default_registry() {
        let registry = Registry::new(HttpClient::new(Client::new()), None);
        assert_eq!(registry.base_url(), DEFAULT_REGISTRY_URL);
    }

    #[tokio::test]
    async fn test_fetch_descriptor_success() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/my-addon/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "my-addon",
                    "version": "1.2.3",
                    "ankidroidJsApi": "0.0.1",
                    "addonType": "note-editor",
                    "dist": {"tarball": "https://example.com/my-addon-1.2.3.tgz"},
                    "_id": "my-addon@1.2.3"
                }"#,
            )
            .create_async()
            .await;

        let descriptor = registry(&server.url())
            .fetch_descriptor(&name("my-addon"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(descriptor.name.as_deref(), Some("my-addon"));
        assert_eq!(descriptor.version.as_deref(), Some("1.2.3"));
        assert_eq!(descriptor.addon_type.as_deref(), Some("note-editor"));
        assert_eq!(
            descriptor.tarball_url(),
            Some("https://example.com/my-addon-1.2.3.tgz")
        );
    }

    #[tokio::test]
    async fn test_fetch_descriptor_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/no-such-addon/latest")
            .with_status(404)
            .with_body(r#""Not Found""#)
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_descriptor(&name("no-such-addon"))
            .await;

        assert!(matches!(result, Err(MetadataError::Missing { .. })));
    }

    #[tokio::test]
    async fn test_fetch_descriptor_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/broken/latest")
            .with_status(200)
            .with_body(r#"{"name": "broken", "keywords": "not-an-array"}"#)
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_descriptor(&name("broken"))
            .await;

        assert!(matches!(result, Err(MetadataError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_fetch_descriptor_rejects_other_package() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/my-addon/latest")
            .with_status(200)
            .with_body(r#"{"name": "victim", "version": "1.0.0"}"#)
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_descriptor(&name("my-addon"))
            .await;

        match result {
            Err(MetadataError::NameMismatch { name, found }) => {
                assert_eq!(name, "my-addon");
                assert_eq!(found, "victim");
            }
            other => panic!("expected NameMismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_string_in_name_never_reaches_registry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        assert!(PackageName::parse("victim?x=").is_err());
        assert_eq!(
            registry(&server.url()).descriptor_url(&name("victim")),
            format!("{}/victim/latest", server.url())
        );

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_descriptor_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/my-addon/latest")
            .with_status(503)
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_descriptor(&name("my-addon"))
            .await;

        assert!(matches!(result, Err(MetadataError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_fetch_descriptor_host_unreachable() {
        let result = registry("http://127.0.0.1:1")
            .fetch_descriptor(&name("my-addon"))
            .await;

        match result {
            Err(MetadataError::Unavailable { name, source }) => {
                assert_eq!(name, "my-addon");
                assert!(matches!(source, HttpError::Unreachable { .. }));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
