use serde::{Deserialize, Serialize};

/// Registry metadata for one version of an addon package, as served by
/// `GET <registry>/<name>/latest`.
///
/// Every field is optional so that a missing field is seen by the validator
/// rather than failing deserialization. A field present with the wrong JSON
/// type is still a deserialization error. Unknown fields are ignored.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    pub name: Option<String>,
    pub addon_title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Entry point relative to the package root.
    pub main: Option<String>,
    /// Contract version the addon declares support for.
    pub ankidroid_js_api: Option<String>,
    /// Integration point the addon hooks into.
    pub addon_type: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub author: Option<Author>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub dist: Option<Dist>,
}

/// Where the published archive lives and how to verify it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Dist {
    pub tarball: Option<String>,
    pub shasum: Option<String>,
    pub integrity: Option<String>,
}

/// npm accepts both `"Name <email> (url)"` and an object form.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Author {
    Text(String),
    Details {
        name: Option<String>,
        email: Option<String>,
        url: Option<String>,
    },
}

impl Author {
    pub fn name(&self) -> Option<&str> {
        match self {
            Author::Text(text) => Some(text.as_str()),
            Author::Details { name, .. } => name.as_deref(),
        }
    }
}

impl PackageDescriptor {
    /// URL of the distribution archive, if the registry provided one.
    pub fn tarball_url(&self) -> Option<&str> {
        self.dist
            .as_ref()
            .and_then(|dist| dist.tarball.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// Human-readable title: `addonTitle`, falling back to `name`.
    pub fn display_name(&self) -> &str {
        self.addon_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.name.as_deref())
            .unwrap_or("<unnamed>")
    }
}
