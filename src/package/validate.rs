//! Compatibility contract for installable addons.

use std::fmt;
use std::str::FromStr;

use super::PackageDescriptor;

/// The single contract version this installer supports. Matched exactly.
pub const SUPPORTED_JS_API: &str = "0.0.1";

/// Keyword every package of the addon family must carry.
pub const ADDON_KEYWORD: &str = "ankidroid-js-addon";

/// Integration points an addon can declare in `addonType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddonType {
    Reviewer,
    NoteEditor,
}

impl AddonType {
    pub const ALL: [AddonType; 2] = [AddonType::Reviewer, AddonType::NoteEditor];

    pub fn as_str(&self) -> &'static str {
        match self {
            AddonType::Reviewer => "reviewer",
            AddonType::NoteEditor => "note-editor",
        }
    }
}

impl FromStr for AddonType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddonType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for AddonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a descriptor is not installable. Only the first failing condition is
/// reported.
///
/// `MissingTarball` is never produced by [`rejection_reason`]; the orchestrator
/// reports it when an otherwise valid descriptor has nothing to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingField(&'static str),
    EmptyField(&'static str),
    MissingKeyword,
    UnsupportedApiVersion(String),
    UnsupportedAddonType(String),
    MissingTarball,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingField(field) => write!(f, "required field '{}' is missing", field),
            Rejection::EmptyField(field) => write!(f, "required field '{}' is empty", field),
            Rejection::MissingKeyword => {
                write!(f, "keywords do not include '{}'", ADDON_KEYWORD)
            }
            Rejection::UnsupportedApiVersion(found) => write!(
                f,
                "ankidroidJsApi '{}' is not supported (expected '{}')",
                found, SUPPORTED_JS_API
            ),
            Rejection::UnsupportedAddonType(found) => write!(
                f,
                "addonType '{}' is not one of: {}",
                found,
                AddonType::ALL.map(|t| t.as_str()).join(", ")
            ),
            Rejection::MissingTarball => f.write_str("missing dist.tarball"),
        }
    }
}

/// True when the descriptor satisfies the addon contract.
pub fn is_installable(descriptor: &PackageDescriptor) -> bool {
    rejection_reason(descriptor).is_none()
}

/// Returns the first contract condition the descriptor fails, or `None` if
/// it is installable.
pub fn rejection_reason(descriptor: &PackageDescriptor) -> Option<Rejection> {
    let required = [
        ("name", &descriptor.name),
        ("main", &descriptor.main),
        ("ankidroidJsApi", &descriptor.ankidroid_js_api),
        ("addonType", &descriptor.addon_type),
        ("homepage", &descriptor.homepage),
    ];

    for (field, value) in required {
        match value.as_deref() {
            None => return Some(Rejection::MissingField(field)),
            Some("") => return Some(Rejection::EmptyField(field)),
            Some(_) => {}
        }
    }

    let Some(keywords) = &descriptor.keywords else {
        return Some(Rejection::MissingField("keywords"));
    };
    if !keywords.iter().any(|k| k == ADDON_KEYWORD) {
        return Some(Rejection::MissingKeyword);
    }

    // Both fields were checked present above.
    let api = descriptor.ankidroid_js_api.as_deref().unwrap_or_default();
    if api != SUPPORTED_JS_API {
        return Some(Rejection::UnsupportedApiVersion(api.to_string()));
    }

    let addon_type = descriptor.addon_type.as_deref().unwrap_or_default();
    if addon_type.parse::<AddonType>().is_err() {
        return Some(Rejection::UnsupportedAddonType(addon_type.to_string()));
    }

    None
}
