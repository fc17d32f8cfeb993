use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Longest name the npm registry accepts.
const MAX_NAME_LEN: usize = 214;

const NPM_PACKAGE_PAGE: &str = "https://www.npmjs.com/package/";

/// A registry identifier that is safe to use as a single directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidName {
    #[error("package name is empty")]
    Empty,
    #[error("package name is longer than {MAX_NAME_LEN} bytes")]
    TooLong,
    #[error("package name '{0}' contains a path separator")]
    Separator(String),
    #[error("package name '{0}' contains a parent directory reference")]
    Traversal(String),
    #[error("package name '{0}' starts with a dot")]
    LeadingDot(String),
    #[error("package name '{0}' starts with an underscore")]
    LeadingUnderscore(String),
    #[error("package name '{name}' contains '{found}', which is not allowed in a registry URL")]
    InvalidCharacter { name: String, found: char },
}

impl PackageName {
    /// Validates `raw` as a registry identifier.
    pub fn parse(raw: &str) -> Result<Self, InvalidName> {
        if raw.is_empty() {
            return Err(InvalidName::Empty);
        }
        if raw.len() > MAX_NAME_LEN {
            return Err(InvalidName::TooLong);
        }
        if raw.contains('/') || raw.contains('\\') {
            return Err(InvalidName::Separator(raw.to_string()));
        }
        if raw.contains("..") {
            return Err(InvalidName::Traversal(raw.to_string()));
        }
        if raw.starts_with('.') {
            return Err(InvalidName::LeadingDot(raw.to_string()));
        }
        if raw.starts_with('_') {
            return Err(InvalidName::LeadingUnderscore(raw.to_string()));
        }
        if let Some(found) = raw.chars().find(|c| !is_url_safe(*c)) {
            return Err(InvalidName::InvalidCharacter {
                name: raw.to_string(),
                found,
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// Extracts the package name from an npmjs.com package page URL.
    ///
    /// Accepts `https://www.npmjs.com/package/<name>`, optionally followed by
    /// `/v/<version>` or a query string. Returns `None` for any other URL or
    /// when the extracted name is not valid.
    pub fn from_npm_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix(NPM_PACKAGE_PAGE)?;
        Self::parse(first_segment(rest)).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageName {
    type Err = InvalidName;

    /// Accepts either a bare name or an npmjs.com package URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(NPM_PACKAGE_PAGE) {
            Some(rest) => Self::parse(first_segment(rest)),
            None => Self::parse(s),
        }
    }
}

/// Lowercase ASCII alphanumerics plus `-`, `.`, `_` and `~`.
fn is_url_safe(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_' | '~')
}

/// `name/v/1.0.0` and `name?activeTab=versions` both yield `name`.
fn first_segment(rest: &str) -> &str {
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_registry_names() {
        for name in [
            "fs",
            "ankidroid-js-addon-progress-bar",
            "valid_addon.v2",
            "addon~beta",
            "a",
        ] {
            assert_eq!(PackageName::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_parse_rejects_unsafe_names() {
        assert_eq!(PackageName::parse(""), Err(InvalidName::Empty));
        assert!(matches!(
            PackageName::parse("../etc"),
            Err(InvalidName::Separator(_))
        ));
        assert!(matches!(
            PackageName::parse("a\\b"),
            Err(InvalidName::Separator(_))
        ));
        assert!(matches!(
            PackageName::parse(".."),
            Err(InvalidName::Traversal(_))
        ));
        assert!(matches!(
            PackageName::parse("."),
            Err(InvalidName::LeadingDot(_))
        ));
        assert!(matches!(
            PackageName::parse(".hidden"),
            Err(InvalidName::LeadingDot(_))
        ));
        assert!(matches!(
            PackageName::parse("bad\nname"),
            Err(InvalidName::InvalidCharacter { found: '\n', .. })
        ));
        assert!(matches!(
            PackageName::parse("@scope/pkg"),
            Err(InvalidName::Separator(_))
        ));
        assert_eq!(
            PackageName::parse(&"x".repeat(MAX_NAME_LEN + 1)),
            Err(InvalidName::TooLong)
        );
    }

    #[test]
    fn test_parse_rejects_url_metacharacters() {
        for (name, found) in [
            ("victim?x=", '?'),
            ("victim#frag", '#'),
            ("victim%2f", '%'),
            ("my addon", ' '),
            ("MyAddon", 'M'),
            ("caf\u{e9}", '\u{e9}'),
        ] {
            assert_eq!(
                PackageName::parse(name),
                Err(InvalidName::InvalidCharacter {
                    name: name.to_string(),
                    found,
                }),
                "name: {name}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_leading_underscore() {
        assert!(matches!(
            PackageName::parse("_private"),
            Err(InvalidName::LeadingUnderscore(_))
        ));
        assert!(PackageName::parse("not_private").is_ok());
    }

    #[test]
    fn test_from_npm_url() {
        let cases = [
            (
                "https://www.npmjs.com/package/ankidroid-js-addon-progress-bar",
                Some("ankidroid-js-addon-progress-bar"),
            ),
            (
                "https://www.npmjs.com/package/valid-ankidroid-js-addon-test/v/1.0.0",
                Some("valid-ankidroid-js-addon-test"),
            ),
            (
                "https://www.npmjs.com/package/ankidroid-js-addon-progress-bar?activeTab=versions",
                Some("ankidroid-js-addon-progress-bar"),
            ),
            ("https://www.npmjs.com/search?q=ankidroid-js-addon", None),
            ("https://example.com/package/foo", None),
            ("https://www.npmjs.com/package/", None),
        ];

        for (url, expected) in cases {
            assert_eq!(
                PackageName::from_npm_url(url).as_ref().map(PackageName::as_str),
                expected,
                "url: {url}"
            );
        }
    }

    #[test]
    fn test_from_str_accepts_name_or_url() {
        let from_url: PackageName = "https://www.npmjs.com/package/some-addon/v/2.0.0"
            .parse()
            .unwrap();
        let from_name: PackageName = "some-addon".parse().unwrap();
        assert_eq!(from_url, from_name);

        assert!("https://www.npmjs.com/package/".parse::<PackageName>().is_err());
    }
}
