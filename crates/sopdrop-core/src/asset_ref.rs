//! Asset references: `owner/name` slugs with an optional `@version` pin.

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::error::{Result, SopdropError};

fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// An `owner/name` registry identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetSlug {
    pub owner: String,
    pub name: String,
}

impl AssetSlug {
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        let (owner, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) => (owner, name),
            _ => {
                return Err(SopdropError::Parse(format!(
                    "invalid slug '{}': expected owner/name",
                    s
                )))
            }
        };
        if !valid_segment(owner) || !valid_segment(name) {
            return Err(SopdropError::Parse(format!(
                "invalid slug '{}': owner and name must be alphanumeric, '-' or '_'",
                s
            )));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Filesystem-safe form used for cache file names.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

impl fmt::Display for AssetSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Which version of an asset a reference pins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionSpec {
    /// Omitted or the literal `latest`: resolved against the registry at
    /// call time, not pinned.
    Latest,
    Exact(Version),
}

/// A parsed `owner/name[@version]` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRef {
    pub slug: AssetSlug,
    pub version: VersionSpec,
}

impl AssetRef {
    pub fn parse(s: &str) -> Result<Self> {
        let (slug_part, version) = match s.rsplit_once('@') {
            Some((slug, ver)) => {
                if ver == "latest" {
                    (slug, VersionSpec::Latest)
                } else {
                    let parsed = Version::parse(ver).map_err(|_| {
                        SopdropError::Parse(format!(
                            "invalid version '{}' in '{}': expected a semantic version or 'latest'",
                            ver, s
                        ))
                    })?;
                    (slug, VersionSpec::Exact(parsed))
                }
            }
            None => (s, VersionSpec::Latest),
        };
        Ok(Self {
            slug: AssetSlug::parse(slug_part)?,
            version,
        })
    }
}

impl FromStr for AssetRef {
    type Err = SopdropError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            VersionSpec::Latest => write!(f, "{}", self.slug),
            VersionSpec::Exact(v) => write!(f, "{}@{}", self.slug, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_slug_resolves_latest() {
        let r = AssetRef::parse("ana/scatter-points").unwrap();
        assert_eq!(r.slug.owner, "ana");
        assert_eq!(r.slug.name, "scatter-points");
        assert_eq!(r.version, VersionSpec::Latest);
    }

    #[test]
    fn test_explicit_latest() {
        let r = AssetRef::parse("ana/scatter-points@latest").unwrap();
        assert_eq!(r.version, VersionSpec::Latest);
    }

    #[test]
    fn test_exact_version() {
        let r = AssetRef::parse("ana/scatter-points@1.2.0").unwrap();
        assert_eq!(
            r.version,
            VersionSpec::Exact(Version::new(1, 2, 0))
        );
        assert_eq!(r.to_string(), "ana/scatter-points@1.2.0");
    }

    #[test]
    fn test_garbage_version_is_parse_error() {
        let err = AssetRef::parse("a/b@x").unwrap_err();
        assert!(matches!(err, SopdropError::Parse(_)));
    }

    #[test]
    fn test_malformed_slugs() {
        for bad in ["a", "a/", "/b", "a/b/c", "", "a b/c", "a/b@"] {
            assert!(
                matches!(AssetRef::parse(bad), Err(SopdropError::Parse(_))),
                "expected parse failure for '{}'",
                bad
            );
        }
    }

    #[test]
    fn test_file_stem_is_path_safe() {
        let r = AssetRef::parse("ana/scatter-points").unwrap();
        assert_eq!(r.slug.file_stem(), "ana_scatter-points");
        assert!(!r.slug.file_stem().contains('/'));
    }
}
