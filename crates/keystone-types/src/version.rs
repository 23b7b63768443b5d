//! Client build versions.
//!
//! Versions are dotted numeric strings with one to four components
//! (`major.minor.build.revision`). Missing components compare as zero, so
//! `1.2` equals `1.2.0`. A semver pre-release or build suffix (`-beta`,
//! `+abc`) is ignored for ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::VersionParseError;

/// Maximum number of numeric components.
const MAX_COMPONENTS: usize = 4;

/// A parsed client version.
#[derive(Debug, Clone)]
pub struct ClientVersion {
    components: [u64; MAX_COMPONENTS],
    raw: String,
}

impl ClientVersion {
    /// Build a version from `major.minor.patch`.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            components: [major, minor, patch, 0],
            raw: format!("{major}.{minor}.{patch}"),
        }
    }

    /// Numeric components, zero-padded to four.
    pub const fn components(&self) -> [u64; MAX_COMPONENTS] {
        self.components
    }
}

impl FromStr for ClientVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let core = trimmed
            .split(['-', '+'])
            .next()
            .unwrap_or_default();
        if core.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let mut components = [0_u64; MAX_COMPONENTS];
        for (i, part) in core.split('.').enumerate() {
            let slot = components
                .get_mut(i)
                .ok_or_else(|| VersionParseError::TooManyComponents(trimmed.to_owned()))?;
            *slot = part
                .parse::<u64>()
                .map_err(|source| VersionParseError::InvalidComponent {
                    version: trimmed.to_owned(),
                    component: part.to_owned(),
                    source,
                })?;
        }

        Ok(Self {
            components,
            raw: trimmed.to_owned(),
        })
    }
}

impl PartialEq for ClientVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for ClientVersion {}

impl PartialOrd for ClientVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClientVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Default for ClientVersion {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl Serialize for ClientVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ClientVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn v(s: &str) -> ClientVersion {
        s.parse().unwrap()
    }

    #[test]
    fn orders_numerically() {
        assert!(v("1.10.0") > v("1.9.9"));
        assert!(v("2.0") > v("1.99.99.99"));
        assert!(v("0.9.0") < v("1.0.0"));
    }

    #[test]
    fn missing_components_are_zero() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
    }

    #[test]
    fn ignores_semver_suffix() {
        assert_eq!(v("1.4.0-beta.2"), v("1.4.0"));
        assert_eq!(v("1.4.0+build7").to_string(), "1.4.0+build7");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<ClientVersion>().unwrap_err(), VersionParseError::Empty);
        assert!(matches!(
            "1.x.0".parse::<ClientVersion>(),
            Err(VersionParseError::InvalidComponent { .. })
        ));
        assert!(matches!(
            "1.2.3.4.5".parse::<ClientVersion>(),
            Err(VersionParseError::TooManyComponents(_))
        ));
    }
}
