//! Semantic versions for formulas and checkpoints
//!
//! Versions are user provided and follow semantic versioning conventions:
//! - a major update means clients of the versioned object must be updated
//!   (a model trained on a previous dataset major cannot serve the new one)
//! - a minor update is a significant improvement old clients can still use
//! - a patch update is a small fix or tweak
//!
//! `0.x` versions are unstable: the minor component tracks breaking changes.
//!
//! ```rust
//! use trueno_lineage::Version;
//!
//! let version: Version = "3.2.1".parse()?;
//! assert!(version.next_patch()?.is_compatible(&version));
//! assert!(!version.next_major()?.is_compatible(&version));
//! # Ok::<(), trueno_lineage::Error>(())
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Semantic version, ordered by (major, minor, patch).
///
/// Serialized as its `major.minor.patch` string so that version equality can
/// be used as a store query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
}

impl Version {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a `major.minor.patch` string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionFormat`] when the string does not have exactly
    /// three components or a component is not a non-negative integer.
    pub fn parse(version_string: &str) -> Result<Self> {
        let components: Vec<&str> = version_string.trim().split('.').collect();
        if components.len() != 3 {
            return Err(Error::VersionFormat(version_string.to_string()));
        }
        let mut parsed = [0u64; 3];
        for (slot, component) in parsed.iter_mut().zip(&components) {
            // u64 parsing accepts a leading '+', reject it explicitly
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::VersionFormat(version_string.to_string()));
            }
            *slot = component
                .parse()
                .map_err(|_| Error::VersionFormat(version_string.to_string()))?;
        }
        Ok(Self::new(parsed[0], parsed[1], parsed[2]))
    }

    /// Check whether two versions can be used interchangeably.
    ///
    /// Two `0.x` versions are compatible iff their minor components match;
    /// otherwise versions are compatible iff their major components match.
    #[must_use]
    pub const fn is_compatible(&self, other: &Self) -> bool {
        if self.major == 0 && other.major == 0 {
            return self.minor == other.minor;
        }
        self.major == other.major
    }

    /// Bump the major component.
    ///
    /// Lower components are kept verbatim (`3.2.1 -> 4.2.1`), they are not
    /// reset to zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionFormat`] when the major component is already
    /// `u64::MAX`.
    pub fn next_major(&self) -> Result<Self> {
        let major = self.bumped(self.major, "major")?;
        Ok(Self::new(major, self.minor, self.patch))
    }

    /// Bump the minor component, keeping the patch component verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionFormat`] when the minor component overflows.
    pub fn next_minor(&self) -> Result<Self> {
        let minor = self.bumped(self.minor, "minor")?;
        Ok(Self::new(self.major, minor, self.patch))
    }

    /// Bump the patch component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionFormat`] when the patch component overflows.
    pub fn next_patch(&self) -> Result<Self> {
        let patch = self.bumped(self.patch, "patch")?;
        Ok(Self::new(self.major, self.minor, patch))
    }

    fn bumped(&self, component: u64, label: &str) -> Result<u64> {
        component.checked_add(1).ok_or_else(|| {
            Error::VersionFormat(format!(
                "{self} cannot be bumped, its {label} component overflows"
            ))
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let version = Version::parse("3.2.1").unwrap();
        assert_eq!(version, Version::new(3, 2, 1));
        assert_eq!(version.to_string(), "3.2.1");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "1.2", "1.2.3.4", "a.b.c", "1.-2.3", "1..3", "+1.2.3", "1.2.x"] {
            assert!(
                matches!(Version::parse(bad), Err(Error::VersionFormat(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_compatibility_table() {
        assert!(Version::new(0, 1, 0).is_compatible(&Version::new(0, 1, 5)));
        assert!(!Version::new(0, 1, 0).is_compatible(&Version::new(0, 2, 0)));
        assert!(Version::new(1, 0, 0).is_compatible(&Version::new(1, 9, 9)));
        assert!(!Version::new(1, 0, 0).is_compatible(&Version::new(2, 0, 0)));
        assert!(!Version::new(0, 1, 0).is_compatible(&Version::new(1, 1, 0)));
    }

    #[test]
    fn test_bumps_keep_lower_components() {
        let version = Version::new(3, 2, 1);
        assert_eq!(version.next_major().unwrap(), Version::new(4, 2, 1));
        assert_eq!(version.next_minor().unwrap(), Version::new(3, 3, 1));
        assert_eq!(version.next_patch().unwrap(), Version::new(3, 2, 2));
    }

    #[test]
    fn test_bump_at_component_limit_is_an_error() {
        let version = Version::parse("18446744073709551615.0.0").unwrap();
        assert_eq!(version.major, u64::MAX);
        assert!(matches!(version.next_major(), Err(Error::VersionFormat(_))));
        assert_eq!(version.next_minor().unwrap(), Version::new(u64::MAX, 1, 0));

        let version = Version::new(1, u64::MAX, u64::MAX);
        assert!(version.next_minor().is_err());
        let err = version.next_patch().unwrap_err();
        assert!(err.to_string().contains("patch component overflows"));
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(Version::new(1, 0, 0) > Version::new(0, 9, 9));
        assert!(Version::new(1, 2, 0) > Version::new(1, 1, 9));
        assert!(Version::new(1, 1, 2) > Version::new(1, 1, 1));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_value(Version::new(0, 1, 0)).unwrap();
        assert_eq!(json, serde_json::json!("0.1.0"));
        let back: Version = serde_json::from_value(json).unwrap();
        assert_eq!(back, Version::new(0, 1, 0));
        assert!(serde_json::from_value::<Version>(serde_json::json!("0.1")).is_err());
    }
}
