//! API revisions and the cross-version access gate.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An API revision such as `v3.1.10`.
///
/// Ordering is lexicographic over `(major, minor, patch)`, so
/// `v3.0 < v3.1 < v3.1.10 < v4.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for ApiVersion {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let parts = digits
            .split('.')
            .map(|part| part.parse::<u16>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| EngineError::Validation(format!("invalid API version '{s}'")))?;

        match parts.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor, 0)),
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(EngineError::Validation(format!(
                "invalid API version '{s}': expected major.minor[.patch]"
            ))),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "v{}.{}", self.major, self.minor)
        } else {
            write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl Serialize for ApiVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A resource that remembers the API revision it was created under.
pub trait Versioned {
    fn api_version(&self) -> ApiVersion;
}

/// A resource may be touched through the revision that created it or any later one.
pub fn is_access_allowed(request_version: ApiVersion, resource_version: ApiVersion) -> bool {
    resource_version <= request_version
}

/// Applies [`is_access_allowed`] to a located resource.
///
/// A denial is a conflict: the resource exists, this revision just may not touch it.
pub fn ensure_access<R: Versioned>(request_version: ApiVersion, resource: &R) -> Result<()> {
    let resource_version = resource.api_version();
    if is_access_allowed(request_version, resource_version) {
        Ok(())
    } else {
        Err(EngineError::VersionConflict {
            request: request_version,
            resource: resource_version,
        })
    }
}
