//! Three-part version parsing and bumping.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::Deserialize;

use crate::error::VersionError;

/// Version used when a project has no release history yet.
pub const INITIAL_VERSION_NUM: &str = "0.0.0";

/// Type of version bump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpType {
    #[default]
    Patch,
    Minor,
    Major,
}

impl BumpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(format!("Unknown bump type: {} (expected major, minor or patch)", s)),
        }
    }
}

/// Parse a version string made of exactly three dot-separated non-negative integers.
///
/// Unlike [`Version::parse`], pre-release and build metadata are rejected.
pub fn parse_version_num(version_num: &str) -> Result<Version, VersionError> {
    let invalid = || VersionError::InvalidFormat(version_num.to_string());

    let parts = version_num
        .split('.')
        .map(|part| part.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    match parts.as_slice() {
        [major, minor, patch] => Ok(Version::new(*major, *minor, *patch)),
        _ => Err(invalid()),
    }
}

/// Apply a bump to a version per semver rules.
pub fn apply_bump(version: &Version, bump_type: BumpType) -> Version {
    match bump_type {
        BumpType::Major => Version::new(version.major + 1, 0, 0),
        BumpType::Minor => Version::new(version.major, version.minor + 1, 0),
        BumpType::Patch => Version::new(version.major, version.minor, version.patch + 1),
    }
}

/// Bump a version string, returning the incremented string.
pub fn bump_version_num(version_num: &str, bump_type: BumpType) -> Result<String, VersionError> {
    let version = parse_version_num(version_num)?;
    Ok(apply_bump(&version, bump_type).to_string())
}

/// Remove every character that is not a digit or a dot, e.g. `v1.2.3` -> `1.2.3`.
pub fn strip_to_version_num(tag: &str) -> String {
    tag.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}
