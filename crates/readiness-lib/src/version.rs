//! Kubernetes version parsing and the minimum-version gate

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Major/minor pair of a Kubernetes version. Ordering is lexicographic on
/// (major, minor).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VersionSpec {
    pub major: u32,
    pub minor: u32,
}

impl VersionSpec {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Parse a version such as `v1.24.3` or `1.22.0` into its major and minor
/// components.
///
/// Anything after the second dot-delimited field is ignored. Malformed input
/// degrades to `0.0` with a warning instead of failing.
pub fn parse_version(input: &str) -> VersionSpec {
    let trimmed = input.strip_prefix('v').unwrap_or(input);
    let mut parts = trimmed.split('.');

    let major = parts.next().and_then(|p| p.parse::<u32>().ok());
    let minor = parts.next().and_then(|p| p.parse::<u32>().ok());

    match (major, minor) {
        (Some(major), Some(minor)) => VersionSpec { major, minor },
        _ => {
            warn!(event = "invalid_version", input = %input, "Invalid version string");
            VersionSpec::default()
        }
    }
}

/// Outcome of comparing the reported control-plane version to a minimum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCheck {
    /// Version string as reported by the API server
    pub reported: String,
    /// Minimum version string as configured
    pub minimum: String,
    pub actual: VersionSpec,
    pub required: VersionSpec,
    pub passed: bool,
}

impl VersionCheck {
    /// Compare `reported` against `minimum`; patch and pre-release parts are
    /// ignored and equal minors pass.
    pub fn evaluate(reported: &str, minimum: &str) -> Self {
        let actual = parse_version(reported);
        let required = parse_version(minimum);

        Self {
            reported: reported.to_string(),
            minimum: minimum.to_string(),
            actual,
            required,
            passed: actual >= required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_with_prefix() {
        assert_eq!(parse_version("v1.24.3"), VersionSpec::new(1, 24));
        assert_eq!(parse_version("1.22.0"), VersionSpec::new(1, 22));
        assert_eq!(parse_version("v1.28"), VersionSpec::new(1, 28));
    }

    #[test]
    fn test_parse_version_ignores_build_suffix() {
        assert_eq!(parse_version("v1.27.8-gke.1067004"), VersionSpec::new(1, 27));
        assert_eq!(parse_version("v1.29.0+k3s1"), VersionSpec::new(1, 29));
    }

    #[test]
    fn test_parse_version_degrades_to_zero() {
        assert_eq!(parse_version("not-a-version"), VersionSpec::new(0, 0));
        assert_eq!(parse_version("1"), VersionSpec::new(0, 0));
        assert_eq!(parse_version(""), VersionSpec::new(0, 0));
        assert_eq!(parse_version("v1.x.3"), VersionSpec::new(0, 0));
    }

    #[test]
    fn test_gate_passes_newer_minor() {
        let check = VersionCheck::evaluate("1.24.5", "1.22.0");
        assert!(check.passed);
        assert_eq!(check.actual, VersionSpec::new(1, 24));
        assert_eq!(check.required, VersionSpec::new(1, 22));
    }

    #[test]
    fn test_gate_fails_older_minor() {
        assert!(!VersionCheck::evaluate("1.20.0", "1.22.0").passed);
    }

    #[test]
    fn test_gate_boundary_is_inclusive() {
        assert!(VersionCheck::evaluate("v1.22.17", "1.22.0").passed);
        assert!(VersionCheck::evaluate("1.22.0", "1.22.9").passed);
    }

    #[test]
    fn test_gate_major_dominates_minor() {
        assert!(VersionCheck::evaluate("2.0.0", "1.22.0").passed);
        assert!(!VersionCheck::evaluate("0.99.0", "1.22.0").passed);
    }

    #[test]
    fn test_unparseable_reported_version_fails_gate() {
        let check = VersionCheck::evaluate("garbage", "1.22.0");
        assert!(!check.passed);
        assert_eq!(check.actual, VersionSpec::default());
    }
}
