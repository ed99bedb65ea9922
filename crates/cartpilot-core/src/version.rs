//! Config schema compatibility.

use cartpilot_contracts::AutomationConfig;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VersionRejection {
    /// `version` is NaN, infinite or negative.
    Malformed(f64),
    /// The schema major is newer than this host understands.
    UnsupportedMajor { major: u64, max: u64 },
    /// The fetched config is older than the one already cached.
    Downgrade { fetched: f64, cached: f64 },
}

impl fmt::Display for VersionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(version) => write!(f, "malformed version {version}"),
            Self::UnsupportedMajor { major, max } => {
                write!(f, "schema major {major} exceeds supported major {max}")
            }
            Self::Downgrade { fetched, cached } => {
                write!(f, "version {fetched} is older than cached {cached}")
            }
        }
    }
}

/// Check a freshly fetched config against the supported schema and the
/// previously cached entry for the same shop.
pub fn check_version(
    fetched: &AutomationConfig,
    cached: Option<&AutomationConfig>,
    max_major: u64,
) -> Result<(), VersionRejection> {
    let major = fetched
        .major_version()
        .ok_or(VersionRejection::Malformed(fetched.version))?;
    if major > max_major {
        return Err(VersionRejection::UnsupportedMajor {
            major,
            max: max_major,
        });
    }
    if let Some(cached) = cached
        && fetched.version < cached.version
    {
        return Err(VersionRejection::Downgrade {
            fetched: fetched.version,
            cached: cached.version,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::config_for;

    fn versioned(version: f64) -> AutomationConfig {
        let mut config = config_for("A", "a\\.com", "/checkout");
        config.version = version;
        config
    }

    #[test]
    fn test_accepts_supported_versions() {
        assert!(check_version(&versioned(0.5), None, 1).is_ok());
        assert!(check_version(&versioned(1.9), None, 1).is_ok());
        assert!(check_version(&versioned(1.2), Some(&versioned(1.2)), 1).is_ok());
        assert!(check_version(&versioned(1.3), Some(&versioned(1.2)), 1).is_ok());
    }

    #[test]
    fn test_rejects_newer_major() {
        assert_eq!(
            check_version(&versioned(2.0), None, 1),
            Err(VersionRejection::UnsupportedMajor { major: 2, max: 1 })
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for version in [-0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                check_version(&versioned(version), None, 1),
                Err(VersionRejection::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_rejects_downgrade() {
        let err = check_version(&versioned(1.0), Some(&versioned(1.4)), 1).unwrap_err();
        assert!(err.to_string().contains("older"));
    }
}
