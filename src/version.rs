//! Release version markers appended to asset references.

use std::env;
use std::fmt;
use std::sync::Arc;

/// Characters that cannot appear in a marker without breaking the quoted attribute value or
/// the query string it is spliced into.
const FORBIDDEN_CHARACTERS: &[char] = &['"', '\'', '<', '>', '&'];

/// Opaque, immutable release identifier such as `1.4.2.0`.
///
/// Cloning is cheap; every filter created for the process shares the same underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionMarker(Arc<str>);

impl VersionMarker {
    /// Validate and wrap a version value.
    ///
    /// Surrounding whitespace is trimmed. Empty values and values containing whitespace,
    /// quotes, `<`, `>` or `&` are rejected.
    pub fn new(value: impl AsRef<str>) -> Result<Self, VersionError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        if let Some(character) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || FORBIDDEN_CHARACTERS.contains(c))
        {
            return Err(VersionError::InvalidCharacter {
                value: trimmed.to_string(),
                character,
            });
        }

        Ok(Self(Arc::from(trimmed)))
    }

    /// Read the marker from an environment variable.
    pub fn from_env(name: &str) -> Result<Self, VersionError> {
        let value = env::var(name).map_err(|_| VersionError::MissingEnv {
            name: name.to_string(),
        })?;
        Self::new(value)
    }

    /// Borrow the marker text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionMarker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of the version marker, consulted once whenever a filter is constructed.
pub trait VersionProvider {
    /// Return the marker for the current process. Must be stable for the process lifetime.
    fn version_marker(&self) -> VersionMarker;
}

impl VersionProvider for VersionMarker {
    fn version_marker(&self) -> VersionMarker {
        self.clone()
    }
}

/// Provider yielding this crate's package version.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageVersion;

impl PackageVersion {
    /// Package version baked in at compile time.
    pub const VALUE: &'static str = env!("CARGO_PKG_VERSION");
}

impl VersionProvider for PackageVersion {
    fn version_marker(&self) -> VersionMarker {
        VersionMarker(Arc::from(Self::VALUE))
    }
}

/// Errors raised while constructing a [`VersionMarker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The value was empty after trimming.
    Empty,
    /// The value contained a character that cannot be embedded in an attribute value.
    InvalidCharacter {
        /// Offending value.
        value: String,
        /// First rejected character.
        character: char,
    },
    /// The environment variable holding the value was unset or not unicode.
    MissingEnv {
        /// Variable name.
        name: String,
    },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "version marker must not be empty"),
            Self::InvalidCharacter { value, character } => {
                write!(f, "version marker {value:?} contains invalid character {character:?}")
            }
            Self::MissingEnv { name } => {
                write!(f, "environment variable {name} is not set")
            }
        }
    }
}

impl std::error::Error for VersionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let marker = VersionMarker::new("  1.4.2.0\n").unwrap();
        assert_eq!(marker.as_str(), "1.4.2.0");
        assert_eq!(marker.to_string(), "1.4.2.0");
    }

    #[test]
    fn rejects_empty_values() {
        assert_eq!(VersionMarker::new("   "), Err(VersionError::Empty));
    }

    #[test]
    fn rejects_values_that_would_break_markup() {
        for value in ["1.0\"", "1.0'", "a<b", "a>b", "a&b", "1 2"] {
            assert!(
                matches!(
                    VersionMarker::new(value),
                    Err(VersionError::InvalidCharacter { .. })
                ),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn reports_missing_environment_variable() {
        let err = VersionMarker::from_env("CACHE_BUSTER_TEST_UNSET_VARIABLE").unwrap_err();
        assert_eq!(err, VersionError::MissingEnv {
            name: "CACHE_BUSTER_TEST_UNSET_VARIABLE".into()
        });
    }

    #[test]
    fn package_version_matches_manifest() {
        assert_eq!(
            PackageVersion.version_marker().as_str(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn fixed_marker_provides_itself() {
        let marker = VersionMarker::new("2024.10").unwrap();
        assert_eq!(marker.version_marker(), marker);
    }
}
