//! Configuration loader describing which responses get versioned and with what marker.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::filter::HTML_CONTENT_TYPE;

/// File name looked up by [`CacheBusterConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "cache-buster.config.json";

/// Request path extensions whose responses are filtered when none are configured.
pub const DEFAULT_PATH_EXTENSIONS: &[&str] = &["", ".htm", ".html"];

/// Discoverable configuration for the cache buster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheBusterConfig {
    /// Fixed version marker. When absent the caller's version provider is used.
    pub version: Option<String>,
    /// Request path extensions (`""` meaning none) whose responses get a filter attached.
    pub path_extensions: Vec<String>,
    /// Content types whose bodies are rewritten. Compared exactly.
    pub content_types: Vec<String>,
}

impl Default for CacheBusterConfig {
    fn default() -> Self {
        Self {
            version: None,
            path_extensions: DEFAULT_PATH_EXTENSIONS
                .iter()
                .map(|value| value.to_string())
                .collect(),
            content_types: vec![HTML_CONTENT_TYPE.to_string()],
        }
    }
}

/// Errors that can occur while loading the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Source I/O error.
        source: std::io::Error,
    },
    /// Failed to parse the JSON configuration file.
    Parse {
        /// Path that caused the error.
        path: PathBuf,
        /// Source parse error.
        source: serde_json::Error,
    },
}

impl CacheBusterConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// A missing file yields the defaults silently; a file that exists but cannot be read or
    /// parsed yields the defaults with a warning.
    pub fn discover(dir: &Path) -> Self {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        match Self::load_from_path(&candidate) {
            Ok(config) => config,
            Err(ConfigError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %candidate.display(),
                    error = %err,
                    "ignoring unusable configuration file; using defaults"
                );
                Self::default()
            }
        }
    }

    /// Read configuration from a specific JSON file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;

        serde_json::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            source: err,
        })
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_html_pages() {
        let config = CacheBusterConfig::default();
        assert_eq!(config.version, None);
        assert_eq!(config.path_extensions, vec!["", ".htm", ".html"]);
        assert_eq!(config.content_types, vec!["text/html"]);
    }

    #[test]
    fn discover_falls_back_to_defaults_for_missing_file() {
        let temp = tempdir().expect("failed to create temp dir");
        assert_eq!(
            CacheBusterConfig::discover(temp.path()),
            CacheBusterConfig::default()
        );
    }

    #[test]
    fn discover_falls_back_to_defaults_for_invalid_json() {
        let temp = tempdir().expect("failed to create temp dir");
        fs::write(temp.path().join(DEFAULT_CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(
            CacheBusterConfig::discover(temp.path()),
            CacheBusterConfig::default()
        );
    }

    #[test]
    fn discover_falls_back_to_defaults_for_mistyped_fields() {
        let temp = tempdir().expect("failed to create temp dir");
        fs::write(
            temp.path().join(DEFAULT_CONFIG_FILE),
            r#"{"version": "9.9", "pathExtensions": ".html"}"#,
        )
        .unwrap();

        let config = CacheBusterConfig::discover(temp.path());
        assert_eq!(config, CacheBusterConfig::default());
        assert_eq!(config.version, None);
    }

    #[test]
    fn discover_falls_back_to_defaults_when_config_is_a_directory() {
        let temp = tempdir().expect("failed to create temp dir");
        fs::create_dir(temp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(
            CacheBusterConfig::discover(temp.path()),
            CacheBusterConfig::default()
        );
    }

    #[test]
    fn reads_partial_configuration() {
        let temp = tempdir().expect("failed to create temp dir");
        fs::write(
            temp.path().join(DEFAULT_CONFIG_FILE),
            r#"{"version": "2024.10.1", "contentTypes": ["text/html", "application/xhtml+xml"]}"#,
        )
        .unwrap();

        let config = CacheBusterConfig::discover(temp.path());
        assert_eq!(config.version.as_deref(), Some("2024.10.1"));
        assert_eq!(config.content_types, vec!["text/html", "application/xhtml+xml"]);
        assert_eq!(config.path_extensions, vec!["", ".htm", ".html"]);
    }

    #[test]
    fn load_from_path_reports_missing_file() {
        let temp = tempdir().expect("failed to create temp dir");
        let path = temp.path().join("absent.json");
        let err = CacheBusterConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn load_from_path_reports_parse_errors() {
        let temp = tempdir().expect("failed to create temp dir");
        let path = temp.path().join("broken.json");
        fs::write(&path, r#"{"pathExtensions": 3}"#).unwrap();
        let err = CacheBusterConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
