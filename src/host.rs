//! Process-wide entry point deciding which responses get a filter attached.

use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use crate::config::CacheBusterConfig;
use crate::filter::ResponseTransformFilter;
use crate::version::{PackageVersion, VersionError, VersionMarker, VersionProvider};

/// Shared factory holding the version marker and eligibility rules for the whole process.
///
/// Cloning is cheap, so one instance can be handed to every request handler.
#[derive(Debug, Clone)]
pub struct CacheBuster {
    version: VersionMarker,
    path_extensions: Arc<[String]>,
    content_types: Arc<[String]>,
}

/// Result of [`CacheBuster::attach`].
#[derive(Debug)]
pub enum Attachment<W: Write> {
    /// The response should be written through this filter.
    Filtered(ResponseTransformFilter<W>),
    /// The request path is not a page; write to the sink directly.
    Bypass(W),
}

impl CacheBuster {
    /// Build a cache buster with default rules, consulting `provider` once.
    pub fn new(provider: &impl VersionProvider) -> Self {
        Self::with_marker(provider.version_marker(), &CacheBusterConfig::default())
    }

    /// Build a cache buster from configuration.
    ///
    /// A configured `version` takes precedence over `fallback`.
    pub fn from_config(
        config: &CacheBusterConfig,
        fallback: &impl VersionProvider,
    ) -> Result<Self, VersionError> {
        let version = match &config.version {
            Some(value) => VersionMarker::new(value)?,
            None => fallback.version_marker(),
        };
        Ok(Self::with_marker(version, config))
    }

    /// Build a cache buster choosing the marker from, in order: `flag`, the configured
    /// `version`, `env` and finally [`PackageVersion`].
    ///
    /// The first value present wins and must be valid; an invalid value is an error rather
    /// than a reason to fall through to the next source.
    pub fn resolve(
        flag: Option<&str>,
        config: &CacheBusterConfig,
        env: Option<&str>,
    ) -> Result<Self, VersionError> {
        let version = match flag.or(config.version.as_deref()).or(env) {
            Some(value) => VersionMarker::new(value)?,
            None => PackageVersion.version_marker(),
        };
        Ok(Self::with_marker(version, config))
    }

    fn with_marker(version: VersionMarker, config: &CacheBusterConfig) -> Self {
        Self {
            version,
            path_extensions: config
                .path_extensions
                .iter()
                .map(|extension| normalise_extension(extension))
                .collect(),
            content_types: config
                .content_types
                .iter()
                .map(|content_type| content_type.trim().to_string())
                .collect(),
        }
    }

    /// Marker appended to every rewritten reference.
    pub fn version(&self) -> &VersionMarker {
        &self.version
    }

    /// Whether responses for `path` should be filtered.
    pub fn should_filter(&self, path: &str) -> bool {
        is_filterable_path(path, &self.path_extensions)
    }

    /// Wrap `sink` in a filter regardless of the request path.
    pub fn filter<W: Write>(&self, sink: W) -> ResponseTransformFilter<W> {
        ResponseTransformFilter::with_content_types(
            sink,
            self.version.clone(),
            Arc::clone(&self.content_types),
        )
    }

    /// Wrap `sink` in a filter when `path` names a page.
    pub fn attach<W: Write>(&self, path: &str, sink: W) -> Attachment<W> {
        if self.should_filter(path) {
            Attachment::Filtered(self.filter(sink))
        } else {
            debug!(path, "skipping cache busting for non-page path");
            Attachment::Bypass(sink)
        }
    }
}

/// Determine whether the extension of the last segment of `path` is in `extensions`.
///
/// The query string and fragment are ignored and the comparison is case-insensitive. A path
/// without an extension matches the empty entry. Entries are expected to be lowercase with a
/// leading dot.
pub fn is_filterable_path(path: &str, extensions: &[String]) -> bool {
    let extension = path_extension(path).to_ascii_lowercase();
    extensions.iter().any(|candidate| *candidate == extension)
}

fn path_extension(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    segment.rfind('.').map_or("", |index| &segment[index..])
}

fn normalise_extension(value: &str) -> String {
    let trimmed = value.trim().to_ascii_lowercase();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{trimmed}")
    }
}
