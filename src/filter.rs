//! Buffering response filter that versions asset references in HTML bodies.
//!
//! A filter owns the downstream sink for exactly one response. Every write is buffered;
//! nothing reaches the sink until [`ResponseTransformFilter::finalize`] consumes the filter,
//! inspects the declared content type and emits either the rewritten HTML or the original
//! bytes.

use std::io::{self, Write};
use std::str;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::rewrite::add_version_to_tags;
use crate::version::{VersionMarker, VersionProvider};

/// Media type rewritten when no explicit set is configured.
pub const HTML_CONTENT_TYPE: &str = "text/html";

/// Per-response filter wrapping a downstream sink.
#[derive(Debug)]
pub struct ResponseTransformFilter<W: Write> {
    downstream: W,
    version: VersionMarker,
    eligible_content_types: Arc<[String]>,
    buffer: Vec<u8>,
}

impl<W: Write> ResponseTransformFilter<W> {
    /// Create a filter forwarding to `downstream`, consulting `provider` once for the marker.
    ///
    /// Only `text/html` responses are rewritten.
    pub fn new(downstream: W, provider: &impl VersionProvider) -> Self {
        Self::with_content_types(
            downstream,
            provider.version_marker(),
            Arc::from(vec![HTML_CONTENT_TYPE.to_string()]),
        )
    }

    /// Create a filter rewriting responses whose content type equals one of `content_types`.
    pub fn with_content_types(
        downstream: W,
        version: VersionMarker,
        content_types: Arc<[String]>,
    ) -> Self {
        Self {
            downstream,
            version,
            eligible_content_types: content_types,
            buffer: Vec::new(),
        }
    }

    /// Append bytes to the response buffer.
    pub fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of bytes buffered so far.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Marker this filter appends.
    pub fn version(&self) -> &VersionMarker {
        &self.version
    }

    /// Whether a response declared with `content_type` would be rewritten.
    pub fn is_eligible(&self, content_type: &str) -> bool {
        self.eligible_content_types
            .iter()
            .any(|eligible| eligible == content_type)
    }

    /// Emit the response downstream and return the flushed sink.
    ///
    /// Eligible bodies that decode as UTF-8 are rewritten; everything else is forwarded
    /// byte for byte.
    pub fn finalize(mut self, content_type: &str) -> io::Result<W> {
        if self.is_eligible(content_type) {
            match str::from_utf8(&self.buffer) {
                Ok(html) => {
                    let outcome = add_version_to_tags(html, &self.version);
                    debug!(
                        content_type,
                        bytes_in = self.buffer.len(),
                        bytes_out = outcome.text.len(),
                        rewritten = outcome.rewritten,
                        version = %self.version,
                        "versioned asset references"
                    );
                    self.downstream.write_all(outcome.text.as_bytes())?;
                }
                Err(err) => {
                    warn!(
                        content_type,
                        bytes = self.buffer.len(),
                        error = %err,
                        "response body is not valid UTF-8; passing through unchanged"
                    );
                    self.downstream.write_all(&self.buffer)?;
                }
            }
        } else {
            debug!(content_type, bytes = self.buffer.len(), "passing response through");
            self.downstream.write_all(&self.buffer)?;
        }

        self.downstream.flush()?;
        Ok(self.downstream)
    }
}

impl<W: Write> Write for ResponseTransformFilter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    /// Buffered bytes are only emitted by [`ResponseTransformFilter::finalize`].
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
