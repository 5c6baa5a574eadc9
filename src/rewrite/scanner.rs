use regex::Regex;
use tracing::trace;

use super::attribute::add_version_to_attribute;
use super::patterns::tag_rules;
use crate::version::VersionMarker;

/// Opening tag located in a body, with byte offsets into that body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMatch<'a> {
    /// Offset of the opening `<`.
    pub start: usize,
    /// Offset just past the closing `>`.
    pub end: usize,
    /// Matched tag text.
    pub text: &'a str,
}

/// Result of rewriting a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Rewritten body.
    pub text: String,
    /// Number of tags that received a version marker.
    pub rewritten: usize,
}

/// Collect every non-overlapping match of `pattern`, left to right.
pub fn find_tags<'a>(body: &'a str, pattern: &Regex) -> Vec<TagMatch<'a>> {
    pattern
        .find_iter(body)
        .map(|found| TagMatch {
            start: found.start(),
            end: found.end(),
            text: found.as_str(),
        })
        .collect()
}

/// Add the version marker to `attribute` in every tag matched by `pattern`.
///
/// All matches are collected against the unmodified body first and the output is rebuilt in
/// a single pass, so identical tags are each rewritten exactly once.
pub fn scan_and_rewrite(
    body: &str,
    pattern: &Regex,
    attribute: &str,
    version: &VersionMarker,
) -> ScanOutcome {
    let mut text = String::with_capacity(body.len());
    let mut rewritten = 0;
    let mut cursor = 0;

    for tag in find_tags(body, pattern) {
        text.push_str(&body[cursor..tag.start]);
        let replacement = add_version_to_attribute(tag.text, attribute, version);
        if replacement != tag.text {
            trace!(offset = tag.start, attribute, "added version marker");
            rewritten += 1;
        }
        text.push_str(&replacement);
        cursor = tag.end;
    }
    text.push_str(&body[cursor..]);

    ScanOutcome { text, rewritten }
}

/// Apply every tag rule in order: `src` on script tags, then `href` on link tags.
pub fn add_version_to_tags(html: &str, version: &VersionMarker) -> ScanOutcome {
    tag_rules().iter().fold(
        ScanOutcome {
            text: html.to_string(),
            rewritten: 0,
        },
        |outcome, rule| {
            let next = scan_and_rewrite(&outcome.text, &rule.pattern, rule.attribute, version);
            ScanOutcome {
                text: next.text,
                rewritten: outcome.rewritten + next.rewritten,
            }
        },
    )
}
