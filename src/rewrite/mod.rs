//! Cache-busting rewrites applied to decoded HTML text.
//!
//! The work is split the same way it happens at runtime: [`patterns`] holds the tag rules,
//! [`scanner`] finds every matching tag in a body and [`attribute`] splices the version
//! marker into a single tag. None of these steps can fail; anything that does not look like
//! a quoted reference is left exactly as it was.

mod attribute;
mod patterns;
mod scanner;

pub use attribute::{AttributeOccurrence, add_version_to_attribute, locate_attribute};
pub use patterns::{TagRule, link_tag_pattern, script_tag_pattern, tag_rules};
pub use scanner::{ScanOutcome, TagMatch, add_version_to_tags, find_tags, scan_and_rewrite};
