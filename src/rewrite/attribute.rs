use std::borrow::Cow;

use crate::version::VersionMarker;

/// Query parameter name carrying the version marker.
const VERSION_PARAMETER: &str = "v=";

/// Quoted attribute value located inside a single tag.
///
/// Offsets are byte positions relative to the tag text and exclude the quotes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeOccurrence {
    /// Quote character delimiting the value.
    pub quote: char,
    /// Offset of the first byte of the value.
    pub value_start: usize,
    /// Offset of the closing quote.
    pub value_end: usize,
}

impl AttributeOccurrence {
    /// Borrow the attribute value from the tag it was located in.
    pub fn value<'a>(&self, tag: &'a str) -> &'a str {
        &tag[self.value_start..self.value_end]
    }
}

/// Locate the quoted value of `attribute` inside `tag`.
///
/// The attribute name must be preceded by whitespace and is compared ignoring ASCII case.
/// Returns `None` when the name, the following `=`, or a complete pair of matching quotes
/// cannot be found.
pub fn locate_attribute(tag: &str, attribute: &str) -> Option<AttributeOccurrence> {
    let name_end = find_attribute_name(tag, attribute)?;
    let equals = name_end + tag[name_end..].find('=')?;
    let after_equals = equals + 1;

    let (offset, quote) = tag[after_equals..]
        .char_indices()
        .find(|&(_, c)| c == '\'' || c == '"')?;
    let value_start = after_equals + offset + quote.len_utf8();
    let value_end = value_start + tag[value_start..].find(quote)?;

    Some(AttributeOccurrence {
        quote,
        value_start,
        value_end,
    })
}

/// Insert the version marker as a query parameter into the value of `attribute`.
///
/// Values that already carry a query string get `&v=<version>`, all others `?v=<version>`.
/// When the attribute cannot be located the tag is returned borrowed and untouched.
pub fn add_version_to_attribute<'a>(
    tag: &'a str,
    attribute: &str,
    version: &VersionMarker,
) -> Cow<'a, str> {
    let Some(occurrence) = locate_attribute(tag, attribute) else {
        return Cow::Borrowed(tag);
    };

    let separator = if occurrence.value(tag).contains('?') {
        '&'
    } else {
        '?'
    };

    let (head, tail) = tag.split_at(occurrence.value_end);
    let mut rewritten =
        String::with_capacity(tag.len() + 1 + VERSION_PARAMETER.len() + version.as_str().len());
    rewritten.push_str(head);
    rewritten.push(separator);
    rewritten.push_str(VERSION_PARAMETER);
    rewritten.push_str(version.as_str());
    rewritten.push_str(tail);
    Cow::Owned(rewritten)
}

/// Byte offset just past the first whitespace-preceded occurrence of `attribute`.
fn find_attribute_name(tag: &str, attribute: &str) -> Option<usize> {
    let name = attribute.as_bytes();
    if name.is_empty() {
        return None;
    }

    let bytes = tag.as_bytes();
    (1..bytes.len())
        .find(|&index| {
            bytes[index - 1].is_ascii_whitespace()
                && bytes.len() - index >= name.len()
                && bytes[index..index + name.len()].eq_ignore_ascii_case(name)
        })
        .map(|index| index + name.len())
}
