use std::sync::OnceLock;

use regex::Regex;

/// Pairing of a tag pattern with the attribute that carries its asset reference.
#[derive(Debug)]
pub struct TagRule {
    /// Case-insensitive, non-greedy pattern spanning one opening tag.
    pub pattern: Regex,
    /// Attribute receiving the version marker.
    pub attribute: &'static str,
}

/// Rules applied to every eligible response, in order: scripts first, then links.
pub fn tag_rules() -> &'static [TagRule] {
    static RULES: OnceLock<Vec<TagRule>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            vec![
                TagRule {
                    pattern: Regex::new(r"(?i)<script[\s\S]*?>").expect("invalid script regex"),
                    attribute: "src",
                },
                TagRule {
                    pattern: Regex::new(r"(?i)<link[\s\S]*?>").expect("invalid link regex"),
                    attribute: "href",
                },
            ]
        })
        .as_slice()
}

/// Pattern matching `<script ...>` opening tags.
pub fn script_tag_pattern() -> &'static Regex {
    &tag_rules()[0].pattern
}

/// Pattern matching `<link ...>` tags.
pub fn link_tag_pattern() -> &'static Regex {
    &tag_rules()[1].pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_pattern_stops_at_first_closing_bracket() {
        let html = r#"<SCRIPT type="module" src="app.js"></SCRIPT>"#;
        let found = script_tag_pattern().find(html).unwrap();
        assert_eq!(found.as_str(), r#"<SCRIPT type="module" src="app.js">"#);
    }

    #[test]
    fn link_pattern_spans_multiline_tags() {
        let html = "<link\n  rel=\"stylesheet\"\n  href=\"site.css\" />";
        let found = link_tag_pattern().find(html).unwrap();
        assert_eq!(found.as_str(), html);
    }

    #[test]
    fn rules_pair_tags_with_their_reference_attribute() {
        let attributes: Vec<_> = tag_rules().iter().map(|rule| rule.attribute).collect();
        assert_eq!(attributes, vec!["src", "href"]);
    }
}
