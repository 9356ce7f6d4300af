//! Tag vocabulary: which tags are recognized, which never take a body,
//! and which have raw-text bodies.

/// Which `<name` sequences the lexer treats as tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TagScope {
    /// Every tag, ISML and HTML alike.
    All,
    /// Only ISML tags (`is` prefix); plain HTML stays literal text, so ISML
    /// tags may sit inside an HTML tag or attribute value.
    #[default]
    Isml,
}

impl TagScope {
    pub fn recognizes(self, name: &str) -> bool {
        match self {
            TagScope::All => true,
            TagScope::Isml => is_isml_tag(name),
        }
    }
}

/// HTML5 void elements (no children, no closing tag).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// ISML tags that never take a body.
pub const ISML_EMPTY_TAGS: &[&str] = &[
    "isbinary",
    "isbreak",
    "iscache",
    "iscachekey",
    "iscontent",
    "iscookie",
    "isdictionary",
    "iselse",
    "iselseif",
    "iselsif",
    "isfile",
    "isinclude",
    "ismodule",
    "isnext",
    "ispipeline",
    "isplaceholder",
    "isprint",
    "isredirect",
    "isreplace",
    "isselect",
    "isset",
    "isstatus",
    "istext",
];

/// Elements whose body is scanned as raw text in [`TagScope::All`].
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Canonical form of a tag name: ISML tag names are case-insensitive.
pub fn canonical_tag_name(name: &str) -> String {
    name.to_ascii_lowercase()
}

pub fn is_isml_tag(name: &str) -> bool {
    name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("is"))
}

/// Check if a tag name never takes a body. Expects a canonical name.
pub fn is_void_tag(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag) || ISML_EMPTY_TAGS.contains(&tag)
}

/// Check if a tag's body is raw text. Expects a canonical name.
pub fn is_raw_text_tag(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Characters allowed in a tag name after the leading letter.
pub fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scope_is_isml() {
        assert_eq!(TagScope::default(), TagScope::Isml);
    }

    #[test]
    fn test_scope_all_recognizes_html() {
        assert!(TagScope::All.recognizes("div"));
        assert!(TagScope::All.recognizes("isif"));
    }

    #[test]
    fn test_scope_isml_is_prefix_case_insensitive() {
        assert!(TagScope::Isml.recognizes("ISLOOP"));
        assert!(TagScope::Isml.recognizes("isProductPrice"));
        assert!(!TagScope::Isml.recognizes("div"));
        assert!(!TagScope::Isml.recognizes("i"));
    }

    #[test]
    fn test_void_tags() {
        assert!(is_void_tag("br"));
        assert!(is_void_tag("isset"));
        assert!(is_void_tag("iselse"));
        assert!(!is_void_tag("isif"));
        assert!(!is_void_tag("div"));
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_tag_name("IsLoop"), "isloop");
    }
}
