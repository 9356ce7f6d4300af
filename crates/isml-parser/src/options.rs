//! Per-parse configuration.

use isml_lexer::vocabulary::{canonical_tag_name, is_void_tag};
use isml_lexer::TagScope;

/// Options for a single parse call.
///
/// ```
/// use isml_parser::{ParseOptions, TagScope};
///
/// let options = ParseOptions::new()
///     .with_name("checkout/cart.isml")
///     .with_scope(TagScope::All)
///     .with_void_tag("isProductPrice");
/// assert!(options.is_void("isproductprice"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    /// Label for diagnostics, usually the template path.
    pub name: Option<String>,
    /// Which tags are recognized. Defaults to ISML tags only.
    pub scope: TagScope,
    /// Extra tags (e.g. custom module tags) that never take a body.
    pub extra_void_tags: Vec<String>,
    /// Cap on recorded `Error` diagnostics. Parsing always completes.
    pub max_errors: Option<usize>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_scope(mut self, scope: TagScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_void_tag(mut self, tag: &str) -> Self {
        self.extra_void_tags.push(canonical_tag_name(tag));
        self
    }

    pub fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = Some(max);
        self
    }

    /// Check if a canonical tag name never takes a body.
    pub fn is_void(&self, tag: &str) -> bool {
        is_void_tag(tag)
            || self
                .extra_void_tags
                .iter()
                .any(|extra| extra.eq_ignore_ascii_case(tag))
    }
}
