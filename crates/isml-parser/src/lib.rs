//! ISML Parser
//!
//! Parses ISML storefront templates into a document tree with source spans.
//! Parsing never stops on a syntax problem: every problem is recorded as a
//! [`Diagnostic`] and the tree holds a best-effort recovery.
//!
//! # Example
//!
//! ```
//! let doc = isml_parser::parse(r#"<isif condition="${basket.empty}">Empty</isif>"#);
//! assert!(doc.is_valid());
//! assert_eq!(doc.elements_named("isif").len(), 1);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod options;
pub mod parser;
pub mod printer;

pub use ast::{
    Attribute, AttributeValue, CommentNode, Document, ElementNode, Expression, ExpressionNode,
    Node, TextNode, ValueFragment,
};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use isml_lexer::{CommentStyle, ExpressionDelimiter, Position, Span, TagScope};
pub use options::ParseOptions;
pub use parser::Parser;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A template buffer that could not be turned into source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("template is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidUtf8 { offset: usize },
}

/// The `Error` diagnostics of a template, for callers that stop on the first
/// broken document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} error(s) in {}", .diagnostics.len(), .name.as_deref().unwrap_or("<template>"))]
pub struct ParseErrors {
    pub name: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a template with default options.
pub fn parse(source: &str) -> Document {
    Parser::new(source, ParseOptions::default()).parse()
}

/// Parse a template with the given options.
pub fn parse_with(source: &str, options: &ParseOptions) -> Document {
    Parser::new(source, options.clone()).parse()
}

/// Parse a raw template buffer. A leading UTF-8 byte order mark is skipped;
/// spans are offsets into the text after it.
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Document, SourceError> {
    let (skipped, text) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (UTF8_BOM.len(), rest),
        None => (0, bytes),
    };
    let source = std::str::from_utf8(text).map_err(|e| SourceError::InvalidUtf8 {
        offset: skipped + e.valid_up_to(),
    })?;
    Ok(parse_with(source, options))
}
