//! Document tree for ISML templates.
//!
//! The tree is a closed set of node variants. Every node carries the span of
//! source text it was built from; element spans cover the opening tag, the
//! body and the closing tag.

use crate::diagnostics::Diagnostic;
use isml_lexer::{CommentStyle, ExpressionDelimiter, Span};

/// A parsed template: top-level nodes plus everything the parser noticed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Document {
    /// Label used when reporting diagnostics (usually a file path).
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum Node {
    /// Literal markup, passed through verbatim.
    Text(TextNode),

    /// A recognized tag with attributes and (unless self-closing) a body.
    Element(ElementNode),

    /// An inline `${...}` expression, unevaluated.
    Expression(ExpressionNode),

    /// A template comment; never forwarded for execution.
    Comment(CommentNode),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TextNode {
    pub content: String,
    pub span: Span,
}

/// An element.
///
/// `tag_name` is canonical (lower case). `close_span` is `None` exactly when
/// the element is self-closing; when the parser had to close the element
/// itself, `close_span` is a zero-length marker and `implicit_close` is set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ElementNode {
    pub tag_name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub self_closing: bool,
    pub implicit_close: bool,
    pub open_span: Span,
    pub close_span: Option<Span>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExpressionNode {
    /// Expression text without its delimiters.
    pub raw_text: String,
    pub delimiter: ExpressionDelimiter,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CommentNode {
    pub content: String,
    pub style: CommentStyle,
    pub span: Span,
}

/// An attribute on an element. Names keep their source case.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Attribute {
    pub name: String,
    /// `None` for a bare attribute such as `disabled`.
    pub value: Option<AttributeValue>,
    /// The quote character around the value, if any.
    pub quote: Option<char>,
    pub span: Span,
}

/// The value of an attribute.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AttributeValue {
    /// Only literal text: `href="/home"`
    Literal(String),

    /// Exactly one expression: `condition="#isDefined(x)#"`
    Expression(Expression),

    /// Literal text interleaved with expressions: `href="/p/${id}?a=#b#"`
    Mixed(Vec<ValueFragment>),
}

/// One piece of a mixed attribute value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ValueFragment {
    Literal(String),
    Expression(Expression),
}

/// An embedded expression inside an attribute value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Expression {
    pub delimiter: ExpressionDelimiter,
    /// Expression text without its delimiters.
    pub text: String,
    /// Span including the delimiters.
    pub span: Span,
}

impl AttributeValue {
    /// Build a value from its fragments, collapsing the single-fragment cases.
    pub fn from_fragments(mut fragments: Vec<ValueFragment>) -> Self {
        match fragments.len() {
            0 => AttributeValue::Literal(String::new()),
            1 => match fragments.remove(0) {
                ValueFragment::Literal(text) => AttributeValue::Literal(text),
                ValueFragment::Expression(expr) => AttributeValue::Expression(expr),
            },
            _ => AttributeValue::Mixed(fragments),
        }
    }

    /// The literal text when the value contains no expression.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            AttributeValue::Literal(text) => Some(text),
            _ => None,
        }
    }

    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            AttributeValue::Literal(_) => Vec::new(),
            AttributeValue::Expression(expr) => vec![expr],
            AttributeValue::Mixed(fragments) => fragments
                .iter()
                .filter_map(|f| match f {
                    ValueFragment::Expression(expr) => Some(expr),
                    ValueFragment::Literal(_) => None,
                })
                .collect(),
        }
    }
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Text(n) => n.span,
            Node::Element(n) => n.span,
            Node::Expression(n) => n.span,
            Node::Comment(n) => n.span,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            _ => &[],
        }
    }
}

impl ElementNode {
    /// First attribute with exactly this name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// The span between the opening and the closing tag.
    pub fn body_span(&self) -> Option<Span> {
        self.close_span
            .map(|close| Span::new(self.open_span.end_position(), close.start_position()))
    }
}

impl Document {
    /// True when no `Error` diagnostic was recorded.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Visit every node in pre-order (parents before children, source order).
    pub fn walk<'d>(&'d self, mut visit: impl FnMut(&'d Node, usize)) {
        let mut stack: Vec<(&Node, usize)> = self.nodes.iter().rev().map(|n| (n, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            visit(node, depth);
            stack.extend(node.children().iter().rev().map(|c| (c, depth + 1)));
        }
    }

    /// All elements with the given tag name (compared case-insensitively).
    pub fn elements_named(&self, tag: &str) -> Vec<&ElementNode> {
        let mut found = Vec::new();
        self.walk(|node, _| {
            if let Node::Element(el) = node {
                if el.tag_name.eq_ignore_ascii_case(tag) {
                    found.push(el);
                }
            }
        });
        found
    }

    /// Fail-fast view: the document if it has no `Error` diagnostics.
    pub fn into_result(self) -> Result<Document, crate::ParseErrors> {
        if self.is_valid() {
            return Ok(self);
        }
        let diagnostics = self.errors().cloned().collect();
        Err(crate::ParseErrors {
            name: self.name,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(text: &str) -> Expression {
        Expression {
            delimiter: ExpressionDelimiter::Hash,
            text: text.to_string(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_from_fragments_collapses_single_literal() {
        let value = AttributeValue::from_fragments(vec![ValueFragment::Literal("a".into())]);
        assert_eq!(value, AttributeValue::Literal("a".into()));
        assert_eq!(value.as_literal(), Some("a"));
    }

    #[test]
    fn test_from_fragments_collapses_single_expression() {
        let value = AttributeValue::from_fragments(vec![ValueFragment::Expression(expr("x"))]);
        assert_eq!(value, AttributeValue::Expression(expr("x")));
        assert_eq!(value.as_literal(), None);
    }

    #[test]
    fn test_from_fragments_empty_is_empty_literal() {
        assert_eq!(AttributeValue::from_fragments(Vec::new()), AttributeValue::Literal(String::new()));
    }

    #[test]
    fn test_mixed_value_lists_expressions() {
        let value = AttributeValue::from_fragments(vec![
            ValueFragment::Literal("/p/".into()),
            ValueFragment::Expression(expr("a")),
            ValueFragment::Literal("?".into()),
            ValueFragment::Expression(expr("b")),
        ]);
        let texts: Vec<_> = value.expressions().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}
