//! Template source printer.
//!
//! Reconstructs ISML source from a tree. Tag names come out canonical,
//! attributes are separated by one space and keep their quotes, and text,
//! expressions and comments are written verbatim. For a well-formed template
//! `parse(to_source(doc))` yields a structurally equal tree.

use crate::ast::{Attribute, AttributeValue, Document, ElementNode, Expression, Node, ValueFragment};
use isml_lexer::vocabulary::is_void_tag;

/// Print a whole document.
pub fn to_source(doc: &Document) -> String {
    let mut out = String::new();
    for node in &doc.nodes {
        write_node(&mut out, node);
    }
    out
}

/// Print a single node and its subtree.
pub fn node_to_source(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

/// Print one attribute as it appears inside a tag.
pub fn attribute_to_source(attr: &Attribute) -> String {
    let mut out = String::new();
    write_attribute(&mut out, attr);
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => out.push_str(&text.content),
        Node::Expression(expr) => {
            out.push_str(expr.delimiter.open());
            out.push_str(&expr.raw_text);
            out.push_str(expr.delimiter.close());
        }
        Node::Comment(comment) => {
            out.push_str(comment.style.open());
            out.push_str(&comment.content);
            out.push_str(comment.style.close());
        }
        Node::Element(el) => write_element(out, el),
    }
}

fn write_element(out: &mut String, el: &ElementNode) {
    out.push('<');
    out.push_str(&el.tag_name);
    for attr in &el.attributes {
        out.push(' ');
        write_attribute(out, attr);
    }

    if el.self_closing {
        // Void tags close themselves; everything else needs the explicit form.
        out.push_str(if is_void_tag(&el.tag_name) { ">" } else { "/>" });
        return;
    }
    out.push('>');

    for child in &el.children {
        write_node(out, child);
    }

    // A recovered element had no closing tag in the source.
    if !el.implicit_close {
        out.push_str("</");
        out.push_str(&el.tag_name);
        out.push('>');
    }
}

fn write_attribute(out: &mut String, attr: &Attribute) {
    out.push_str(&attr.name);
    let Some(value) = &attr.value else {
        return;
    };
    out.push('=');
    if let Some(quote) = attr.quote {
        out.push(quote);
    }
    match value {
        AttributeValue::Literal(text) => out.push_str(text),
        AttributeValue::Expression(expr) => write_expression(out, expr),
        AttributeValue::Mixed(fragments) => {
            for fragment in fragments {
                match fragment {
                    ValueFragment::Literal(text) => out.push_str(text),
                    ValueFragment::Expression(expr) => write_expression(out, expr),
                }
            }
        }
    }
    if let Some(quote) = attr.quote {
        out.push(quote);
    }
}

fn write_expression(out: &mut String, expr: &Expression) {
    out.push_str(expr.delimiter.open());
    out.push_str(&expr.text);
    out.push_str(expr.delimiter.close());
}
