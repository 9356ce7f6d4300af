//! Document parser for ISML.
//!
//! Pulls tokens lazily from `isml-lexer` with one token of lookahead and
//! builds a `Document`. Nesting is tracked with an explicit stack of open
//! elements rather than recursion, so mismatched or missing closing tags are
//! repaired locally and every problem becomes a diagnostic. Parsing a `&str`
//! never fails.

use crate::ast::{
    Attribute, AttributeValue, CommentNode, Document, ElementNode, Expression, ExpressionNode,
    Node, TextNode, ValueFragment,
};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::options::ParseOptions;
use isml_lexer::vocabulary::canonical_tag_name;
use isml_lexer::{CommentStyle, ExpressionDelimiter, Lexer, Position, Span, Token, TokenKind};

/// An element whose closing tag has not been seen yet.
#[derive(Debug)]
struct Frame {
    tag_name: String,
    attributes: Vec<Attribute>,
    open_span: Span,
    children: Vec<Node>,
}

/// A construct that reached end of input before its closing delimiter.
///
/// `opener` is the innermost unclosed delimiter (where the diagnostic points);
/// `from` is the start of the outermost one (where the trailing text begins).
#[derive(Debug)]
struct Unterminated {
    code: DiagnosticCode,
    message: String,
    opener: Span,
    from: Position,
}

impl Unterminated {
    fn new(code: DiagnosticCode, message: String, opener: Span) -> Self {
        Self {
            code,
            message,
            opener,
            from: opener.start_position(),
        }
    }

    fn within(mut self, outer: Span) -> Self {
        self.from = outer.start_position();
        self
    }
}

/// ISML document parser.
///
/// One parser per template; [`Parser::parse`] consumes it.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token<'a>>,
    options: ParseOptions,
    stack: Vec<Frame>,
    root: Vec<Node>,
    diagnostics: Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, options: ParseOptions) -> Self {
        Self {
            lexer: Lexer::with_scope(source, options.scope),
            peeked: None,
            diagnostics: Diagnostics::new(options.max_errors),
            options,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    /// Parse the whole template.
    pub fn parse(mut self) -> Document {
        tracing::debug!(
            name = self.options.name.as_deref().unwrap_or("<template>"),
            bytes = self.lexer.source().len(),
            "parsing template"
        );

        while self.peek().kind != TokenKind::EndOfInput {
            if let Err(open) = self.parse_node() {
                self.recover_unterminated(open);
                break;
            }
        }

        let end = self.peek().span;
        self.close_remaining(end);

        let errors = self.diagnostics.error_count();
        let document = Document {
            name: self.options.name,
            nodes: self.root,
            diagnostics: self.diagnostics.finish(end),
        };
        tracing::debug!(
            nodes = document.nodes.len(),
            errors,
            diagnostics = document.diagnostics.len(),
            "parsed template"
        );
        document
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    fn parse_node(&mut self) -> Result<(), Unterminated> {
        let token = self.advance();
        match token.kind {
            TokenKind::TagOpenStart => self.parse_open_tag(token),
            TokenKind::TagCloseStart => self.parse_close_tag(token),
            TokenKind::ExpressionStart => {
                let expr = self.parse_expression(token)?;
                self.append(Node::Expression(ExpressionNode {
                    raw_text: expr.text,
                    delimiter: expr.delimiter,
                    span: expr.span,
                }));
                Ok(())
            }
            TokenKind::CommentStart => {
                let comment = self.parse_comment(token)?;
                self.append(Node::Comment(comment));
                Ok(())
            }
            // Text, plus anything the lexer hands back outside a construct.
            _ => {
                self.append(Node::Text(TextNode {
                    content: token.lexeme.to_string(),
                    span: token.span,
                }));
                Ok(())
            }
        }
    }

    /// Parse `<!--- ... --->` or `<iscomment> ... </iscomment>` after its opener.
    fn parse_comment(&mut self, open: Token<'a>) -> Result<CommentNode, Unterminated> {
        let style = CommentStyle::from_opener(open.lexeme);
        let content = self.advance();
        let close = self.advance();
        if content.kind != TokenKind::CommentContent || close.kind != TokenKind::CommentEnd {
            return Err(Unterminated::new(
                DiagnosticCode::UnterminatedComment,
                format!("Unterminated comment: missing '{}'", style.close()),
                open.span,
            ));
        }
        Ok(CommentNode {
            content: content.lexeme.to_string(),
            style,
            span: open.span.to(close.span),
        })
    }

    /// Parse `${ ... }` or `# ... #` after its opener.
    fn parse_expression(&mut self, open: Token<'a>) -> Result<Expression, Unterminated> {
        let delimiter =
            ExpressionDelimiter::from_opener(open.lexeme).unwrap_or(ExpressionDelimiter::Dollar);
        let content = self.advance();
        let close = if content.kind == TokenKind::ExpressionContent {
            self.advance()
        } else {
            content
        };
        if close.kind != TokenKind::ExpressionEnd {
            return Err(Unterminated::new(
                DiagnosticCode::UnterminatedExpression,
                format!("Unterminated expression: missing '{}'", delimiter.close()),
                open.span,
            ));
        }

        let span = open.span.to(close.span);
        if content.lexeme.trim().is_empty() {
            self.diagnostics
                .report(DiagnosticCode::EmptyExpression, "Empty expression", span);
        }
        Ok(Expression {
            delimiter,
            text: content.lexeme.to_string(),
            span,
        })
    }

    // =========================================================================
    // Tags
    // =========================================================================

    fn parse_open_tag(&mut self, open: Token<'a>) -> Result<(), Unterminated> {
        let tag_name = canonical_tag_name(open.tag_name());
        let mut attributes = Vec::new();

        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::AttributeName => {
                    let attribute = self
                        .parse_attribute(token)
                        .map_err(|e| e.within(open.span))?;
                    attributes.push(attribute);
                }
                TokenKind::TagOpenEnd => {
                    let open_span = open.span.to(token.span);
                    if token.is_self_closing_end() || self.options.is_void(&tag_name) {
                        self.append(Node::Element(ElementNode {
                            tag_name,
                            attributes,
                            children: Vec::new(),
                            self_closing: true,
                            implicit_close: false,
                            open_span,
                            close_span: None,
                            span: open_span,
                        }));
                    } else {
                        tracing::trace!(tag = %tag_name, depth = self.stack.len(), "open element");
                        self.stack.push(Frame {
                            tag_name,
                            attributes,
                            open_span,
                            children: Vec::new(),
                        });
                    }
                    return Ok(());
                }
                _ => {
                    return Err(Unterminated::new(
                        DiagnosticCode::UnterminatedTag,
                        format!("Unterminated tag <{tag_name}>: missing '>'"),
                        open.span,
                    ))
                }
            }
        }
    }

    /// Parse an attribute after its name. The value, if any, is either quoted
    /// (between two `ValueQuote` tokens) or a run of unquoted value tokens.
    fn parse_attribute(&mut self, name: Token<'a>) -> Result<Attribute, Unterminated> {
        let mut attribute = Attribute {
            name: name.lexeme.to_string(),
            value: None,
            quote: None,
            span: name.span,
        };

        match self.peek().kind {
            TokenKind::ValueQuote => {
                let open_quote = self.advance();
                let quote = open_quote.lexeme.chars().next();
                let mut fragments = Vec::new();
                loop {
                    let token = self.advance();
                    match token.kind {
                        TokenKind::ValueQuote => {
                            attribute.span = name.span.to(token.span);
                            break;
                        }
                        TokenKind::AttributeValue => {
                            fragments.push(ValueFragment::Literal(token.lexeme.to_string()));
                        }
                        TokenKind::ExpressionStart => {
                            fragments.push(ValueFragment::Expression(self.parse_expression(token)?));
                        }
                        _ => {
                            return Err(Unterminated::new(
                                DiagnosticCode::UnterminatedAttributeValue,
                                format!(
                                    "Unterminated value of attribute '{}': missing closing {}",
                                    attribute.name, open_quote.lexeme
                                ),
                                open_quote.span,
                            ))
                        }
                    }
                }
                attribute.quote = quote;
                attribute.value = Some(AttributeValue::from_fragments(fragments));
            }
            TokenKind::AttributeValue | TokenKind::ExpressionStart => {
                let mut fragments = Vec::new();
                while matches!(
                    self.peek().kind,
                    TokenKind::AttributeValue | TokenKind::ExpressionStart
                ) {
                    let token = self.advance();
                    if token.kind == TokenKind::ExpressionStart {
                        let expr = self.parse_expression(token)?;
                        attribute.span = name.span.to(expr.span);
                        fragments.push(ValueFragment::Expression(expr));
                    } else {
                        attribute.span = name.span.to(token.span);
                        if !token.lexeme.is_empty() {
                            fragments.push(ValueFragment::Literal(token.lexeme.to_string()));
                        }
                    }
                }
                attribute.value = Some(AttributeValue::from_fragments(fragments));
            }
            _ => {}
        }

        Ok(attribute)
    }

    fn parse_close_tag(&mut self, open: Token<'a>) -> Result<(), Unterminated> {
        let tag_name = canonical_tag_name(open.tag_name());
        let close = self.advance();
        if close.kind != TokenKind::TagCloseEnd {
            return Err(Unterminated::new(
                DiagnosticCode::UnterminatedTag,
                format!("Unterminated closing tag </{tag_name}>: missing '>'"),
                open.span,
            ));
        }
        self.close_element(&tag_name, open.span.to(close.span));
        Ok(())
    }

    /// Match a closing tag against the open-element stack.
    fn close_element(&mut self, tag_name: &str, span: Span) {
        let Some(index) = self.stack.iter().rposition(|f| f.tag_name == tag_name) else {
            if self.options.is_void(tag_name) {
                self.diagnostics.report(
                    DiagnosticCode::ClosingVoidTag,
                    format!("Closing tag </{tag_name}> ignored: <{tag_name}> never takes a body"),
                    span,
                );
            } else {
                self.diagnostics.report(
                    DiagnosticCode::UnexpectedClosingTag,
                    format!("Unexpected closing tag </{tag_name}>"),
                    span,
                );
            }
            return;
        };

        if index + 1 < self.stack.len() {
            let innermost = self
                .stack
                .last()
                .map(|f| f.tag_name.clone())
                .unwrap_or_default();
            self.diagnostics.report(
                DiagnosticCode::MismatchedNesting,
                format!("Closing tag </{tag_name}> does not match open <{innermost}>"),
                span,
            );
            let at = Span::empty(span.start_position());
            while self.stack.len() > index + 1 {
                if let Some(frame) = self.stack.pop() {
                    tracing::trace!(tag = %frame.tag_name, "auto-closing element");
                    self.finish(frame, at, true);
                }
            }
        }

        if let Some(frame) = self.stack.pop() {
            self.finish(frame, span, false);
        }
    }

    /// Turn a frame into an element and append it to its parent.
    fn finish(&mut self, frame: Frame, close_span: Span, implicit_close: bool) {
        let element = ElementNode {
            tag_name: frame.tag_name,
            attributes: frame.attributes,
            children: frame.children,
            self_closing: false,
            implicit_close,
            open_span: frame.open_span,
            close_span: Some(close_span),
            span: frame.open_span.to(close_span),
        };
        self.append(Node::Element(element));
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Report an unterminated construct and keep its text as a trailing node.
    fn recover_unterminated(&mut self, open: Unterminated) {
        while self.peek().kind != TokenKind::EndOfInput {
            self.advance();
        }
        let end = self.peek().span;
        tracing::trace!(code = %open.code, offset = open.from.offset, "unterminated construct");
        self.diagnostics.report(open.code, open.message, open.opener);

        let content = self.lexer.source().get(open.from.offset..).unwrap_or_default();
        self.append(Node::Text(TextNode {
            content: content.to_string(),
            span: Span::new(open.from, end.end_position()),
        }));
    }

    /// Close every frame still open at end of input, innermost first.
    fn close_remaining(&mut self, end: Span) {
        let at = Span::empty(end.end_position());
        while let Some(frame) = self.stack.pop() {
            self.diagnostics.report(
                DiagnosticCode::UnterminatedElement,
                format!("Element <{}> is never closed", frame.tag_name),
                frame.open_span,
            );
            self.finish(frame, at, true);
        }
    }

    // =========================================================================
    // Token navigation helpers
    // =========================================================================

    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.root.push(node),
        }
    }

    fn peek(&mut self) -> Token<'a> {
        if let Some(token) = self.peeked {
            return token;
        }
        let token = self.lexer.next_token();
        for warning in self.lexer.take_warnings() {
            self.diagnostics
                .report(DiagnosticCode::UnexpectedCharacter, warning.message, warning.span);
        }
        self.peeked = Some(token);
        token
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        self.peeked = None;
        token
    }
}
