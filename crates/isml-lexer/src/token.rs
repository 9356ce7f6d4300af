/// A point in source text.
///
/// `offset` is a byte offset, `line` and `column` are 1-based and count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };

    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

/// A half-open byte range in source text with line/column of both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self {
            start: start.offset,
            end: end.offset,
            line: start.line,
            column: start.column,
            end_line: end.line,
            end_column: end.column,
        }
    }

    /// A zero-length span marking a single point.
    pub fn empty(at: Position) -> Self {
        Self::new(at, at)
    }

    pub fn start_position(&self) -> Position {
        Position::new(self.start, self.line, self.column)
    }

    pub fn end_position(&self) -> Position {
        Position::new(self.end, self.end_line, self.end_column)
    }

    /// The span from the start of `self` to the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start_position(), other.end_position())
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Token classification for ISML source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TokenKind {
    /// Literal markup passed through verbatim.
    Text,

    // Tags
    /// `<name` of an opening tag.
    TagOpenStart,
    /// `>` or `/>` ending an opening tag.
    TagOpenEnd,
    /// `</name` of a closing tag.
    TagCloseStart,
    /// `>` ending a closing tag.
    TagCloseEnd,

    // Attributes
    AttributeName,
    /// A literal run inside an attribute value (may be empty).
    AttributeValue,
    /// Opening or closing quote of a quoted attribute value.
    ValueQuote,

    // Expressions
    /// `${` or `#`
    ExpressionStart,
    ExpressionContent,
    /// `}` or `#`
    ExpressionEnd,

    // Comments
    /// `<!---` or `<iscomment>`
    CommentStart,
    CommentContent,
    /// `--->` or `</iscomment>`
    CommentEnd,

    EndOfInput,
}

/// A token produced by the ISML lexer. The lexeme borrows from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, lexeme: &'a str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }

    /// The tag name carried by `TagOpenStart` / `TagCloseStart`, as written.
    pub fn tag_name(&self) -> &'a str {
        match self.kind {
            TokenKind::TagOpenStart => &self.lexeme[1..],
            TokenKind::TagCloseStart => &self.lexeme[2..],
            _ => "",
        }
    }

    pub fn is_self_closing_end(&self) -> bool {
        self.kind == TokenKind::TagOpenEnd && self.lexeme == "/>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_to_joins_ends() {
        let a = Span::new(Position::new(0, 1, 1), Position::new(3, 1, 4));
        let b = Span::new(Position::new(10, 2, 2), Position::new(12, 2, 4));
        let joined = a.to(b);
        assert_eq!(joined.start, 0);
        assert_eq!(joined.end, 12);
        assert_eq!((joined.line, joined.column), (1, 1));
        assert_eq!((joined.end_line, joined.end_column), (2, 4));
        assert!(joined.contains(&a));
        assert!(joined.contains(&b));
    }

    #[test]
    fn test_empty_span() {
        let span = Span::empty(Position::new(5, 2, 3));
        assert!(span.is_empty());
        assert_eq!(span.len(), 0);
        assert_eq!(span.start_position(), span.end_position());
    }

    #[test]
    fn test_tag_name_from_lexeme() {
        let open = Token::new(TokenKind::TagOpenStart, "<IsIf", Span::default());
        let close = Token::new(TokenKind::TagCloseStart, "</isif", Span::default());
        let text = Token::new(TokenKind::Text, "hello", Span::default());
        assert_eq!(open.tag_name(), "IsIf");
        assert_eq!(close.tag_name(), "isif");
        assert_eq!(text.tag_name(), "");
    }
}
