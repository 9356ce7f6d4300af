use crate::reader::SourceReader;
use crate::token::{Position, Token, TokenKind};
use crate::vocabulary::{canonical_tag_name, is_isml_tag, is_raw_text_tag, is_tag_name_char, TagScope};
use crate::LexError;

/// Delimiter pair around an inline expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ExpressionDelimiter {
    /// `${ ... }`, brace-balanced.
    Dollar,
    /// `# ... #`, attribute values only.
    Hash,
}

impl ExpressionDelimiter {
    pub fn open(self) -> &'static str {
        match self {
            ExpressionDelimiter::Dollar => "${",
            ExpressionDelimiter::Hash => "#",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            ExpressionDelimiter::Dollar => "}",
            ExpressionDelimiter::Hash => "#",
        }
    }

    /// Classify the lexeme of an `ExpressionStart` token.
    pub fn from_opener(lexeme: &str) -> Option<Self> {
        match lexeme {
            "${" => Some(ExpressionDelimiter::Dollar),
            "#" => Some(ExpressionDelimiter::Hash),
            _ => None,
        }
    }
}

/// The two template comment forms. Neither is forwarded to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CommentStyle {
    /// `<!--- ... --->`
    Dashes,
    /// `<iscomment> ... </iscomment>`
    Tag,
}

impl CommentStyle {
    pub fn open(self) -> &'static str {
        match self {
            CommentStyle::Dashes => "<!---",
            CommentStyle::Tag => "<iscomment>",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            CommentStyle::Dashes => "--->",
            CommentStyle::Tag => "</iscomment>",
        }
    }

    /// Classify the lexeme of a `CommentStart` token.
    pub fn from_opener(lexeme: &str) -> Self {
        if lexeme.starts_with("<!---") {
            CommentStyle::Dashes
        } else {
            CommentStyle::Tag
        }
    }
}

/// Where an expression hands control back to once its closing delimiter is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    Text,
    Value { quote: Option<char> },
}

/// Lexer mode. Threaded through every `next_token` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Markup or raw-text body, see `TextMode`.
    Text,
    /// Between attributes of an opening tag.
    TagInterior,
    /// Right after an attribute name; `=` may follow.
    AfterAttributeName,
    /// Inside an attribute value.
    Value { quote: Option<char>, started: bool },
    /// After an expression opener. `end` is the offset of the closing delimiter.
    ExpressionBody {
        delimiter: ExpressionDelimiter,
        end: Option<usize>,
        resume: Resume,
    },
    ExpressionClose {
        delimiter: ExpressionDelimiter,
        resume: Resume,
    },
    /// After a comment opener. `end` holds the content end and the close end.
    CommentBody { end: Option<(usize, usize)> },
    CommentClose { close_end: usize },
    /// Between `</name` and `>`.
    CloseTagInterior,
    Finished,
}

/// How text bodies are scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TextMode {
    Markup,
    /// Body of a raw-text element: only ISML constructs and the element's own
    /// closing tag are recognized.
    Raw(String),
}

enum Opener {
    Comment(usize),
    Expression,
    OpenTag(usize),
    CloseTag(usize),
}

/// ISML tokenizer.
///
/// Produces tokens lazily, one `next_token` call at a time. After the first
/// `EndOfInput` every further call returns `EndOfInput` again. Reaching the end
/// of input inside a tag, attribute value, expression or comment yields
/// `EndOfInput` straight away; the caller knows which construct was left open.
pub struct Lexer<'a> {
    reader: SourceReader<'a>,
    scope: TagScope,
    mode: Mode,
    text_mode: TextMode,
    current_tag: String,
    warnings: Vec<LexError>,
    done: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer with the default tag scope (ISML tags only).
    pub fn new(source: &'a str) -> Self {
        Self::with_scope(source, TagScope::default())
    }

    /// Create a lexer with a specific tag scope.
    pub fn with_scope(source: &'a str, scope: TagScope) -> Self {
        Self {
            reader: SourceReader::new(source),
            scope,
            mode: Mode::Text,
            text_mode: TextMode::Markup,
            current_tag: String::new(),
            warnings: Vec::new(),
            done: false,
        }
    }

    /// Tokenize the entire source. The last token is always `EndOfInput`.
    pub fn tokenize(source: &str) -> Vec<Token<'_>> {
        Lexer::new(source).collect()
    }

    pub fn source(&self) -> &'a str {
        self.reader.source()
    }

    /// Drain the recoverable problems found so far.
    pub fn take_warnings(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.warnings)
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Token<'a> {
        match self.mode {
            Mode::Text => self.lex_text(),
            Mode::TagInterior => self.lex_tag_interior(),
            Mode::AfterAttributeName => self.lex_after_attribute_name(),
            Mode::Value { quote, started } => self.lex_value(quote, started),
            Mode::ExpressionBody {
                delimiter,
                end,
                resume,
            } => self.lex_expression_body(delimiter, end, resume),
            Mode::ExpressionClose { delimiter, resume } => {
                let start = self.reader.position();
                self.reader.advance_by(delimiter.close().len());
                self.mode = match resume {
                    Resume::Text => Mode::Text,
                    Resume::Value { quote } => Mode::Value {
                        quote,
                        started: true,
                    },
                };
                self.token_from(TokenKind::ExpressionEnd, start)
            }
            Mode::CommentBody { end } => match end {
                Some((content_end, close_end)) => {
                    let start = self.reader.position();
                    self.reader.advance_to(content_end);
                    self.mode = Mode::CommentClose { close_end };
                    self.token_from(TokenKind::CommentContent, start)
                }
                None => self.end_of_input(),
            },
            Mode::CommentClose { close_end } => {
                let start = self.reader.position();
                self.reader.advance_to(close_end);
                self.mode = Mode::Text;
                self.token_from(TokenKind::CommentEnd, start)
            }
            Mode::CloseTagInterior => self.lex_close_tag_interior(),
            Mode::Finished => self.end_of_input(),
        }
    }

    // --- Markup ---

    fn lex_text(&mut self) -> Token<'a> {
        if self.reader.is_at_end() {
            return self.end_of_input();
        }
        if let Some(opener) = self.opener_at_cursor() {
            return self.begin_construct(opener);
        }

        let start = self.reader.position();
        self.reader.advance();
        while !self.reader.is_at_end() && self.opener_at_cursor().is_none() {
            self.reader.advance();
        }
        self.token_from(TokenKind::Text, start)
    }

    /// Check whether the cursor sits on a recognized opener. Consumes nothing.
    fn opener_at_cursor(&self) -> Option<Opener> {
        let rest = self.reader.rest();
        let bytes = rest.as_bytes();
        match bytes.first() {
            Some(b'$') => return (bytes.get(1) == Some(&b'{')).then_some(Opener::Expression),
            Some(b'<') => {}
            _ => return None,
        }

        if rest.starts_with(CommentStyle::Dashes.open()) {
            return Some(Opener::Comment(CommentStyle::Dashes.open().len()));
        }
        if let Some(len) = iscomment_open_len(rest) {
            return Some(Opener::Comment(len));
        }

        let closing = bytes.get(1) == Some(&b'/');
        let name_start = if closing { 2 } else { 1 };
        let name = tag_name_prefix(&rest[name_start..])?;
        let recognized = match &self.text_mode {
            TextMode::Markup => self.scope.recognizes(name),
            TextMode::Raw(tag) => is_isml_tag(name) || (closing && name.eq_ignore_ascii_case(tag)),
        };
        if !recognized {
            return None;
        }

        let len = name_start + name.len();
        Some(if closing {
            Opener::CloseTag(len)
        } else {
            Opener::OpenTag(len)
        })
    }

    fn begin_construct(&mut self, opener: Opener) -> Token<'a> {
        let start = self.reader.position();
        match opener {
            Opener::Expression => {
                self.reader.advance_by(2);
                let end = self.find_expression_end(ExpressionDelimiter::Dollar, None);
                self.begin_expression(ExpressionDelimiter::Dollar, end, Resume::Text, start)
            }
            Opener::Comment(len) => {
                self.reader.advance_to(start.offset + len);
                let style = CommentStyle::from_opener(self.reader.slice(start.offset, start.offset + len));
                let from = self.reader.offset();
                let end = find_comment_close(self.reader.rest(), style)
                    .map(|(content, close)| (from + content, from + content + close));
                self.mode = Mode::CommentBody { end };
                self.token_from(TokenKind::CommentStart, start)
            }
            Opener::OpenTag(len) => {
                self.reader.advance_to(start.offset + len);
                self.current_tag =
                    canonical_tag_name(self.reader.slice(start.offset + 1, start.offset + len));
                self.mode = Mode::TagInterior;
                self.token_from(TokenKind::TagOpenStart, start)
            }
            Opener::CloseTag(len) => {
                self.reader.advance_to(start.offset + len);
                let name = self.reader.slice(start.offset + 2, start.offset + len);
                if matches!(&self.text_mode, TextMode::Raw(tag) if name.eq_ignore_ascii_case(tag)) {
                    tracing::trace!(tag = name, "leaving raw text");
                    self.text_mode = TextMode::Markup;
                }
                self.mode = Mode::CloseTagInterior;
                self.token_from(TokenKind::TagCloseStart, start)
            }
        }
    }

    // --- Tags ---

    fn lex_tag_interior(&mut self) -> Token<'a> {
        loop {
            self.reader.advance_while(char::is_whitespace);
            let start = self.reader.position();
            match self.reader.peek(0) {
                None => return self.end_of_input(),
                Some('>') => {
                    self.reader.advance();
                    self.enter_body();
                    return self.token_from(TokenKind::TagOpenEnd, start);
                }
                Some('/') if self.reader.peek(1) == Some('>') => {
                    self.reader.advance_by(2);
                    self.mode = Mode::Text;
                    return self.token_from(TokenKind::TagOpenEnd, start);
                }
                Some(c @ ('/' | '"' | '\'' | '=' | '<')) => {
                    self.reader.advance();
                    let message = format!("Unexpected character '{c}' in tag <{}>", self.current_tag);
                    self.warn(message, start);
                }
                Some(_) => {
                    self.scan_attribute_name();
                    self.mode = Mode::AfterAttributeName;
                    return self.token_from(TokenKind::AttributeName, start);
                }
            }
        }
    }

    /// Switch to the body of the tag just closed with `>`.
    fn enter_body(&mut self) {
        self.mode = Mode::Text;
        if self.scope == TagScope::All
            && self.text_mode == TextMode::Markup
            && is_raw_text_tag(&self.current_tag)
        {
            tracing::trace!(tag = %self.current_tag, "entering raw text");
            self.text_mode = TextMode::Raw(self.current_tag.clone());
        }
    }

    /// Attribute names run to whitespace, `=`, `>`, `/>`, a quote or `<`.
    /// A `${...}` inside the name is taken whole.
    fn scan_attribute_name(&mut self) {
        loop {
            if self.reader.starts_with("${") {
                self.reader.advance_by(2);
                if let Some(end) = self.find_expression_end(ExpressionDelimiter::Dollar, None) {
                    self.reader.advance_to(end + 1);
                }
                continue;
            }
            match self.reader.peek(0) {
                Some('/') if self.reader.peek(1) == Some('>') => break,
                Some(c) if !c.is_whitespace() && !matches!(c, '=' | '>' | '"' | '\'' | '<') => {
                    self.reader.advance();
                }
                _ => break,
            }
        }
    }

    fn lex_after_attribute_name(&mut self) -> Token<'a> {
        if !self.reader.rest().trim_start().starts_with('=') {
            self.mode = Mode::TagInterior;
            return self.lex_tag_interior();
        }

        self.reader.advance_while(char::is_whitespace);
        self.reader.advance(); // consume '='
        self.reader.advance_while(char::is_whitespace);

        match self.reader.peek(0) {
            Some(quote @ ('"' | '\'')) => {
                let start = self.reader.position();
                self.reader.advance();
                self.mode = Mode::Value {
                    quote: Some(quote),
                    started: false,
                };
                self.token_from(TokenKind::ValueQuote, start)
            }
            _ => self.lex_value(None, false),
        }
    }

    fn lex_value(&mut self, quote: Option<char>, started: bool) -> Token<'a> {
        let start = self.reader.position();
        let Some(c) = self.reader.peek(0) else {
            return self.end_of_input();
        };

        match quote {
            Some(q) if c == q => {
                self.reader.advance();
                self.mode = Mode::TagInterior;
                return self.token_from(TokenKind::ValueQuote, start);
            }
            None if self.unquoted_value_ends() => {
                self.mode = Mode::TagInterior;
                if started {
                    return self.lex_tag_interior();
                }
                // `name=` followed by nothing: an empty value
                return self.token_from(TokenKind::AttributeValue, start);
            }
            _ => {}
        }

        if let Some((delimiter, end)) = self.value_expression_at(quote) {
            self.reader.advance_by(delimiter.open().len());
            return self.begin_expression(delimiter, end, Resume::Value { quote }, start);
        }

        while let Some(c) = self.reader.peek(0) {
            let boundary = match quote {
                Some(q) => c == q,
                None => self.unquoted_value_ends(),
            };
            if boundary || self.value_expression_at(quote).is_some() {
                break;
            }
            self.reader.advance();
        }
        self.mode = Mode::Value {
            quote,
            started: true,
        };
        self.token_from(TokenKind::AttributeValue, start)
    }

    /// Unquoted values run to whitespace, `>` or `/>`.
    fn unquoted_value_ends(&self) -> bool {
        match self.reader.peek(0) {
            None => true,
            Some(c) => c.is_whitespace() || c == '>' || (c == '/' && self.reader.peek(1) == Some('>')),
        }
    }

    /// An expression opener inside an attribute value. `${` always opens one;
    /// `#` only when its closing `#` lies inside the same value.
    fn value_expression_at(&self, quote: Option<char>) -> Option<(ExpressionDelimiter, Option<usize>)> {
        let rest = self.reader.rest();
        let from = self.reader.offset();
        if rest.starts_with("${") {
            let end = find_expression_end(&rest[2..], ExpressionDelimiter::Dollar, quote)
                .map(|rel| from + 2 + rel);
            return Some((ExpressionDelimiter::Dollar, end));
        }
        if rest.starts_with('#') {
            let end = find_expression_end(&rest[1..], ExpressionDelimiter::Hash, quote)?;
            return Some((ExpressionDelimiter::Hash, Some(from + 1 + end)));
        }
        None
    }

    fn lex_close_tag_interior(&mut self) -> Token<'a> {
        loop {
            self.reader.advance_while(char::is_whitespace);
            let start = self.reader.position();
            match self.reader.peek(0) {
                None => return self.end_of_input(),
                Some('>') => {
                    self.reader.advance();
                    self.mode = Mode::Text;
                    return self.token_from(TokenKind::TagCloseEnd, start);
                }
                Some(c) => {
                    self.reader.advance();
                    self.warn(format!("Unexpected character '{c}' in closing tag"), start);
                }
            }
        }
    }

    // --- Expressions ---

    fn begin_expression(
        &mut self,
        delimiter: ExpressionDelimiter,
        end: Option<usize>,
        resume: Resume,
        start: Position,
    ) -> Token<'a> {
        self.mode = Mode::ExpressionBody {
            delimiter,
            end,
            resume,
        };
        self.token_from(TokenKind::ExpressionStart, start)
    }

    fn lex_expression_body(
        &mut self,
        delimiter: ExpressionDelimiter,
        end: Option<usize>,
        resume: Resume,
    ) -> Token<'a> {
        let Some(end) = end else {
            return self.end_of_input();
        };
        let start = self.reader.position();
        self.reader.advance_to(end);
        self.mode = Mode::ExpressionClose { delimiter, resume };
        self.token_from(TokenKind::ExpressionContent, start)
    }

    /// Absolute offset of the closing delimiter of the expression starting at the cursor.
    fn find_expression_end(&self, delimiter: ExpressionDelimiter, quote: Option<char>) -> Option<usize> {
        find_expression_end(self.reader.rest(), delimiter, quote).map(|rel| self.reader.offset() + rel)
    }

    // --- Helpers ---

    fn end_of_input(&mut self) -> Token<'a> {
        if self.mode != Mode::Finished {
            tracing::trace!(mode = ?self.mode, offset = self.reader.offset(), "end of input");
        }
        self.reader.advance_to(self.reader.source().len());
        self.mode = Mode::Finished;
        let at = self.reader.position();
        self.token_from(TokenKind::EndOfInput, at)
    }

    fn token_from(&self, kind: TokenKind, start: Position) -> Token<'a> {
        Token::new(
            kind,
            self.reader.slice(start.offset, self.reader.offset()),
            self.reader.span_from(start),
        )
    }

    fn warn(&mut self, message: String, start: Position) {
        self.warnings.push(LexError {
            message,
            span: self.reader.span_from(start),
        });
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::EndOfInput {
            self.done = true;
        }
        Some(token)
    }
}

/// Length of a tag name at the start of `s`, which must begin with an ASCII letter.
fn tag_name_prefix(s: &str) -> Option<&str> {
    if !s.chars().next()?.is_ascii_alphabetic() {
        return None;
    }
    let len = s.find(|c: char| !is_tag_name_char(c)).unwrap_or(s.len());
    Some(&s[..len])
}

/// Byte length of `<iscomment>` (any case, optional whitespace before `>`).
fn iscomment_open_len(s: &str) -> Option<usize> {
    let head = s.get(..10)?;
    if !head.eq_ignore_ascii_case("<iscomment") {
        return None;
    }
    let after = &s[10..];
    let trimmed = after.trim_start();
    trimmed
        .starts_with('>')
        .then(|| 10 + (after.len() - trimmed.len()) + 1)
}

/// Byte length of `</name>` (any case, optional whitespace before `>`) at the start of `s`.
fn closing_tag_len(s: &str, name: &str) -> Option<usize> {
    let prefix_len = 2 + name.len();
    let head = s.get(..prefix_len)?;
    if !head.starts_with("</") || !head[2..].eq_ignore_ascii_case(name) {
        return None;
    }
    let after = &s[prefix_len..];
    let trimmed = after.trim_start();
    trimmed
        .starts_with('>')
        .then(|| prefix_len + (after.len() - trimmed.len()) + 1)
}

/// Find the comment close in `rest`: returns (content length, close length).
fn find_comment_close(rest: &str, style: CommentStyle) -> Option<(usize, usize)> {
    match style {
        CommentStyle::Dashes => rest
            .find(CommentStyle::Dashes.close())
            .map(|i| (i, CommentStyle::Dashes.close().len())),
        CommentStyle::Tag => rest
            .match_indices('<')
            .find_map(|(i, _)| closing_tag_len(&rest[i..], "iscomment").map(|len| (i, len))),
    }
}

/// Scan an expression body and return the offset of its closing delimiter in `rest`.
///
/// `${ }` keeps a brace depth counter and skips quoted strings of either kind.
/// `# #` ends at the next `#` outside quoted strings; `quote` is the quote of the
/// enclosing attribute value (`None` for an unquoted value), whose boundary ends
/// the search without a match. An unquoted value ends at whitespace, `>` or `/>`.
pub(crate) fn find_expression_end(
    rest: &str,
    delimiter: ExpressionDelimiter,
    quote: Option<char>,
) -> Option<usize> {
    let mut depth = 0usize;
    let mut string: Option<char> = None;
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        if delimiter == ExpressionDelimiter::Hash {
            let value_ends = match quote {
                Some(q) => c == q,
                None => c.is_whitespace() || c == '>' || rest[i..].starts_with("/>"),
            };
            if value_ends {
                return None;
            }
        }

        if let Some(open) = string {
            if c == '\\' {
                chars.next();
            } else if c == open {
                string = None;
            }
            continue;
        }

        match (delimiter, c) {
            (_, '\'' | '"') => string = Some(c),
            (ExpressionDelimiter::Dollar, '{') => depth += 1,
            (ExpressionDelimiter::Dollar, '}') if depth == 0 => return Some(i),
            (ExpressionDelimiter::Dollar, '}') => depth -= 1,
            (ExpressionDelimiter::Hash, '#') => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: tokenize with every tag recognized and return token kinds.
    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::with_scope(source, TagScope::All).map(|t| t.kind).collect()
    }

    /// Helper: tokenize with every tag recognized and return (kind, lexeme) pairs.
    fn lexemes(source: &str) -> Vec<(TokenKind, &str)> {
        Lexer::with_scope(source, TagScope::All)
            .map(|t| (t.kind, t.lexeme))
            .collect()
    }

    fn isml_lexemes(source: &str) -> Vec<(TokenKind, &str)> {
        Lexer::tokenize(source)
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect()
    }

    use TokenKind::*;

    // =========================================================================
    // Markup
    // =========================================================================

    #[test]
    fn test_empty_source() {
        assert_eq!(kinds(""), vec![EndOfInput]);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(lexemes("hello world"), vec![(Text, "hello world"), (EndOfInput, "")]);
    }

    #[test]
    fn test_end_of_input_repeats() {
        let mut lexer = Lexer::new("a");
        assert_eq!(lexer.next_token().kind, Text);
        assert_eq!(lexer.next_token().kind, EndOfInput);
        assert_eq!(lexer.next_token().kind, EndOfInput);
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        assert_eq!(lexemes("a < b"), vec![(Text, "a < b"), (EndOfInput, "")]);
    }

    #[test]
    fn test_html_comment_is_text() {
        assert_eq!(lexemes("<!-- keep -->"), vec![(Text, "<!-- keep -->"), (EndOfInput, "")]);
    }

    #[test]
    fn test_hash_in_markup_is_text() {
        assert_eq!(lexemes("color: #fff;"), vec![(Text, "color: #fff;"), (EndOfInput, "")]);
    }

    // =========================================================================
    // Tags
    // =========================================================================

    #[test]
    fn test_simple_tag() {
        assert_eq!(
            lexemes("<div>x</div>"),
            vec![
                (TagOpenStart, "<div"),
                (TagOpenEnd, ">"),
                (Text, "x"),
                (TagCloseStart, "</div"),
                (TagCloseEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_self_closing_tag() {
        assert_eq!(
            lexemes("<isset name=\"a\"/>"),
            vec![
                (TagOpenStart, "<isset"),
                (AttributeName, "name"),
                (ValueQuote, "\""),
                (AttributeValue, "a"),
                (ValueQuote, "\""),
                (TagOpenEnd, "/>"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_attributes_with_spaces_around_equals() {
        assert_eq!(
            lexemes("<isloop iterator = 'items' alias=item>"),
            vec![
                (TagOpenStart, "<isloop"),
                (AttributeName, "iterator"),
                (ValueQuote, "'"),
                (AttributeValue, "items"),
                (ValueQuote, "'"),
                (AttributeName, "alias"),
                (AttributeValue, "item"),
                (TagOpenEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_bare_attribute() {
        assert_eq!(
            lexemes("<input disabled>"),
            vec![
                (TagOpenStart, "<input"),
                (AttributeName, "disabled"),
                (TagOpenEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_empty_unquoted_value() {
        assert_eq!(
            lexemes("<a href=>"),
            vec![
                (TagOpenStart, "<a"),
                (AttributeName, "href"),
                (AttributeValue, ""),
                (TagOpenEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_empty_quoted_value() {
        assert_eq!(
            lexemes("<a href=\"\">"),
            vec![
                (TagOpenStart, "<a"),
                (AttributeName, "href"),
                (ValueQuote, "\""),
                (ValueQuote, "\""),
                (TagOpenEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_closing_tag_with_whitespace() {
        assert_eq!(
            lexemes("</isif  >"),
            vec![(TagCloseStart, "</isif"), (TagCloseEnd, ">"), (EndOfInput, "")]
        );
    }

    #[test]
    fn test_junk_in_closing_tag_warns() {
        let mut lexer = Lexer::new("</isif foo>");
        let kinds: Vec<_> = lexer.by_ref().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TagCloseStart, TagCloseEnd, EndOfInput]);
        assert_eq!(lexer.take_warnings().len(), 3);
    }

    #[test]
    fn test_stray_quote_in_tag_warns() {
        let mut lexer = Lexer::with_scope("<div \" class=a>", TagScope::All);
        let kinds: Vec<_> = lexer.by_ref().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TagOpenStart, AttributeName, AttributeValue, TagOpenEnd, EndOfInput]);
        let warnings = lexer.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("'\"'"));
        assert_eq!(warnings[0].span.column, 6);
    }

    #[test]
    fn test_tag_name_keeps_case() {
        assert_eq!(lexemes("<IsLoop>")[0], (TagOpenStart, "<IsLoop"));
    }

    #[test]
    fn test_dollar_expression_in_attribute_name() {
        assert_eq!(
            lexemes("<input ${checked ? 'checked' : ''}>"),
            vec![
                (TagOpenStart, "<input"),
                (AttributeName, "${checked ? 'checked' : ''}"),
                (TagOpenEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    // =========================================================================
    // Tag scope
    // =========================================================================

    #[test]
    fn test_default_scope_leaves_html_as_text() {
        assert_eq!(
            isml_lexemes("<div><isprint value=\"#x#\"></div>"),
            vec![
                (Text, "<div>"),
                (TagOpenStart, "<isprint"),
                (AttributeName, "value"),
                (ValueQuote, "\""),
                (ExpressionStart, "#"),
                (ExpressionContent, "x"),
                (ExpressionEnd, "#"),
                (ValueQuote, "\""),
                (TagOpenEnd, ">"),
                (Text, "</div>"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_isml_tag_inside_html_tag_by_default() {
        assert_eq!(
            isml_lexemes("<option <isif condition=\"#a#\">selected</isif>>"),
            vec![
                (Text, "<option "),
                (TagOpenStart, "<isif"),
                (AttributeName, "condition"),
                (ValueQuote, "\""),
                (ExpressionStart, "#"),
                (ExpressionContent, "a"),
                (ExpressionEnd, "#"),
                (ValueQuote, "\""),
                (TagOpenEnd, ">"),
                (Text, "selected"),
                (TagCloseStart, "</isif"),
                (TagCloseEnd, ">"),
                (Text, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    // =========================================================================
    // Raw text
    // =========================================================================

    #[test]
    fn test_script_body_is_raw() {
        assert_eq!(
            lexemes("<script>if (a<b) {}</script>"),
            vec![
                (TagOpenStart, "<script"),
                (TagOpenEnd, ">"),
                (Text, "if (a<b) {}"),
                (TagCloseStart, "</script"),
                (TagCloseEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_script_body_keeps_isml_constructs() {
        assert_eq!(
            kinds("<script>var x = <isif condition=\"#a#\">1</isif>; ${y}</SCRIPT><b>"),
            vec![
                TagOpenStart,
                TagOpenEnd,
                Text,
                TagOpenStart,
                AttributeName,
                ValueQuote,
                ExpressionStart,
                ExpressionContent,
                ExpressionEnd,
                ValueQuote,
                TagOpenEnd,
                Text,
                TagCloseStart,
                TagCloseEnd,
                Text,
                ExpressionStart,
                ExpressionContent,
                ExpressionEnd,
                TagCloseStart,
                TagCloseEnd,
                TagOpenStart,
                TagOpenEnd,
                EndOfInput,
            ]
        );
    }

    #[test]
    fn test_self_closed_script_is_not_raw() {
        assert_eq!(
            kinds("<script src=x/><b>"),
            vec![TagOpenStart, AttributeName, AttributeValue, TagOpenEnd, TagOpenStart, TagOpenEnd, EndOfInput]
        );
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    #[test]
    fn test_dollar_expression_in_text() {
        assert_eq!(
            lexemes("Hi ${user.name}!"),
            vec![
                (Text, "Hi "),
                (ExpressionStart, "${"),
                (ExpressionContent, "user.name"),
                (ExpressionEnd, "}"),
                (Text, "!"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_nested_braces_do_not_terminate() {
        assert_eq!(
            lexemes("${ {a: {b: 1}} }")[1],
            (ExpressionContent, " {a: {b: 1}} ")
        );
    }

    #[test]
    fn test_quoted_delimiters_do_not_terminate() {
        assert_eq!(lexemes("${ '}' + \"{\" }")[1], (ExpressionContent, " '}' + \"{\" "));
    }

    #[test]
    fn test_escaped_quote_in_expression_string() {
        assert_eq!(lexemes(r"${ 'a\'}' }")[1], (ExpressionContent, r" 'a\'}' "));
    }

    #[test]
    fn test_empty_expression() {
        assert_eq!(
            lexemes("${}"),
            vec![
                (ExpressionStart, "${"),
                (ExpressionContent, ""),
                (ExpressionEnd, "}"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_dollar_without_brace_is_text() {
        assert_eq!(lexemes("$5.00"), vec![(Text, "$5.00"), (EndOfInput, "")]);
    }

    #[test]
    fn test_mixed_attribute_value() {
        assert_eq!(
            lexemes("<a href=\"/p/#id#?x=${q}\">"),
            vec![
                (TagOpenStart, "<a"),
                (AttributeName, "href"),
                (ValueQuote, "\""),
                (AttributeValue, "/p/"),
                (ExpressionStart, "#"),
                (ExpressionContent, "id"),
                (ExpressionEnd, "#"),
                (AttributeValue, "?x="),
                (ExpressionStart, "${"),
                (ExpressionContent, "q"),
                (ExpressionEnd, "}"),
                (ValueQuote, "\""),
                (TagOpenEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_lone_hash_in_value_is_literal() {
        assert_eq!(
            lexemes("<a href=\"#top\">"),
            vec![
                (TagOpenStart, "<a"),
                (AttributeName, "href"),
                (ValueQuote, "\""),
                (AttributeValue, "#top"),
                (ValueQuote, "\""),
                (TagOpenEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_hash_expression_with_string_argument() {
        assert_eq!(
            lexemes("<isprint value=\"#URL(Action('View-Start'))#\">")[4],
            (ExpressionContent, "URL(Action('View-Start'))")
        );
    }

    #[test]
    fn test_hash_expression_containing_hash_in_string() {
        assert_eq!(
            lexemes("<isprint value=\"#'a#b'#\">")[4],
            (ExpressionContent, "'a#b'")
        );
    }

    #[test]
    fn test_unquoted_hash_expression() {
        assert_eq!(
            lexemes("<isprint value=#a.b#/>"),
            vec![
                (TagOpenStart, "<isprint"),
                (AttributeName, "value"),
                (ExpressionStart, "#"),
                (ExpressionContent, "a.b"),
                (ExpressionEnd, "#"),
                (TagOpenEnd, "/>"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_unquoted_hash_stops_at_whitespace() {
        assert_eq!(
            lexemes("<table bgcolor=#ffffff bordercolor=#000000>"),
            vec![
                (TagOpenStart, "<table"),
                (AttributeName, "bgcolor"),
                (AttributeValue, "#ffffff"),
                (AttributeName, "bordercolor"),
                (AttributeValue, "#000000"),
                (TagOpenEnd, ">"),
                (EndOfInput, ""),
            ]
        );
    }

    // =========================================================================
    // Comments
    // =========================================================================

    #[test]
    fn test_dashes_comment() {
        assert_eq!(
            lexemes("a<!--- <isif> ${x} --->b"),
            vec![
                (Text, "a"),
                (CommentStart, "<!---"),
                (CommentContent, " <isif> ${x} "),
                (CommentEnd, "--->"),
                (Text, "b"),
                (EndOfInput, ""),
            ]
        );
    }

    #[test]
    fn test_iscomment_any_case() {
        assert_eq!(
            lexemes("<ISCOMMENT >note</IsComment>"),
            vec![
                (CommentStart, "<ISCOMMENT >"),
                (CommentContent, "note"),
                (CommentEnd, "</IsComment>"),
                (EndOfInput, ""),
            ]
        );
    }

    // =========================================================================
    // Unterminated constructs
    // =========================================================================

    #[test]
    fn test_unterminated_tag() {
        assert_eq!(kinds("<div class=\"a\""), vec![TagOpenStart, AttributeName, ValueQuote, AttributeValue, ValueQuote, EndOfInput]);
    }

    #[test]
    fn test_unterminated_expression() {
        assert_eq!(kinds("x ${a + {b}"), vec![Text, ExpressionStart, EndOfInput]);
    }

    #[test]
    fn test_unterminated_comment() {
        assert_eq!(kinds("<!--- never closed"), vec![CommentStart, EndOfInput]);
    }

    #[test]
    fn test_unterminated_value() {
        assert_eq!(kinds("<a href=\"x"), vec![TagOpenStart, AttributeName, ValueQuote, AttributeValue, EndOfInput]);
    }

    #[test]
    fn test_end_of_input_span_is_at_end() {
        let tokens = Lexer::tokenize("<!--- a\nb");
        let eof = tokens.last().unwrap();
        assert_eq!(eof.span.start, 9);
        assert_eq!((eof.span.line, eof.span.column), (2, 2));
    }

    // =========================================================================
    // Positions
    // =========================================================================

    #[test]
    fn test_token_positions_across_lines() {
        let tokens = Lexer::tokenize("a\r\n<isif>");
        assert_eq!(tokens[1].kind, TagOpenStart);
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 1));
        assert_eq!(tokens[1].span.start, 3);
    }

    #[test]
    fn test_find_expression_end_hash_stops_at_value_quote() {
        assert_eq!(find_expression_end("top\" x=\"#", ExpressionDelimiter::Hash, Some('"')), None);
        assert_eq!(find_expression_end("a#", ExpressionDelimiter::Hash, Some('"')), Some(1));
    }

    #[test]
    fn test_find_expression_end_hash_unquoted_boundaries() {
        assert_eq!(find_expression_end("a b#", ExpressionDelimiter::Hash, None), None);
        assert_eq!(find_expression_end("a/>b#", ExpressionDelimiter::Hash, None), None);
        assert_eq!(find_expression_end("a/b#", ExpressionDelimiter::Hash, None), Some(3));
    }
}
