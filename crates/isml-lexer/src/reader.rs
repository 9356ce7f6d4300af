//! Character cursor over template source with line/column tracking.

use crate::token::{Position, Span};

/// Wraps the template text and tracks the current position.
///
/// `\n`, `\r\n` and a lone `\r` each count as one line break. Reading past
/// the end never fails: `peek` and `advance` return `None`.
#[derive(Debug, Clone)]
pub struct SourceReader<'a> {
    source: &'a str,
    pos: Position,
}

impl<'a> SourceReader<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: Position::START,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn offset(&self) -> usize {
        self.pos.offset
    }

    pub fn is_at_end(&self) -> bool {
        self.pos.offset >= self.source.len()
    }

    /// The unread remainder of the source.
    pub fn rest(&self) -> &'a str {
        &self.source[self.pos.offset..]
    }

    /// Look `n` characters ahead without consuming anything.
    pub fn peek(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    /// Consume one character.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos.offset += c.len_utf8();
        match c {
            '\n' => self.newline(),
            // \r\n: the \n that follows does the line break
            '\r' if self.peek(0) != Some('\n') => self.newline(),
            _ => self.pos.column += 1,
        }
        Some(c)
    }

    /// Consume `n` characters (fewer if the input ends first).
    pub fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            if self.advance().is_none() {
                break;
            }
        }
    }

    /// Consume characters up to (not including) byte offset `end`.
    pub fn advance_to(&mut self, end: usize) {
        while self.pos.offset < end && self.advance().is_some() {}
    }

    /// Consume characters while `pred` holds and return them.
    pub fn advance_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.pos.offset;
        while self.peek(0).is_some_and(&mut pred) {
            self.advance();
        }
        &self.source[start..self.pos.offset]
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[start..end]
    }

    /// Span from `start` to the current position.
    pub fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.pos)
    }

    fn newline(&mut self) {
        self.pos.line += 1;
        self.pos.column = 1;
    }
}
