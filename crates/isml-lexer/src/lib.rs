//! ISML Lexer
//!
//! Tokenizes ISML template source into a lazy stream of tokens.
//! Handles markup text, opening and closing tags with attributes,
//! `${...}` and `#...#` expressions, `<!--- --->` and `<iscomment>` comments,
//! and raw-text element bodies.
//!
//! # Example
//!
//! ```
//! use isml_lexer::{Lexer, TokenKind};
//!
//! let tokens = Lexer::tokenize("");
//! assert_eq!(tokens.len(), 1); // Just EndOfInput
//! assert_eq!(tokens[0].kind, TokenKind::EndOfInput);
//! ```

pub mod lexer;
pub mod reader;
pub mod token;
pub mod vocabulary;

pub use lexer::{CommentStyle, ExpressionDelimiter, Lexer};
pub use reader::SourceReader;
pub use token::{Position, Span, Token, TokenKind};
pub use vocabulary::TagScope;

/// A recoverable lexical problem with its location.
///
/// The lexer never stops on these; it skips the offending characters and
/// records one of these for the caller to report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Lexer warning at line {}, column {}: {message}", .span.line, .span.column)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}
