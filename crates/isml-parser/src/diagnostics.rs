//! Parse diagnostics.
//!
//! Every recoverable problem becomes a [`Diagnostic`] record; the parser never
//! stops early. Codes are stable and can be used for suppression rules.

use isml_lexer::Span;
use std::fmt;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    /// The parser recovered and the structure is still sound.
    Warning,
    /// The template is structurally invalid; the tree holds a best-effort recovery.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Stable diagnostic identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DiagnosticCode {
    // Lexical
    UnterminatedTag,
    UnterminatedExpression,
    UnterminatedComment,
    UnterminatedAttributeValue,

    // Structural
    UnexpectedClosingTag,
    MismatchedNesting,
    UnterminatedElement,
    ClosingVoidTag,

    // Advisory
    EmptyExpression,
    UnexpectedCharacter,
    TooManyErrors,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UnterminatedTag => "ISML001",
            DiagnosticCode::UnterminatedExpression => "ISML002",
            DiagnosticCode::UnterminatedComment => "ISML003",
            DiagnosticCode::UnterminatedAttributeValue => "ISML004",
            DiagnosticCode::UnexpectedClosingTag => "ISML101",
            DiagnosticCode::MismatchedNesting => "ISML102",
            DiagnosticCode::UnterminatedElement => "ISML103",
            DiagnosticCode::ClosingVoidTag => "ISML104",
            DiagnosticCode::EmptyExpression => "ISML201",
            DiagnosticCode::UnexpectedCharacter => "ISML202",
            DiagnosticCode::TooManyErrors => "ISML299",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagnosticCode::ClosingVoidTag
            | DiagnosticCode::EmptyExpression
            | DiagnosticCode::UnexpectedCharacter
            | DiagnosticCode::TooManyErrors => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected syntax problem.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: code.severity(),
            code,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render as `name:line:column: severity[code]: message`.
    pub fn render(&self, name: Option<&str>) -> String {
        format!(
            "{}:{}:{}: {}[{}]: {}",
            name.unwrap_or("<template>"),
            self.span.line,
            self.span.column,
            self.severity,
            self.code,
            self.message
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] at line {}, column {}: {}",
            self.severity, self.code, self.span.line, self.span.column, self.message
        )
    }
}

/// Append-only collector used during a parse.
///
/// Problems found at end of input (such as elements never closed) are
/// anchored where they open, so records are sorted when the parse finishes.
///
/// With a `max_errors` cap, errors past the cap are counted but not recorded;
/// [`Diagnostics::finish`] then appends a single `TooManyErrors` warning.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    max_errors: Option<usize>,
    errors: usize,
    suppressed: usize,
}

impl Diagnostics {
    pub fn new(max_errors: Option<usize>) -> Self {
        Self {
            max_errors,
            ..Self::default()
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            if self.max_errors.is_some_and(|max| self.errors >= max) {
                self.suppressed += 1;
                return;
            }
            self.errors += 1;
        }
        tracing::debug!(code = %diagnostic.code, line = diagnostic.span.line, "{}", diagnostic.message);
        self.records.push(diagnostic);
    }

    pub fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::new(code, message, span));
    }

    /// Errors seen so far, including suppressed ones.
    pub fn error_count(&self) -> usize {
        self.errors + self.suppressed
    }

    /// Close the collector and hand out the records in source order. Records
    /// at the same offset keep their detection order.
    pub fn finish(mut self, end: Span) -> Vec<Diagnostic> {
        self.records.sort_by_key(|d| d.span.start);
        if self.suppressed > 0 {
            let message = format!("{} further errors were not reported", self.suppressed);
            self.records
                .push(Diagnostic::new(DiagnosticCode::TooManyErrors, message, end));
        }
        self.records
    }
}
