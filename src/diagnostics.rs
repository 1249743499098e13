//! Severity-tagged diagnostics with source-context rendering.

use crate::tokens::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Hint => "HINT",
        }
    }
}

/// A single recorded diagnostic. `source` tags which stage produced it
/// (e.g. `"lexer"`, `"parser"`, `"evaluator"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub source: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, span: Span, source: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            span,
            source: source.into(),
        }
    }

    /// Renders this entry as `<line>:<col> [<SEVERITY>] (<source>) <message>`,
    /// followed by the offending source line and a caret under the start column.
    pub fn render(&self, source_text: &str) -> String {
        let mut out = format!(
            "{}:{} [{}] ({}) {}\n",
            self.span.start.line,
            self.span.start.column,
            self.severity.label(),
            self.source,
            self.message
        );
        if let Some(line) = source_text.lines().nth(self.span.start.line.saturating_sub(1)) {
            out.push_str(line);
            out.push('\n');
            let col = self.span.start.column.saturating_sub(1);
            out.push_str(&" ".repeat(col));
            out.push('^');
        }
        out
    }
}

/// Collects diagnostics in insertion order for a single pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, span: Span, source: impl Into<String>) {
        self.record(Diagnostic::new(Severity::Error, message, span, source));
    }

    pub fn warning(&mut self, message: impl Into<String>, span: Span, source: impl Into<String>) {
        self.record(Diagnostic::new(Severity::Warning, message, span, source));
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// Renders every entry, one after another, separated by a blank line.
    pub fn render_all(&self, source_text: &str) -> String {
        self.entries
            .iter()
            .map(|d| d.render(source_text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
