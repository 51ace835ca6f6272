//! Run diagnostics
//!
//! Statement-scoped failures are recorded here instead of aborting the run.
//! The sink is append-only and shared by every worker; it is the only mutable
//! state a run carries besides the descriptor cache.

use crate::error::Error;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;

/// Identifies one statement within one source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StatementId {
    /// Source document name (usually a path)
    pub document: String,
    /// Zero-based index of the statement within the document
    pub index: usize,
}

impl StatementId {
    pub fn new(document: impl Into<String>, index: usize) -> Self {
        StatementId {
            document: document.into(),
            index,
        }
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
    /// Aborts the run (schema acquisition failures)
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// One diagnostic entry covering the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// The statement this diagnostic is bound to; `None` for run-level entries
    pub statement: Option<StatementId>,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn for_statement(id: StatementId, error: &Error) -> Self {
        let severity = if error.is_fatal() {
            Severity::Fatal
        } else {
            Severity::Error
        };
        Diagnostic {
            statement: Some(id),
            message: error.to_string(),
            severity,
        }
    }

    pub fn warning(id: StatementId, message: impl Into<String>) -> Self {
        Diagnostic {
            statement: Some(id),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Diagnostic {
            statement: None,
            message: message.into(),
            severity: Severity::Fatal,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.statement {
            Some(id) => write!(f, "{}: {}: {}", self.severity, id, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Append-only collector shared across all documents of one run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }

    /// Appends a whole batch under one lock so per-document diagnostics stay
    /// contiguous regardless of worker interleaving.
    pub fn extend(&self, batch: impl IntoIterator<Item = Diagnostic>) {
        self.entries.lock().extend(batch);
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn has_fatal(&self) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|d| d.severity == Severity::Fatal)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_collects_in_order() {
        let sink = DiagnosticSink::new();
        sink.push(Diagnostic::warning(
            StatementId::new("a.sql", 0),
            "first",
        ));
        sink.push(Diagnostic::for_statement(
            StatementId::new("a.sql", 1),
            &Error::TableNotFound("ghosts".into()),
        ));
        let entries = sink.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert_eq!(entries[1].severity, Severity::Error);
        assert!(!sink.has_fatal());
    }

    #[test]
    fn test_fatal_detection() {
        let sink = DiagnosticSink::new();
        sink.push(Diagnostic::fatal("schema source timed out"));
        assert!(sink.has_fatal());
    }

    #[test]
    fn test_display_includes_statement() {
        let d = Diagnostic::for_statement(
            StatementId::new("queries.sql", 3),
            &Error::AmbiguousColumn("id".into()),
        );
        assert_eq!(d.to_string(), "error: queries.sql#3: ambiguous column reference: id");
    }
}
