//! The inference engine
//!
//! Wires the pipeline per statement - extract, normalize, resolve, infer,
//! synthesize - over one or more documents. Documents are independent and
//! processed in parallel; the only shared state is the read-only snapshot,
//! the binding cache and the append-only diagnostics sink, so no result
//! depends on processing order.

use rayon::prelude::*;
use sqlbind_binder::{bind_statement, lexical_params, BindOutcome};
use sqlbind_catalog::{load_with_timeout, SchemaSnapshot, SchemaSource};
use sqlbind_common::{Diagnostic, DiagnosticSink, Result, Severity};
use sqlbind_extract::{extract_document, parse_statement, QueryStatement};
use sqlbind_synth::{degraded_descriptor, synthesize, BindingCache, CacheKey, QueryDescriptor};
use std::time::Duration;
use tracing::debug;

/// One run's engine: the snapshot, the binding cache and the sink, with a
/// per-run lifetime. Concurrent runs each construct their own.
pub struct Engine {
    snapshot: SchemaSnapshot,
    cache: BindingCache,
    sink: DiagnosticSink,
}

/// One document's descriptors, in statement order.
#[derive(Debug)]
pub struct DocumentBindings {
    pub document: String,
    pub queries: Vec<QueryDescriptor>,
}

/// What a completed run hands back: every descriptor grouped per document,
/// the full diagnostics list, and whether the run should be reported as
/// failed.
#[derive(Debug)]
pub struct RunSummary {
    pub documents: Vec<DocumentBindings>,
    pub diagnostics: Vec<Diagnostic>,
    /// True if any diagnostic is fatal or any statement remained unresolved,
    /// even though processing continued past individual failures
    pub failed: bool,
}

impl RunSummary {
    /// All descriptors across documents, flattened in input order.
    pub fn descriptors(&self) -> impl Iterator<Item = &QueryDescriptor> {
        self.documents.iter().flat_map(|d| d.queries.iter())
    }
}

impl Engine {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Engine {
            snapshot,
            cache: BindingCache::new(),
            sink: DiagnosticSink::new(),
        }
    }

    /// Acquire the snapshot from a live source under a deadline, then build
    /// the engine. Expiry or any load failure is run-fatal.
    pub fn from_source<S>(source: S, timeout: Duration) -> Result<Self>
    where
        S: SchemaSource + 'static,
    {
        let snapshot = load_with_timeout(source, timeout)?;
        Ok(Engine::new(snapshot))
    }

    pub fn snapshot(&self) -> &SchemaSnapshot {
        &self.snapshot
    }

    /// Process one document, pushing its diagnostics to the shared sink.
    pub fn process_document(&self, document: &str, text: &str) -> Vec<QueryDescriptor> {
        let (descriptors, diagnostics, _) = self.process_inner(document, text);
        self.sink.extend(diagnostics);
        descriptors
    }

    /// Process a batch of `(document name, text)` pairs in parallel.
    /// Descriptor and diagnostic order follows input order, not completion
    /// order, so runs are deterministic.
    pub fn run(&self, documents: &[(String, String)]) -> RunSummary {
        let results: Vec<_> = documents
            .par_iter()
            .map(|(name, text)| (name, self.process_inner(name, text)))
            .collect();

        let mut grouped = Vec::with_capacity(results.len());
        let mut unresolved_any = false;
        for (name, (descriptors, diagnostics, unresolved)) in results {
            grouped.push(DocumentBindings {
                document: name.clone(),
                queries: descriptors,
            });
            self.sink.extend(diagnostics);
            unresolved_any |= unresolved;
        }

        let diagnostics = self.sink.snapshot();
        let failed =
            unresolved_any || diagnostics.iter().any(|d| d.severity == Severity::Fatal);
        RunSummary {
            documents: grouped,
            diagnostics,
            failed,
        }
    }

    fn process_inner(
        &self,
        document: &str,
        text: &str,
    ) -> (Vec<QueryDescriptor>, Vec<Diagnostic>, bool) {
        let extraction = extract_document(document, text);
        debug!(
            document,
            statements = extraction.statements.len(),
            "document extracted"
        );

        let mut diagnostics = Vec::new();
        let mut descriptors = Vec::with_capacity(extraction.statements.len());
        let mut unresolved = false;

        for (id, error) in &extraction.errors {
            diagnostics.push(Diagnostic::for_statement(id.clone(), error));
        }
        let naming_failed: Vec<usize> =
            extraction.errors.iter().map(|(id, _)| id.index).collect();

        for statement in &extraction.statements {
            if naming_failed.contains(&statement.id.index) {
                descriptors.push(degraded_descriptor(statement));
                unresolved = true;
                continue;
            }

            let key = CacheKey::new(&statement.text, self.snapshot.version());
            let outcome = self
                .cache
                .get_or_compute(key, || self.analyze(statement));

            for error in &outcome.errors {
                diagnostics.push(Diagnostic::for_statement(statement.id.clone(), error));
            }
            for warning in &outcome.warnings {
                diagnostics.push(Diagnostic::warning(statement.id.clone(), warning.clone()));
            }
            unresolved |= outcome.unresolved();
            descriptors.push(synthesize(statement, &outcome.query));
        }

        (descriptors, diagnostics, unresolved)
    }

    /// Parse and bind one statement; anything the parser or binder rejects
    /// outright degrades to an Unknown descriptor with lexically recovered
    /// params, and the run continues.
    fn analyze(&self, statement: &QueryStatement) -> BindOutcome {
        let parsed = match parse_statement(&statement.text) {
            Ok(parsed) => parsed,
            Err(error) => {
                return BindOutcome::degraded(lexical_params(&statement.text), error);
            }
        };
        match bind_statement(&self.snapshot, &parsed) {
            Ok(outcome) => outcome,
            Err(error) => BindOutcome::degraded(lexical_params(&statement.text), error),
        }
    }
}
