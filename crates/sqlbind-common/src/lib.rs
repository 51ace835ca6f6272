//! sqlbind Common - Core types shared across all crates
//!
//! This crate provides the foundational types used throughout sqlbind:
//! - `SemanticType`: the inferred type model, with an explicit `Unknown` variant
//! - `FieldType`: a semantic type plus explicit nullability
//! - `Error`: unified error taxonomy
//! - `DiagnosticSink`: the append-only per-run diagnostics collector

pub mod diag;
pub mod error;
pub mod types;

pub use diag::{Diagnostic, DiagnosticSink, Severity, StatementId};
pub use error::{Error, Result};
pub use types::{FieldType, ResultColumn, ResultShape, SemanticType};
