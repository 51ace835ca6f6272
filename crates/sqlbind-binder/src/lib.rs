//! sqlbind Binder - placeholder normalization and type inference
//!
//! The binder takes one parsed SQL statement and resolves, against the
//! schema snapshot:
//! - column references (through aliases, joins and subqueries)
//! - result column types and conservative nullability
//! - placeholder positions, their contextual types and tuple order
//!
//! It never executes anything; the output is the statement's inferred
//! params/result contract. Failures it can localize degrade the affected
//! field to `Unknown` and are recorded, so one bad expression does not take
//! down the statement, let alone its siblings.

mod expression;
mod params;
mod scope;
mod statement;

pub use params::{lexical_params, ParamCollector};
pub use scope::{BindScope, TableBinding};
pub use statement::bind_statement;

use sqlbind_common::{Error, FieldType, ResultShape};

/// A statement's inferred bindings: the ordered params tuple and the result
/// shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundQuery {
    /// Tuple order is placeholder first-appearance order
    pub params: Vec<FieldType>,
    pub result: ResultShape,
}

impl BoundQuery {
    /// True if any param or result field degraded to `Unknown`.
    pub fn has_unknown(&self) -> bool {
        self.params.iter().any(FieldType::is_unknown) || self.result.has_unknown_field()
    }
}

/// Bindings plus everything recorded while inferring them. This is what the
/// descriptor cache stores: it carries the statement-scoped problems so a
/// cache hit replays the same diagnostics as the original computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    pub query: BoundQuery,
    /// Statement-scoped errors (resolution, conflicts); the statement's
    /// descriptor is still emitted, degraded where the errors struck
    pub errors: Vec<Error>,
    /// Informational notes that do not degrade anything
    pub warnings: Vec<String>,
}

impl BindOutcome {
    /// The fully-degraded outcome for a statement that could not be analyzed
    /// at all. Params come from the lexical marker scan so the tuple arity
    /// survives even without a parse tree.
    pub fn degraded(params: Vec<FieldType>, error: Error) -> Self {
        BindOutcome {
            query: BoundQuery {
                params,
                result: ResultShape::Unknown,
            },
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    /// A statement counts as unresolved when anything about it degraded;
    /// the run's completion status reports this even though processing
    /// continued.
    pub fn unresolved(&self) -> bool {
        !self.errors.is_empty() || self.query.has_unknown()
    }
}
