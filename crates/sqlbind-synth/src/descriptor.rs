//! Descriptor assembly
//!
//! A descriptor is one statement's full contract for the external emitter:
//! its stable name, the ordered params tuple, and the result shape. Naming
//! must be reproducible: regenerating over unchanged input yields the same
//! identifiers, byte for byte.

use serde::Serialize;
use sqlbind_binder::{lexical_params, BoundQuery};
use sqlbind_common::{FieldType, ResultShape};
use sqlbind_extract::QueryStatement;

/// The inferred params+result contract for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDescriptor {
    /// Unique within the statement's document
    pub name: String,
    /// Ordered tuple, placeholder first-appearance order; empty if none
    pub params: Vec<FieldType>,
    pub result: ResultShape,
}

/// The statement's stable name: its explicit tag verbatim, else `Sql<N>`
/// where N is its 1-based ordinal among the document's untagged statements.
/// Appending statements never renames earlier ones.
pub fn descriptor_name(statement: &QueryStatement) -> String {
    match &statement.tag {
        Some(tag) => tag.clone(),
        None => format!("Sql{}", statement.ordinal.unwrap_or(0)),
    }
}

/// Assemble the final descriptor for a successfully bound statement.
pub fn synthesize(statement: &QueryStatement, bindings: &BoundQuery) -> QueryDescriptor {
    QueryDescriptor {
        name: descriptor_name(statement),
        params: bindings.params.clone(),
        result: bindings.result.clone(),
    }
}

/// The descriptor for a statement that never reached binding (naming
/// errors): params recovered lexically, every field explicitly Unknown.
pub fn degraded_descriptor(statement: &QueryStatement) -> QueryDescriptor {
    QueryDescriptor {
        name: descriptor_name(statement),
        params: lexical_params(&statement.text),
        result: ResultShape::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbind_common::{SemanticType, StatementId};

    fn statement(tag: Option<&str>, ordinal: Option<u32>, text: &str) -> QueryStatement {
        QueryStatement {
            id: StatementId::new("q.sql", 0),
            tag: tag.map(String::from),
            ordinal,
            text: text.to_string(),
            line: 1,
        }
    }

    #[test]
    fn test_tagged_name_is_verbatim() {
        let s = statement(Some("fetchItems"), None, "SELECT 1");
        assert_eq!(descriptor_name(&s), "fetchItems");
    }

    #[test]
    fn test_untagged_name_uses_ordinal() {
        let s = statement(None, Some(3), "SELECT 1");
        assert_eq!(descriptor_name(&s), "Sql3");
    }

    #[test]
    fn test_synthesize_copies_bindings() {
        let s = statement(None, Some(1), "SELECT id FROM t");
        let bindings = BoundQuery {
            params: vec![FieldType::new(SemanticType::Integer, false)],
            result: ResultShape::NoResult,
        };
        let descriptor = synthesize(&s, &bindings);
        assert_eq!(descriptor.name, "Sql1");
        assert_eq!(descriptor.params, bindings.params);
    }

    #[test]
    fn test_degraded_descriptor_keeps_arity() {
        let s = statement(None, Some(1), "SELEC x FROM t WHERE a = $1 AND b = $2");
        let descriptor = degraded_descriptor(&s);
        assert_eq!(descriptor.params.len(), 2);
        assert!(descriptor.params.iter().all(FieldType::is_unknown));
        assert_eq!(descriptor.result, ResultShape::Unknown);
    }
}
