//! sqlbind Extract - SQL parsing and statement extraction
//!
//! This crate wraps sqlparser-rs for the rest of the pipeline and splits
//! source documents into ordered, optionally named statements.

use sqlbind_common::{Error, Result};
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

mod document;

pub use document::{extract_document, ExtractedDocument, QueryStatement};

/// Parse a SQL string into a list of statements
pub fn parse_sql(sql: &str) -> Result<Vec<Statement>> {
    let dialect = GenericDialect {};
    Parser::parse_sql(&dialect, sql).map_err(|e| Error::Parse(e.to_string()))
}

/// Parse a single SQL statement
pub fn parse_statement(sql: &str) -> Result<Statement> {
    let statements = parse_sql(sql)?;
    if statements.len() != 1 {
        return Err(Error::Parse(format!(
            "expected 1 statement, got {}",
            statements.len()
        )));
    }
    Ok(statements.into_iter().next().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let result = parse_sql("SELECT 1");
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_placeholders() {
        let result = parse_sql("SELECT id FROM users WHERE name = $1 AND active = ?");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_error() {
        let result = parse_sql("SELECT * FORM users");
        assert!(result.is_err());
    }
}
