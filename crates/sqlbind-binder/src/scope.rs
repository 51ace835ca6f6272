//! Binding scope
//!
//! The scope is what a statement's expressions can see: one entry per table
//! brought in by FROM/JOIN (base tables, derived tables, CTEs), each knowing
//! whether it sits on the optional side of an outer join. Scopes chain to a
//! parent for correlated subqueries.

use sqlbind_common::{Error, FieldType, Result, ResultColumn};
use sqlbind_catalog::Table;
use std::sync::Arc;

/// One table visible to the statement's expressions.
#[derive(Debug, Clone)]
pub struct TableBinding {
    /// Alias if given, else the table name; qualifiers match against this
    pub display: String,
    /// The columns this binding exposes (a snapshot table, or a synthetic
    /// one built from a derived table / CTE)
    pub table: Arc<Table>,
    /// True when the binding sits on the optional side of an outer join:
    /// every column reached through it is nullable regardless of its
    /// declared constraint
    pub optional: bool,
}

impl TableBinding {
    pub fn new(display: impl Into<String>, table: Arc<Table>) -> Self {
        TableBinding {
            display: display.into(),
            table,
            optional: false,
        }
    }

    fn matches(&self, qualifier: &str) -> bool {
        self.display == qualifier
    }

    /// The column's type as seen through this binding.
    fn column_field(&self, column: &str) -> Option<FieldType> {
        self.table.column(column).map(|c| {
            FieldType::new(c.field.semantic.clone(), c.field.nullable || self.optional)
        })
    }
}

/// The tables visible to one query level, chained to the enclosing level.
pub struct BindScope<'a> {
    pub tables: Vec<TableBinding>,
    pub parent: Option<&'a BindScope<'a>>,
}

impl<'a> BindScope<'a> {
    pub fn new(tables: Vec<TableBinding>, parent: Option<&'a BindScope<'a>>) -> Self {
        BindScope { tables, parent }
    }

    pub fn empty() -> BindScope<'static> {
        BindScope {
            tables: Vec::new(),
            parent: None,
        }
    }

    /// Resolve a (possibly qualified) column reference. Qualifier and column
    /// are already folded.
    pub fn resolve(&self, qualifier: Option<&str>, column: &str) -> Result<FieldType> {
        match qualifier {
            Some(q) => {
                if let Some(binding) = self.tables.iter().find(|b| b.matches(q)) {
                    return binding
                        .column_field(column)
                        .ok_or_else(|| Error::ColumnNotFound(format!("{q}.{column}")));
                }
                match self.parent {
                    Some(parent) => parent.resolve(qualifier, column),
                    None => Err(Error::TableNotFound(q.to_string())),
                }
            }
            None => {
                let mut matches = self
                    .tables
                    .iter()
                    .filter_map(|b| b.column_field(column))
                    .collect::<Vec<_>>();
                match matches.len() {
                    0 => match self.parent {
                        Some(parent) => parent.resolve(qualifier, column),
                        None => Err(Error::ColumnNotFound(column.to_string())),
                    },
                    1 => Ok(matches.pop().unwrap()),
                    _ => Err(Error::AmbiguousColumn(column.to_string())),
                }
            }
        }
    }

    /// Expand `*` or `qualifier.*` into result columns, in declaration order.
    /// Only the current level participates; wildcards never reach outward.
    pub fn expand_wildcard(&self, qualifier: Option<&str>) -> Result<Vec<ResultColumn>> {
        let mut columns = Vec::new();
        let mut found = qualifier.is_none();

        for binding in &self.tables {
            if let Some(q) = qualifier {
                if !binding.matches(q) {
                    continue;
                }
                found = true;
            }
            for column in &binding.table.columns {
                columns.push(ResultColumn::new(
                    column.name.clone(),
                    FieldType::new(
                        column.field.semantic.clone(),
                        column.field.nullable || binding.optional,
                    ),
                    format!("{}.{}", binding.display, column.name),
                ));
            }
        }

        if !found {
            return Err(Error::TableNotFound(
                qualifier.unwrap_or_default().to_string(),
            ));
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbind_catalog::{Column, Table};
    use sqlbind_common::SemanticType;

    fn binding(display: &str, optional: bool) -> TableBinding {
        let table = Arc::new(Table::new(
            display,
            vec![
                Column::new("id", FieldType::new(SemanticType::Integer, false)),
                Column::new("note", FieldType::new(SemanticType::Text, true)),
            ],
        ));
        let mut b = TableBinding::new(display, table);
        b.optional = optional;
        b
    }

    #[test]
    fn test_resolve_qualified() {
        let scope = BindScope::new(vec![binding("items", false)], None);
        let field = scope.resolve(Some("items"), "id").unwrap();
        assert_eq!(field, FieldType::new(SemanticType::Integer, false));
    }

    #[test]
    fn test_optional_side_forces_nullable() {
        let scope = BindScope::new(vec![binding("inv", true)], None);
        let field = scope.resolve(Some("inv"), "id").unwrap();
        assert!(field.nullable);
    }

    #[test]
    fn test_ambiguous_unqualified() {
        let scope = BindScope::new(vec![binding("a", false), binding("b", false)], None);
        assert_eq!(
            scope.resolve(None, "id").unwrap_err(),
            Error::AmbiguousColumn("id".into())
        );
    }

    #[test]
    fn test_parent_chain() {
        let outer = BindScope::new(vec![binding("items", false)], None);
        let inner = BindScope::new(vec![binding("quests", false)], Some(&outer));
        // "note" is ambiguous only within a level; the inner match wins
        assert!(inner.resolve(Some("items"), "id").is_ok());
    }

    #[test]
    fn test_wildcard_expansion_order() {
        let scope = BindScope::new(vec![binding("a", false), binding("b", true)], None);
        let cols = scope.expand_wildcard(None).unwrap();
        assert_eq!(cols.len(), 4);
        assert_eq!(cols[0].source, "a.id");
        assert!(!cols[0].field.nullable);
        // the optional side's non-null column turns nullable
        assert!(cols[2].field.nullable);
    }

    #[test]
    fn test_wildcard_unknown_qualifier() {
        let scope = BindScope::new(vec![binding("a", false)], None);
        assert_eq!(
            scope.expand_wildcard(Some("zz")).unwrap_err(),
            Error::TableNotFound("zz".into())
        );
    }
}
