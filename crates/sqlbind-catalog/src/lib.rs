//! sqlbind Catalog - the immutable schema snapshot
//!
//! The snapshot is the read-only picture of the database a run resolves
//! against: tables, their columns, each column's semantic type and
//! nullability. It is loaded once, synchronously, before any inference
//! begins, and never mutated afterwards; a version fingerprint keys the
//! per-statement descriptor cache.

use fxhash::FxHasher;
use hashbrown::HashMap;
use sqlbind_common::{Error, FieldType, Result};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

mod column;
mod ddl;
mod source;
mod table;

pub use column::Column;
pub use ddl::semantic_type_of;
pub use source::{load_with_timeout, DdlSource, SchemaSource};
pub use table::Table;

/// Apply the snapshot's identifier-folding rule to a raw identifier:
/// unquoted identifiers fold to lowercase, quoted identifiers are exact.
pub fn fold_ident(raw: &str, quoted: bool) -> String {
    if quoted {
        raw.to_string()
    } else {
        raw.to_lowercase()
    }
}

/// An immutable, normalized schema snapshot.
#[derive(Debug)]
pub struct SchemaSnapshot {
    tables: HashMap<String, Arc<Table>>,
    version: u64,
}

impl SchemaSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Build a snapshot from `CREATE TABLE` DDL text.
    pub fn from_ddl(sql: &str) -> Result<Self> {
        ddl::snapshot_from_ddl(sql)
    }

    /// Get a table by its folded name.
    pub fn table(&self, folded_name: &str) -> Option<&Arc<Table>> {
        self.tables.get(folded_name)
    }

    /// Look up a column's type by folded table and column name.
    pub fn lookup(&self, table: &str, column: &str) -> Result<&Column> {
        let table_entry = self
            .tables
            .get(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        table_entry
            .column(column)
            .ok_or_else(|| Error::ColumnNotFound(format!("{table}.{column}")))
    }

    /// The snapshot's content fingerprint. Identical schemas fingerprint
    /// identically, regardless of construction order.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Folded table names, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Builds an immutable snapshot; the only mutation path.
pub struct SnapshotBuilder {
    tables: Vec<Table>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        SnapshotBuilder { tables: Vec::new() }
    }

    /// Add a table. The name and column names are folded with the unquoted
    /// rule; callers with quoted DDL identifiers should pre-fold via
    /// [`fold_ident`].
    pub fn table(
        mut self,
        name: &str,
        columns: impl IntoIterator<Item = (&'static str, FieldType)>,
    ) -> Self {
        let columns = columns
            .into_iter()
            .map(|(col_name, field)| Column::new(fold_ident(col_name, false), field))
            .collect();
        self.tables.push(Table::new(fold_ident(name, false), columns));
        self
    }

    /// Add an already-folded table.
    pub fn table_raw(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn build(self) -> SchemaSnapshot {
        let version = fingerprint(&self.tables);
        let tables = self
            .tables
            .into_iter()
            .map(|t| (t.name.clone(), Arc::new(t)))
            .collect();
        SchemaSnapshot { tables, version }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash the normalized snapshot contents: tables in sorted-name order,
/// columns in declaration order (declaration order is observable through
/// wildcard expansion, so it is part of the schema's identity).
fn fingerprint(tables: &[Table]) -> u64 {
    let mut sorted: Vec<&Table> = tables.iter().collect();
    sorted.sort_unstable_by(|a, b| a.name.cmp(&b.name));

    let mut hasher = FxHasher::default();
    for table in sorted {
        table.name.hash(&mut hasher);
        for column in &table.columns {
            column.name.hash(&mut hasher);
            column.field.semantic.to_string().hash(&mut hasher);
            column.field.nullable.hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbind_common::SemanticType;

    fn items_snapshot() -> SchemaSnapshot {
        SchemaSnapshot::builder()
            .table(
                "Items",
                [
                    ("id", FieldType::new(SemanticType::Integer, false)),
                    ("Name", FieldType::new(SemanticType::Text, false)),
                    ("flavor_text", FieldType::new(SemanticType::Text, true)),
                ],
            )
            .build()
    }

    #[test]
    fn test_lookup_folds_case() {
        let snapshot = items_snapshot();
        let column = snapshot.lookup("items", "name").unwrap();
        assert_eq!(column.field.semantic, SemanticType::Text);
        assert!(!column.field.nullable);
    }

    #[test]
    fn test_lookup_unknown_column() {
        let snapshot = items_snapshot();
        let err = snapshot.lookup("items", "ghost").unwrap_err();
        assert_eq!(err, Error::ColumnNotFound("items.ghost".into()));
    }

    #[test]
    fn test_lookup_unknown_table() {
        let snapshot = items_snapshot();
        assert_eq!(
            snapshot.lookup("ghosts", "id").unwrap_err(),
            Error::TableNotFound("ghosts".into())
        );
    }

    #[test]
    fn test_fingerprint_ignores_table_order() {
        let a = SchemaSnapshot::builder()
            .table("a", [("x", FieldType::new(SemanticType::Integer, false))])
            .table("b", [("y", FieldType::new(SemanticType::Text, true))])
            .build();
        let b = SchemaSnapshot::builder()
            .table("b", [("y", FieldType::new(SemanticType::Text, true))])
            .table("a", [("x", FieldType::new(SemanticType::Integer, false))])
            .build();
        assert_eq!(a.version(), b.version());
    }

    #[test]
    fn test_fingerprint_tracks_nullability() {
        let a = SchemaSnapshot::builder()
            .table("a", [("x", FieldType::new(SemanticType::Integer, false))])
            .build();
        let b = SchemaSnapshot::builder()
            .table("a", [("x", FieldType::new(SemanticType::Integer, true))])
            .build();
        assert_ne!(a.version(), b.version());
    }

    #[test]
    fn test_quoted_fold_is_exact() {
        assert_eq!(fold_ident("MixedCase", true), "MixedCase");
        assert_eq!(fold_ident("MixedCase", false), "mixedcase");
    }
}
