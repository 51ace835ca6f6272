//! Table definition

use super::Column;

/// A table in the snapshot, columns in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Folded table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Table {
            name: name.into(),
            columns,
        }
    }

    /// Get a column by its folded name
    pub fn column(&self, folded_name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == folded_name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
