//! Column definition

use sqlbind_common::FieldType;

/// A column in a snapshot table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Folded column name
    pub name: String,
    /// Semantic type and nullability
    pub field: FieldType,
}

impl Column {
    pub fn new(name: impl Into<String>, field: FieldType) -> Self {
        Column {
            name: name.into(),
            field,
        }
    }
}
