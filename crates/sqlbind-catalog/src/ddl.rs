//! Snapshot construction from `CREATE TABLE` DDL text
//!
//! A static schema description is one of the two snapshot sources (the other
//! being any live [`SchemaSource`](crate::SchemaSource) implementation). Only
//! enough DDL is understood to recover tables, columns, types and
//! nullability; other statements in the DDL text are skipped.

use crate::{fold_ident, Column, SchemaSnapshot, SnapshotBuilder, Table};
use sqlbind_common::{Error, FieldType, Result, SemanticType};
use sqlparser::ast as sql;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Map a SQL data type to its semantic type.
pub fn semantic_type_of(data_type: &sql::DataType) -> SemanticType {
    match data_type {
        sql::DataType::Boolean | sql::DataType::Bool => SemanticType::Boolean,
        sql::DataType::TinyInt(_) | sql::DataType::SmallInt(_) | sql::DataType::Int2(_) => {
            SemanticType::SmallInt
        }
        sql::DataType::Int(_) | sql::DataType::Integer(_) | sql::DataType::Int4(_) => {
            SemanticType::Integer
        }
        sql::DataType::BigInt(_) | sql::DataType::Int8(_) => SemanticType::BigInt,
        sql::DataType::Float(_) | sql::DataType::Real | sql::DataType::Float4 => {
            SemanticType::Float
        }
        sql::DataType::Double | sql::DataType::DoublePrecision | sql::DataType::Float8 => {
            SemanticType::Double
        }
        sql::DataType::Decimal(_) | sql::DataType::Numeric(_) | sql::DataType::Dec(_) => {
            SemanticType::Decimal
        }
        sql::DataType::Char(_)
        | sql::DataType::Character(_)
        | sql::DataType::CharVarying(_)
        | sql::DataType::CharacterVarying(_)
        | sql::DataType::Varchar(_)
        | sql::DataType::Text
        | sql::DataType::String(_) => SemanticType::Text,
        sql::DataType::Bytea | sql::DataType::Blob(_) | sql::DataType::Binary(_) => {
            SemanticType::Bytes
        }
        sql::DataType::Uuid => SemanticType::Uuid,
        sql::DataType::Date => SemanticType::Date,
        sql::DataType::Time(_, _) => SemanticType::Time,
        // Timestamp with timezone must come before the generic form
        sql::DataType::Timestamp(_, sql::TimezoneInfo::Tz)
        | sql::DataType::Timestamp(_, sql::TimezoneInfo::WithTimeZone) => {
            SemanticType::TimestampTz
        }
        sql::DataType::Timestamp(_, _) | sql::DataType::Datetime(_) => SemanticType::Timestamp,
        sql::DataType::JSON | sql::DataType::JSONB => SemanticType::Json,
        sql::DataType::Array(inner) => match inner {
            sql::ArrayElemTypeDef::AngleBracket(inner_type)
            | sql::ArrayElemTypeDef::SquareBracket(inner_type, _)
            | sql::ArrayElemTypeDef::Parenthesis(inner_type) => {
                SemanticType::Array(Box::new(semantic_type_of(inner_type)))
            }
            sql::ArrayElemTypeDef::None => SemanticType::Array(Box::new(SemanticType::Unknown)),
        },
        sql::DataType::Custom(name, _) => custom_type(name),
        _ => SemanticType::Unknown,
    }
}

/// PostgreSQL serial pseudo-types and other names sqlparser leaves custom.
fn custom_type(name: &sql::ObjectName) -> SemanticType {
    let type_name = name
        .0
        .last()
        .map(|i| i.value.to_lowercase())
        .unwrap_or_default();
    match type_name.as_str() {
        "serial" | "serial4" => SemanticType::Integer,
        "bigserial" | "serial8" => SemanticType::BigInt,
        "smallserial" | "serial2" => SemanticType::SmallInt,
        _ => SemanticType::Unknown,
    }
}

fn is_serial(data_type: &sql::DataType) -> bool {
    if let sql::DataType::Custom(name, _) = data_type {
        matches!(
            name.0
                .last()
                .map(|i| i.value.to_lowercase())
                .unwrap_or_default()
                .as_str(),
            "serial" | "serial4" | "bigserial" | "serial8" | "smallserial" | "serial2"
        )
    } else {
        false
    }
}

fn fold_object_name(name: &sql::ObjectName) -> String {
    // Qualified names resolve by their last segment; the snapshot is flat.
    name.0
        .last()
        .map(|i| fold_ident(&i.value, i.quote_style.is_some()))
        .unwrap_or_default()
}

pub(crate) fn snapshot_from_ddl(ddl: &str) -> Result<SchemaSnapshot> {
    let dialect = GenericDialect {};
    let statements =
        Parser::parse_sql(&dialect, ddl).map_err(|e| Error::Schema(e.to_string()))?;

    let mut builder = SnapshotBuilder::new();
    for statement in &statements {
        match statement {
            sql::Statement::CreateTable(create) => {
                builder = builder.table_raw(table_from_create(create));
            }
            other => {
                debug!(statement = %other, "skipping non-table DDL statement");
            }
        }
    }
    Ok(builder.build())
}

fn table_from_create(create: &sql::CreateTable) -> Table {
    let table_name = fold_object_name(&create.name);

    // Columns named by table-level PRIMARY KEY constraints are non-null.
    let mut pk_columns: Vec<String> = Vec::new();
    for constraint in &create.constraints {
        if let sql::TableConstraint::PrimaryKey { columns, .. } = constraint {
            pk_columns.extend(
                columns
                    .iter()
                    .map(|c| fold_ident(&c.value, c.quote_style.is_some())),
            );
        }
    }

    let columns = create
        .columns
        .iter()
        .map(|col| {
            let name = fold_ident(&col.name.value, col.name.quote_style.is_some());
            let semantic = semantic_type_of(&col.data_type);

            let not_null = col.options.iter().any(|opt| {
                matches!(
                    opt.option,
                    sql::ColumnOption::NotNull
                        | sql::ColumnOption::Unique {
                            is_primary: true,
                            ..
                        }
                )
            });
            let nullable =
                !not_null && !is_serial(&col.data_type) && !pk_columns.contains(&name);

            Column::new(name, FieldType::new(semantic, nullable))
        })
        .collect();

    Table::new(table_name, columns)
}
