//! Statement binding
//!
//! Dispatches one parsed statement to its kind-specific inference: SELECT
//! result columns, INSERT/UPDATE/DELETE write bindings, RETURNING clauses.
//! The walk records placeholder sites as it goes; the collected tuple is
//! assembled at the end.

use crate::expression::{infer_expr, placeholder_of};
use crate::params::ParamCollector;
use crate::scope::{BindScope, TableBinding};
use crate::{BindOutcome, BoundQuery};
use sqlbind_catalog::{fold_ident, Column, SchemaSnapshot, Table};
use sqlbind_common::{Error, FieldType, Result, ResultColumn, ResultShape, SemanticType};
use sqlparser::ast as sql;
use std::sync::Arc;
use tracing::debug;

/// State carried through one statement's walk.
pub(crate) struct BindContext<'s> {
    pub snapshot: &'s SchemaSnapshot,
    pub params: ParamCollector,
    pub errors: Vec<Error>,
    pub warnings: Vec<String>,
}

impl<'s> BindContext<'s> {
    fn new(snapshot: &'s SchemaSnapshot) -> Self {
        BindContext {
            snapshot,
            params: ParamCollector::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Bind one parsed statement against the snapshot.
///
/// `Err` means the statement could not be analyzed structurally (unknown
/// table, unsupported shape); the caller degrades the whole descriptor.
/// Localized failures come back inside the outcome instead.
pub fn bind_statement(
    snapshot: &SchemaSnapshot,
    statement: &sql::Statement,
) -> Result<BindOutcome> {
    let mut cx = BindContext::new(snapshot);

    let result = match statement {
        sql::Statement::Query(query) => {
            ResultShape::Columns(infer_query(&mut cx, query, None, &[])?)
        }

        sql::Statement::Insert(insert) => bind_insert(&mut cx, insert)?,

        sql::Statement::Update {
            table,
            assignments,
            selection,
            returning,
            ..
        } => bind_update(&mut cx, table, assignments, selection, returning)?,

        sql::Statement::Delete(delete) => bind_delete(&mut cx, delete)?,

        // DDL and session statements appearing in a document produce no
        // bindings; note it and move on.
        _ => {
            cx.warnings
                .push("statement kind not analyzed; no bindings inferred".to_string());
            ResultShape::NoResult
        }
    };

    let (params, param_errors) = cx.params.finish();
    let mut errors = cx.errors;
    errors.extend(param_errors);

    debug!(
        params = params.len(),
        errors = errors.len(),
        "statement bound"
    );

    Ok(BindOutcome {
        query: BoundQuery { params, result },
        errors,
        warnings: cx.warnings,
    })
}

fn fold_object_name(name: &sql::ObjectName) -> String {
    // Qualified names resolve by their last segment; the snapshot is flat.
    name.0
        .last()
        .map(|i| fold_ident(&i.value, i.quote_style.is_some()))
        .unwrap_or_default()
}

/// Infer the result columns of a query, walking every clause that can carry
/// placeholders. `outer` chains the enclosing scope for correlated
/// subqueries; `ctes` are the WITH tables already in scope.
pub(crate) fn infer_query(
    cx: &mut BindContext,
    query: &sql::Query,
    outer: Option<&BindScope<'_>>,
    ctes: &[Arc<Table>],
) -> Result<Vec<ResultColumn>> {
    let mut cte_tables: Vec<Arc<Table>> = ctes.to_vec();
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let mut columns = infer_query(cx, &cte.query, outer, &cte_tables)?;
            for (i, alias) in cte.alias.columns.iter().enumerate() {
                if let Some(column) = columns.get_mut(i) {
                    column.name = alias.name.value.clone();
                }
            }
            let name = fold_ident(&cte.alias.name.value, cte.alias.name.quote_style.is_some());
            cte_tables.push(Arc::new(synthetic_table(name, &columns)));
        }
    }

    let columns = infer_set_expr(cx, &query.body, outer, &cte_tables, query.order_by.as_ref())?;

    if let Some(limit) = &query.limit {
        walk_count_expr(cx, limit);
    }
    if let Some(offset) = &query.offset {
        walk_count_expr(cx, &offset.value);
    }

    Ok(columns)
}

fn infer_set_expr(
    cx: &mut BindContext,
    body: &sql::SetExpr,
    outer: Option<&BindScope<'_>>,
    ctes: &[Arc<Table>],
    order_by: Option<&sql::OrderBy>,
) -> Result<Vec<ResultColumn>> {
    match body {
        sql::SetExpr::Select(select) => infer_select(cx, select, outer, ctes, order_by),
        sql::SetExpr::Query(inner) => infer_query(cx, inner, outer, ctes),
        sql::SetExpr::SetOperation { left, right, .. } => {
            let left_columns = infer_set_expr(cx, left, outer, ctes, None)?;
            let right_columns = infer_set_expr(cx, right, outer, ctes, None)?;
            Ok(merge_set_columns(cx, left_columns, right_columns))
        }
        sql::SetExpr::Values(values) => Ok(infer_values(cx, values)),
        _ => Err(Error::Parse("unsupported query body".to_string())),
    }
}

/// UNION-style arms merge column-wise: names from the first arm, types
/// widened, nullability ORed.
fn merge_set_columns(
    cx: &mut BindContext,
    mut left: Vec<ResultColumn>,
    right: Vec<ResultColumn>,
) -> Vec<ResultColumn> {
    if left.len() != right.len() {
        cx.errors.push(Error::Parse(format!(
            "set operation arms have {} and {} columns",
            left.len(),
            right.len()
        )));
    }
    for (l, r) in left.iter_mut().zip(right) {
        l.field.semantic = l.field.semantic.supertype(&r.field.semantic);
        l.field.nullable |= r.field.nullable;
    }
    left
}

fn infer_values(cx: &mut BindContext, values: &sql::Values) -> Vec<ResultColumn> {
    let scope = BindScope::empty();
    let mut columns = Vec::new();
    for (row_index, row) in values.rows.iter().enumerate() {
        for (i, expr) in row.iter().enumerate() {
            let field = infer_expr(cx, &scope, expr);
            if row_index == 0 {
                columns.push(ResultColumn::new(
                    format!("column{}", i + 1),
                    field,
                    expr.to_string(),
                ));
            }
        }
    }
    columns
}

fn infer_select(
    cx: &mut BindContext,
    select: &sql::Select,
    outer: Option<&BindScope<'_>>,
    ctes: &[Arc<Table>],
    order_by: Option<&sql::OrderBy>,
) -> Result<Vec<ResultColumn>> {
    let mut tables = Vec::new();
    let mut conditions = Vec::new();
    for table_with_joins in &select.from {
        let (bindings, on_exprs) = bind_table_with_joins(cx, table_with_joins, outer, ctes)?;
        tables.extend(bindings);
        conditions.extend(on_exprs);
    }
    let scope = BindScope::new(tables, outer);

    // Clause walk follows textual order so `?` markers keep their
    // appearance positions: projection, join conditions, then the rest.
    let columns = infer_items(cx, &scope, &select.projection);

    for condition in conditions {
        infer_expr(cx, &scope, condition);
    }

    if let Some(sql::Distinct::On(exprs)) = &select.distinct {
        for expr in exprs {
            infer_expr(cx, &scope, expr);
        }
    }
    if let Some(selection) = &select.selection {
        infer_expr(cx, &scope, selection);
    }
    if let sql::GroupByExpr::Expressions(exprs, _) = &select.group_by {
        for expr in exprs {
            infer_expr(cx, &scope, expr);
        }
    }
    if let Some(having) = &select.having {
        infer_expr(cx, &scope, having);
    }
    if let Some(qualify) = &select.qualify {
        infer_expr(cx, &scope, qualify);
    }
    if let Some(order_by) = order_by {
        for order in &order_by.exprs {
            infer_expr(cx, &scope, &order.expr);
        }
    }

    Ok(columns)
}

/// Bind one FROM entry and its join chain, marking optional sides and
/// collecting ON conditions for a later walk.
fn bind_table_with_joins<'q>(
    cx: &mut BindContext,
    table_with_joins: &'q sql::TableWithJoins,
    outer: Option<&BindScope<'_>>,
    ctes: &[Arc<Table>],
) -> Result<(Vec<TableBinding>, Vec<&'q sql::Expr>)> {
    let mut bindings = bind_table_factor(cx, &table_with_joins.relation, outer, ctes)?;
    let mut conditions = Vec::new();

    for join in &table_with_joins.joins {
        let mut right = bind_table_factor(cx, &join.relation, outer, ctes)?;

        match &join.join_operator {
            sql::JoinOperator::LeftOuter(_) => {
                for binding in &mut right {
                    binding.optional = true;
                }
            }
            sql::JoinOperator::RightOuter(_) => {
                for binding in &mut bindings {
                    binding.optional = true;
                }
            }
            sql::JoinOperator::FullOuter(_) => {
                for binding in bindings.iter_mut().chain(right.iter_mut()) {
                    binding.optional = true;
                }
            }
            _ => {}
        }

        match &join.join_operator {
            sql::JoinOperator::Inner(constraint)
            | sql::JoinOperator::LeftOuter(constraint)
            | sql::JoinOperator::RightOuter(constraint)
            | sql::JoinOperator::FullOuter(constraint)
            | sql::JoinOperator::LeftSemi(constraint)
            | sql::JoinOperator::LeftAnti(constraint)
            | sql::JoinOperator::RightSemi(constraint)
            | sql::JoinOperator::RightAnti(constraint) => {
                if let sql::JoinConstraint::On(expr) = constraint {
                    conditions.push(expr);
                }
            }
            _ => {}
        }

        bindings.extend(right);
    }

    Ok((bindings, conditions))
}

fn bind_table_factor(
    cx: &mut BindContext,
    factor: &sql::TableFactor,
    outer: Option<&BindScope<'_>>,
    ctes: &[Arc<Table>],
) -> Result<Vec<TableBinding>> {
    match factor {
        sql::TableFactor::Table { name, alias, .. } => {
            let table_name = fold_object_name(name);
            let display = alias
                .as_ref()
                .map(|a| fold_ident(&a.name.value, a.name.quote_style.is_some()));

            // CTEs shadow snapshot tables for single-part names.
            if name.0.len() == 1 {
                if let Some(cte) = ctes.iter().find(|t| t.name == table_name) {
                    return Ok(vec![TableBinding::new(
                        display.unwrap_or_else(|| table_name.clone()),
                        cte.clone(),
                    )]);
                }
            }

            let table = cx
                .snapshot
                .table(&table_name)
                .cloned()
                .ok_or_else(|| Error::TableNotFound(table_name.clone()))?;
            Ok(vec![TableBinding::new(
                display.unwrap_or(table_name),
                table,
            )])
        }

        sql::TableFactor::Derived {
            subquery, alias, ..
        } => {
            let mut columns = infer_query(cx, subquery, outer, ctes)?;
            let display = alias
                .as_ref()
                .map(|a| fold_ident(&a.name.value, a.name.quote_style.is_some()))
                .unwrap_or_else(|| "subquery".to_string());
            if let Some(alias) = alias {
                for (i, column_alias) in alias.columns.iter().enumerate() {
                    if let Some(column) = columns.get_mut(i) {
                        column.name = column_alias.name.value.clone();
                    }
                }
            }
            let table = Arc::new(synthetic_table(display.clone(), &columns));
            Ok(vec![TableBinding::new(display, table)])
        }

        sql::TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            let (bindings, conditions) = bind_table_with_joins(cx, table_with_joins, outer, ctes)?;
            // Nested join conditions only see the nested tables.
            let scope = BindScope::new(bindings, outer);
            for condition in conditions {
                infer_expr(cx, &scope, condition);
            }
            Ok(scope.tables)
        }

        _ => Err(Error::Parse("unsupported table reference".to_string())),
    }
}

/// A table standing in for a derived table or CTE, built from its inferred
/// result columns.
fn synthetic_table(name: String, columns: &[ResultColumn]) -> Table {
    Table::new(
        name,
        columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.field.clone()))
            .collect(),
    )
}

/// Infer the projection items, preserving declaration order and keeping
/// names unique (first occurrence wins).
fn infer_items(
    cx: &mut BindContext,
    scope: &BindScope,
    projection: &[sql::SelectItem],
) -> Vec<ResultColumn> {
    let mut columns: Vec<ResultColumn> = Vec::new();

    for (position, item) in projection.iter().enumerate() {
        match item {
            sql::SelectItem::UnnamedExpr(expr) => {
                let field = infer_expr(cx, scope, expr);
                let name = item_name(expr)
                    .unwrap_or_else(|| format!("column{}", position + 1));
                push_column(
                    cx,
                    &mut columns,
                    ResultColumn::new(name, field, expr.to_string()),
                );
            }
            sql::SelectItem::ExprWithAlias { expr, alias } => {
                let field = infer_expr(cx, scope, expr);
                push_column(
                    cx,
                    &mut columns,
                    ResultColumn::new(alias.value.clone(), field, expr.to_string()),
                );
            }
            sql::SelectItem::Wildcard(_) => match scope.expand_wildcard(None) {
                Ok(expanded) => {
                    for column in expanded {
                        push_column(cx, &mut columns, column);
                    }
                }
                Err(error) => cx.errors.push(error),
            },
            sql::SelectItem::QualifiedWildcard(name, _) => {
                let qualifier = fold_object_name(name);
                match scope.expand_wildcard(Some(&qualifier)) {
                    Ok(expanded) => {
                        for column in expanded {
                            push_column(cx, &mut columns, column);
                        }
                    }
                    Err(error) => cx.errors.push(error),
                }
            }
        }
    }

    columns
}

fn push_column(cx: &mut BindContext, columns: &mut Vec<ResultColumn>, column: ResultColumn) {
    if columns.iter().any(|c| c.name == column.name) {
        cx.warnings.push(format!(
            "duplicate result column name '{}'; keeping the first",
            column.name
        ));
    } else {
        columns.push(column);
    }
}

fn item_name(expr: &sql::Expr) -> Option<String> {
    match expr {
        sql::Expr::Identifier(ident) => {
            Some(fold_ident(&ident.value, ident.quote_style.is_some()))
        }
        sql::Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|i| fold_ident(&i.value, i.quote_style.is_some())),
        sql::Expr::Function(function) => function
            .name
            .0
            .last()
            .map(|i| i.value.to_lowercase()),
        sql::Expr::Cast { expr, .. } => item_name(expr),
        sql::Expr::Nested(inner) => item_name(inner),
        _ => None,
    }
}

/// LIMIT/OFFSET markers are non-null integers; nothing else to learn there.
fn walk_count_expr(cx: &mut BindContext, expr: &sql::Expr) {
    if let Some(marker) = placeholder_of(expr) {
        cx.params
            .record(marker, FieldType::new(SemanticType::Integer, false), false);
    }
}

fn returning_shape(
    cx: &mut BindContext,
    returning: &Option<Vec<sql::SelectItem>>,
    scope: &BindScope,
) -> ResultShape {
    match returning {
        // Write-only: the result is omitted entirely, not an empty record.
        None => ResultShape::NoResult,
        Some(items) => ResultShape::Columns(infer_items(cx, scope, items)),
    }
}

fn bind_insert(cx: &mut BindContext, insert: &sql::Insert) -> Result<ResultShape> {
    let table_name = fold_object_name(&insert.table_name);
    let table = cx
        .snapshot
        .table(&table_name)
        .cloned()
        .ok_or_else(|| Error::TableNotFound(table_name.clone()))?;

    // Markers in VALUES are typed by the column they land in.
    let target_fields: Vec<FieldType> = if insert.columns.is_empty() {
        table.columns.iter().map(|c| c.field.clone()).collect()
    } else {
        insert
            .columns
            .iter()
            .map(|ident| {
                let column = fold_ident(&ident.value, ident.quote_style.is_some());
                match table.column(&column) {
                    Some(c) => c.field.clone(),
                    None => {
                        cx.errors
                            .push(Error::ColumnNotFound(format!("{table_name}.{column}")));
                        FieldType::unknown()
                    }
                }
            })
            .collect()
    };

    if let Some(source) = &insert.source {
        match source.body.as_ref() {
            sql::SetExpr::Values(values) => {
                let scope = BindScope::empty();
                for row in &values.rows {
                    if row.len() != target_fields.len() {
                        cx.errors.push(Error::Parse(format!(
                            "INSERT row has {} values for {} columns",
                            row.len(),
                            target_fields.len()
                        )));
                    }
                    for (i, expr) in row.iter().enumerate() {
                        match placeholder_of(expr) {
                            Some(marker) => {
                                let field = target_fields
                                    .get(i)
                                    .cloned()
                                    .unwrap_or_else(FieldType::unknown);
                                cx.params.record(marker, field, false);
                            }
                            None => {
                                infer_expr(cx, &scope, expr);
                            }
                        }
                    }
                }
            }
            // INSERT ... SELECT: the source query carries its own scope.
            _ => {
                infer_query(cx, source, None, &[])?;
            }
        }
    }

    let scope = BindScope::new(
        vec![TableBinding::new(table_name, table)],
        None,
    );
    Ok(returning_shape(cx, &insert.returning, &scope))
}

fn bind_update(
    cx: &mut BindContext,
    table: &sql::TableWithJoins,
    assignments: &[sql::Assignment],
    selection: &Option<sql::Expr>,
    returning: &Option<Vec<sql::SelectItem>>,
) -> Result<ResultShape> {
    let (bindings, conditions) = bind_table_with_joins(cx, table, None, &[])?;
    let scope = BindScope::new(bindings, None);
    for condition in conditions {
        infer_expr(cx, &scope, condition);
    }

    for assignment in assignments {
        let target = match &assignment.target {
            sql::AssignmentTarget::ColumnName(name) => Some(name),
            sql::AssignmentTarget::Tuple(names) => names.first(),
        };
        let target_field = match target {
            Some(name) => {
                let parts = &name.0;
                let column = parts
                    .last()
                    .map(|i| fold_ident(&i.value, i.quote_style.is_some()))
                    .unwrap_or_default();
                let qualifier = (parts.len() >= 2)
                    .then(|| &parts[parts.len() - 2])
                    .map(|i| fold_ident(&i.value, i.quote_style.is_some()));
                match scope.resolve(qualifier.as_deref(), &column) {
                    Ok(field) => field,
                    Err(error) => {
                        cx.errors.push(error);
                        FieldType::unknown()
                    }
                }
            }
            None => FieldType::unknown(),
        };

        match placeholder_of(&assignment.value) {
            Some(marker) => cx.params.record(marker, target_field, false),
            None => {
                infer_expr(cx, &scope, &assignment.value);
            }
        }
    }

    if let Some(selection) = selection {
        infer_expr(cx, &scope, selection);
    }

    Ok(returning_shape(cx, returning, &scope))
}

fn bind_delete(cx: &mut BindContext, delete: &sql::Delete) -> Result<ResultShape> {
    let from = match &delete.from {
        sql::FromTable::WithFromKeyword(tables) => tables,
        sql::FromTable::WithoutKeyword(tables) => tables,
    };

    let mut bindings = Vec::new();
    let mut conditions = Vec::new();
    for table_with_joins in from {
        let (b, c) = bind_table_with_joins(cx, table_with_joins, None, &[])?;
        bindings.extend(b);
        conditions.extend(c);
    }
    if let Some(using) = &delete.using {
        for table_with_joins in using {
            let (b, c) = bind_table_with_joins(cx, table_with_joins, None, &[])?;
            bindings.extend(b);
            conditions.extend(c);
        }
    }

    let scope = BindScope::new(bindings, None);
    for condition in conditions {
        infer_expr(cx, &scope, condition);
    }
    if let Some(selection) = &delete.selection {
        infer_expr(cx, &scope, selection);
    }
    if let Some(limit) = &delete.limit {
        walk_count_expr(cx, limit);
    }

    Ok(returning_shape(cx, &delete.returning, &scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbind_common::SemanticType;

    fn snapshot() -> SchemaSnapshot {
        SchemaSnapshot::from_ddl(
            "CREATE TABLE items (
                 id INTEGER NOT NULL,
                 inventory_id INTEGER,
                 name TEXT NOT NULL,
                 rarity TEXT,
                 category TEXT NOT NULL,
                 active BOOLEAN NOT NULL
             );
             CREATE TABLE inventory (
                 id INTEGER NOT NULL,
                 quantity INTEGER,
                 capacity INTEGER NOT NULL
             );",
        )
        .unwrap()
    }

    fn bind(sql_text: &str) -> BindOutcome {
        let snapshot = snapshot();
        let statement = sqlparser::parser::Parser::parse_sql(
            &sqlparser::dialect::GenericDialect {},
            sql_text,
        )
        .unwrap()
        .remove(0);
        bind_statement(&snapshot, &statement).unwrap()
    }

    fn columns(outcome: &BindOutcome) -> &[ResultColumn] {
        match &outcome.query.result {
            ResultShape::Columns(cols) => cols,
            other => panic!("expected columns, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_select() {
        let outcome = bind("SELECT id, name FROM items");
        assert!(outcome.errors.is_empty());
        assert!(outcome.query.params.is_empty());
        let cols = columns(&outcome);
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].name, "id");
        assert_eq!(cols[0].field, FieldType::new(SemanticType::Integer, false));
        assert_eq!(cols[1].field, FieldType::new(SemanticType::Text, false));
    }

    #[test]
    fn test_where_params_typed_by_columns() {
        let outcome = bind("SELECT id FROM items WHERE category = $1 AND active = $2");
        assert_eq!(
            outcome.query.params,
            vec![
                FieldType::new(SemanticType::Text, false),
                FieldType::new(SemanticType::Boolean, false)
            ]
        );
    }

    #[test]
    fn test_param_first_appearance_order() {
        let outcome = bind(
            "SELECT id FROM items WHERE name = $2 AND category = $1 AND rarity = $1",
        );
        // $2 appears first, so its slot comes first
        assert_eq!(outcome.query.params.len(), 2);
        assert_eq!(outcome.query.params[0].semantic, SemanticType::Text);
        // $1 is used against category (non-null) and rarity (nullable);
        // the non-null site wins for the caller
        assert!(!outcome.query.params[1].nullable);
    }

    #[test]
    fn test_left_join_makes_right_side_nullable() {
        let outcome = bind(
            "SELECT items.name, inventory.capacity FROM items \
             LEFT JOIN inventory ON inventory.id = items.inventory_id",
        );
        let cols = columns(&outcome);
        assert!(!cols[0].field.nullable);
        // capacity is NOT NULL in the schema, but reached through the
        // optional side of the join
        assert!(cols[1].field.nullable);
    }

    #[test]
    fn test_wildcard_expansion_in_declaration_order() {
        let outcome = bind("SELECT * FROM inventory");
        let cols = columns(&outcome);
        assert_eq!(
            cols.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "quantity", "capacity"]
        );
        assert!(cols[1].field.nullable);
        assert!(!cols[2].field.nullable);
    }

    #[test]
    fn test_aggregates() {
        let outcome = bind(
            "SELECT COUNT(*) AS total, SUM(quantity) AS stock, MAX(capacity) AS top \
             FROM inventory",
        );
        let cols = columns(&outcome);
        assert_eq!(cols[0].field, FieldType::new(SemanticType::BigInt, false));
        assert_eq!(cols[1].field, FieldType::new(SemanticType::BigInt, true));
        // MAX of a non-null column still observes zero rows as NULL
        assert_eq!(cols[2].field, FieldType::new(SemanticType::Integer, true));
    }

    #[test]
    fn test_unknown_column_degrades_field_only() {
        let outcome = bind("SELECT id, ghost FROM items");
        assert_eq!(outcome.errors, vec![Error::ColumnNotFound("ghost".into())]);
        let cols = columns(&outcome);
        assert_eq!(cols[0].field, FieldType::new(SemanticType::Integer, false));
        assert!(cols[1].field.is_unknown());
        assert!(outcome.unresolved());
    }

    #[test]
    fn test_unknown_table_is_hard_error() {
        let snapshot = snapshot();
        let statement = sqlparser::parser::Parser::parse_sql(
            &sqlparser::dialect::GenericDialect {},
            "SELECT id FROM ghosts",
        )
        .unwrap()
        .remove(0);
        let err = bind_statement(&snapshot, &statement).unwrap_err();
        assert_eq!(err, Error::TableNotFound("ghosts".into()));
    }

    #[test]
    fn test_in_list_param_is_array() {
        let outcome = bind("SELECT id FROM items WHERE id IN ($1)");
        assert_eq!(
            outcome.query.params,
            vec![FieldType::new(
                SemanticType::Array(Box::new(SemanticType::Integer)),
                false
            )]
        );
    }

    #[test]
    fn test_any_param_is_array() {
        let outcome = bind("SELECT id FROM items WHERE rarity = ANY($1)");
        assert_eq!(
            outcome.query.params[0].semantic,
            SemanticType::Array(Box::new(SemanticType::Text))
        );
    }

    #[test]
    fn test_insert_params_from_target_columns() {
        let outcome = bind("INSERT INTO inventory (id, quantity) VALUES ($1, $2)");
        assert_eq!(outcome.query.result, ResultShape::NoResult);
        assert_eq!(
            outcome.query.params,
            vec![
                FieldType::new(SemanticType::Integer, false),
                FieldType::new(SemanticType::Integer, true)
            ]
        );
    }

    #[test]
    fn test_insert_returning_has_columns() {
        let outcome = bind("INSERT INTO items (id, name) VALUES ($1, $2) RETURNING id, rarity");
        let cols = columns(&outcome);
        assert_eq!(cols.len(), 2);
        assert!(!cols[0].field.nullable);
        assert!(cols[1].field.nullable);
    }

    #[test]
    fn test_update_with_join_params_in_order() {
        let outcome = bind(
            "UPDATE items \
             JOIN inventory ON inventory.id = items.inventory_id \
             SET items.name = ?, inventory.quantity = ? \
             WHERE inventory.id = ?",
        );
        assert_eq!(outcome.query.result, ResultShape::NoResult);
        assert_eq!(
            outcome.query.params,
            vec![
                FieldType::new(SemanticType::Text, false),
                FieldType::new(SemanticType::Integer, true),
                FieldType::new(SemanticType::Integer, false)
            ]
        );
    }

    #[test]
    fn test_delete_is_write_only() {
        let outcome = bind("DELETE FROM items WHERE id = $1");
        assert_eq!(outcome.query.result, ResultShape::NoResult);
        assert_eq!(
            outcome.query.params,
            vec![FieldType::new(SemanticType::Integer, false)]
        );
    }

    #[test]
    fn test_limit_offset_params_are_integers() {
        let outcome = bind("SELECT id FROM items LIMIT $1 OFFSET $2");
        assert_eq!(
            outcome.query.params,
            vec![
                FieldType::new(SemanticType::Integer, false),
                FieldType::new(SemanticType::Integer, false)
            ]
        );
    }

    #[test]
    fn test_union_widens_and_ors_nullability() {
        let outcome = bind(
            "SELECT id, rarity FROM items UNION ALL SELECT capacity, NULL FROM inventory",
        );
        let cols = columns(&outcome);
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].name, "id");
        assert!(cols[1].field.nullable);
    }

    #[test]
    fn test_subquery_in_from() {
        let outcome = bind(
            "SELECT t.n FROM (SELECT name AS n FROM items WHERE category = $1) AS t",
        );
        assert_eq!(
            outcome.query.params,
            vec![FieldType::new(SemanticType::Text, false)]
        );
        let cols = columns(&outcome);
        assert_eq!(cols[0].name, "n");
        assert_eq!(cols[0].field.semantic, SemanticType::Text);
    }

    #[test]
    fn test_cte_resolves_like_a_table() {
        let outcome = bind(
            "WITH low_stock AS (SELECT id, quantity FROM inventory WHERE quantity < $1) \
             SELECT id FROM low_stock",
        );
        assert_eq!(outcome.query.params.len(), 1);
        let cols = columns(&outcome);
        assert_eq!(cols[0].field.semantic, SemanticType::Integer);
    }

    #[test]
    fn test_scalar_subquery_is_nullable() {
        let outcome = bind(
            "SELECT (SELECT capacity FROM inventory WHERE inventory.id = items.inventory_id) AS cap \
             FROM items",
        );
        let cols = columns(&outcome);
        assert!(cols[0].field.nullable);
        assert_eq!(cols[0].field.semantic, SemanticType::Integer);
    }

    #[test]
    fn test_conflicting_placeholder_sites() {
        let outcome = bind("SELECT id FROM items WHERE name = $1 AND active = $1");
        assert_eq!(outcome.query.params.len(), 1);
        assert!(outcome.query.params[0].is_unknown());
        assert!(outcome
            .errors
            .iter()
            .any(|e| matches!(e, Error::ParamConflict { .. })));
    }

    #[test]
    fn test_case_without_else_is_nullable() {
        let outcome = bind("SELECT CASE WHEN active THEN name END AS label FROM items");
        let cols = columns(&outcome);
        assert!(cols[0].field.nullable);
        assert_eq!(cols[0].field.semantic, SemanticType::Text);
    }

    #[test]
    fn test_ddl_statement_is_noted_not_bound() {
        let outcome = bind("CREATE TABLE extra (id INT)");
        assert_eq!(outcome.query.result, ResultShape::NoResult);
        assert!(!outcome.warnings.is_empty());
        assert!(!outcome.unresolved());
    }
}
