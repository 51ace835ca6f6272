//! Expression inference
//!
//! Walks one expression, resolving column references through the scope and
//! recording every placeholder site together with the type its context
//! implies. Resolution failures degrade the expression to `Unknown` and are
//! recorded on the context; they never abort the statement.
//!
//! Nullability is computed conservatively throughout: when in doubt, a
//! result is nullable. Boolean predicates are the deliberate exception and
//! come out non-null.

use crate::scope::BindScope;
use crate::statement::BindContext;
use sqlbind_catalog::{fold_ident, semantic_type_of};
use sqlbind_common::{FieldType, SemanticType};
use sqlparser::ast as sql;

/// The raw marker if this expression is a bare placeholder (possibly
/// parenthesized).
pub(crate) fn placeholder_of(expr: &sql::Expr) -> Option<&str> {
    match expr {
        sql::Expr::Value(sql::Value::Placeholder(s)) => Some(s.as_str()),
        sql::Expr::Nested(inner) => placeholder_of(inner),
        _ => None,
    }
}

/// Infer the type of an expression, recording placeholder sites as they are
/// encountered.
pub(crate) fn infer_expr(cx: &mut BindContext, scope: &BindScope, expr: &sql::Expr) -> FieldType {
    match expr {
        sql::Expr::Value(value) => infer_value(cx, value),

        sql::Expr::Identifier(ident) => resolve_column(cx, scope, &[ident.clone()]),
        sql::Expr::CompoundIdentifier(idents) => resolve_column(cx, scope, idents),

        sql::Expr::Nested(inner) => infer_expr(cx, scope, inner),

        sql::Expr::BinaryOp { left, op, right } => infer_binary_op(cx, scope, left, op, right),

        sql::Expr::UnaryOp { op, expr } => {
            let operand = infer_expr(cx, scope, expr);
            match op {
                sql::UnaryOperator::Not => FieldType::new(SemanticType::Boolean, false),
                sql::UnaryOperator::Minus | sql::UnaryOperator::Plus => operand,
                _ => FieldType::unknown(),
            }
        }

        // Boolean predicates yield non-null boolean.
        sql::Expr::IsNull(inner)
        | sql::Expr::IsNotNull(inner)
        | sql::Expr::IsTrue(inner)
        | sql::Expr::IsNotTrue(inner)
        | sql::Expr::IsFalse(inner)
        | sql::Expr::IsNotFalse(inner)
        | sql::Expr::IsUnknown(inner)
        | sql::Expr::IsNotUnknown(inner) => {
            infer_expr(cx, scope, inner);
            FieldType::new(SemanticType::Boolean, false)
        }

        sql::Expr::IsDistinctFrom(left, right) | sql::Expr::IsNotDistinctFrom(left, right) => {
            pair_placeholder(cx, scope, left, right);
            FieldType::new(SemanticType::Boolean, false)
        }

        sql::Expr::Between {
            expr, low, high, ..
        } => {
            let subject = infer_expr(cx, scope, expr);
            for bound in [low, high] {
                if let Some(marker) = placeholder_of(bound) {
                    cx.params.record(marker, subject.clone(), false);
                } else {
                    infer_expr(cx, scope, bound);
                }
            }
            FieldType::new(SemanticType::Boolean, false)
        }

        // A marker inside a list expansion becomes a single array-typed slot.
        sql::Expr::InList { expr, list, .. } => {
            let subject = infer_expr(cx, scope, expr);
            for item in list {
                if let Some(marker) = placeholder_of(item) {
                    cx.params.record(marker, subject.clone(), true);
                } else {
                    infer_expr(cx, scope, item);
                }
            }
            FieldType::new(SemanticType::Boolean, false)
        }

        sql::Expr::AnyOp { left, right, .. } | sql::Expr::AllOp { left, right, .. } => {
            let subject = infer_expr(cx, scope, left);
            if let Some(marker) = placeholder_of(right) {
                cx.params.record(marker, subject, true);
            } else {
                infer_expr(cx, scope, right);
            }
            FieldType::new(SemanticType::Boolean, false)
        }

        sql::Expr::InSubquery { expr, subquery, .. } => {
            infer_expr(cx, scope, expr);
            walk_subquery(cx, scope, subquery);
            FieldType::new(SemanticType::Boolean, false)
        }

        sql::Expr::Exists { subquery, .. } => {
            walk_subquery(cx, scope, subquery);
            FieldType::new(SemanticType::Boolean, false)
        }

        // A scalar subquery can match zero rows, so it is always nullable.
        sql::Expr::Subquery(subquery) => match walk_subquery(cx, scope, subquery) {
            Some(columns) => columns
                .first()
                .map(|c| c.field.clone().with_nullable(true))
                .unwrap_or_else(FieldType::unknown),
            None => FieldType::unknown(),
        },

        sql::Expr::Cast {
            expr, data_type, ..
        } => {
            let target = semantic_type_of(data_type);
            if let Some(marker) = placeholder_of(expr) {
                // An explicit cast is a deliberate type assertion.
                cx.params
                    .record(marker, FieldType::new(target.clone(), false), false);
                FieldType::new(target, false)
            } else {
                let operand = infer_expr(cx, scope, expr);
                FieldType::new(target, operand.nullable)
            }
        }

        sql::Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => infer_case(cx, scope, operand, conditions, results, else_result),

        sql::Expr::Function(function) => infer_function(cx, scope, function),

        sql::Expr::Like {
            expr, pattern, ..
        }
        | sql::Expr::ILike {
            expr, pattern, ..
        }
        | sql::Expr::SimilarTo {
            expr, pattern, ..
        } => {
            infer_expr(cx, scope, expr);
            if let Some(marker) = placeholder_of(pattern) {
                cx.params
                    .record(marker, FieldType::new(SemanticType::Text, false), false);
            } else {
                infer_expr(cx, scope, pattern);
            }
            FieldType::new(SemanticType::Boolean, false)
        }

        sql::Expr::Substring { expr, .. } => {
            let operand = infer_expr(cx, scope, expr);
            FieldType::new(SemanticType::Text, operand.nullable)
        }

        sql::Expr::Trim { expr, .. } => {
            let operand = infer_expr(cx, scope, expr);
            FieldType::new(SemanticType::Text, operand.nullable)
        }

        sql::Expr::Position { expr, r#in } => {
            infer_expr(cx, scope, expr);
            infer_expr(cx, scope, r#in);
            FieldType::new(SemanticType::Integer, false)
        }

        sql::Expr::Ceil { expr, .. } | sql::Expr::Floor { expr, .. } => {
            let operand = infer_expr(cx, scope, expr);
            let semantic = if operand.semantic.is_numeric() {
                operand.semantic
            } else {
                SemanticType::Double
            };
            FieldType::new(semantic, operand.nullable)
        }

        sql::Expr::Extract { expr, .. } => {
            let operand = infer_expr(cx, scope, expr);
            FieldType::new(SemanticType::BigInt, operand.nullable)
        }

        sql::Expr::TypedString { data_type, .. } => {
            FieldType::new(semantic_type_of(data_type), false)
        }

        sql::Expr::Tuple(items) => {
            for item in items {
                infer_expr(cx, scope, item);
            }
            FieldType::unknown()
        }

        // Anything else degrades to an explicit Unknown rather than failing
        // the statement.
        _ => FieldType::unknown(),
    }
}

fn infer_value(cx: &mut BindContext, value: &sql::Value) -> FieldType {
    match value {
        sql::Value::Placeholder(marker) => {
            // A bare marker with no surrounding context.
            cx.params.record(marker, FieldType::unknown(), false);
            FieldType::unknown()
        }
        sql::Value::Number(n, _) => {
            if n.parse::<i64>().is_ok() {
                let fits_i32 = n.parse::<i32>().is_ok();
                if fits_i32 {
                    FieldType::new(SemanticType::Integer, false)
                } else {
                    FieldType::new(SemanticType::BigInt, false)
                }
            } else {
                FieldType::new(SemanticType::Double, false)
            }
        }
        sql::Value::SingleQuotedString(_)
        | sql::Value::DoubleQuotedString(_)
        | sql::Value::EscapedStringLiteral(_)
        | sql::Value::DollarQuotedString(_)
        | sql::Value::NationalStringLiteral(_) => FieldType::new(SemanticType::Text, false),
        sql::Value::HexStringLiteral(_) => FieldType::new(SemanticType::Bytes, false),
        sql::Value::Boolean(_) => FieldType::new(SemanticType::Boolean, false),
        // A NULL literal has no type of its own.
        sql::Value::Null => FieldType::unknown(),
        _ => FieldType::unknown(),
    }
}

fn resolve_column(cx: &mut BindContext, scope: &BindScope, idents: &[sql::Ident]) -> FieldType {
    let Some(last) = idents.last() else {
        return FieldType::unknown();
    };
    let column = fold_ident(&last.value, last.quote_style.is_some());
    // schema.table.column references resolve by their trailing two segments
    let qualifier = (idents.len() >= 2)
        .then(|| &idents[idents.len() - 2])
        .map(|i| fold_ident(&i.value, i.quote_style.is_some()));

    match scope.resolve(qualifier.as_deref(), &column) {
        Ok(field) => field,
        Err(error) => {
            cx.errors.push(error);
            FieldType::unknown()
        }
    }
}

/// Walk both sides of a symmetric operator, typing a placeholder on one side
/// from the other side's inferred type.
fn pair_placeholder(
    cx: &mut BindContext,
    scope: &BindScope,
    left: &sql::Expr,
    right: &sql::Expr,
) -> (FieldType, FieldType) {
    match (placeholder_of(left), placeholder_of(right)) {
        (Some(left_marker), Some(right_marker)) => {
            cx.params.record(left_marker, FieldType::unknown(), false);
            cx.params.record(right_marker, FieldType::unknown(), false);
            (FieldType::unknown(), FieldType::unknown())
        }
        (Some(marker), None) => {
            let other = infer_expr(cx, scope, right);
            cx.params.record(marker, other.clone(), false);
            (other.clone(), other)
        }
        (None, Some(marker)) => {
            let other = infer_expr(cx, scope, left);
            cx.params.record(marker, other.clone(), false);
            (other.clone(), other)
        }
        (None, None) => {
            let lt = infer_expr(cx, scope, left);
            let rt = infer_expr(cx, scope, right);
            (lt, rt)
        }
    }
}

fn infer_binary_op(
    cx: &mut BindContext,
    scope: &BindScope,
    left: &sql::Expr,
    op: &sql::BinaryOperator,
    right: &sql::Expr,
) -> FieldType {
    use sql::BinaryOperator as Op;

    // JSON access operators produce opaque structured values (or text for
    // the ->> form); no shape narrowing is attempted.
    match op {
        Op::Arrow | Op::HashArrow => {
            infer_expr(cx, scope, left);
            infer_expr(cx, scope, right);
            return FieldType::new(SemanticType::Json, true);
        }
        Op::LongArrow | Op::HashLongArrow => {
            infer_expr(cx, scope, left);
            infer_expr(cx, scope, right);
            return FieldType::new(SemanticType::Text, true);
        }
        _ => {}
    }

    let (lt, rt) = pair_placeholder(cx, scope, left, right);

    match op {
        Op::Eq
        | Op::NotEq
        | Op::Lt
        | Op::LtEq
        | Op::Gt
        | Op::GtEq
        | Op::Spaceship
        | Op::And
        | Op::Or
        | Op::Xor => FieldType::new(SemanticType::Boolean, false),

        Op::StringConcat => FieldType::new(SemanticType::Text, lt.nullable || rt.nullable),

        Op::Plus | Op::Minus | Op::Multiply | Op::Divide | Op::Modulo => {
            let semantic = if lt.semantic.is_numeric() || rt.semantic.is_numeric() {
                lt.semantic.supertype(&rt.semantic)
            } else {
                SemanticType::Unknown
            };
            FieldType::new(semantic, lt.nullable || rt.nullable)
        }

        _ => FieldType::unknown(),
    }
}

fn infer_case(
    cx: &mut BindContext,
    scope: &BindScope,
    operand: &Option<Box<sql::Expr>>,
    conditions: &[sql::Expr],
    results: &[sql::Expr],
    else_result: &Option<Box<sql::Expr>>,
) -> FieldType {
    if let Some(operand) = operand {
        infer_expr(cx, scope, operand);
    }
    for condition in conditions {
        infer_expr(cx, scope, condition);
    }

    let mut semantic = SemanticType::Unknown;
    let mut nullable = false;
    for result in results {
        let branch = infer_expr(cx, scope, result);
        semantic = semantic.supertype(&branch.semantic);
        nullable |= branch.nullable;
    }
    match else_result {
        Some(else_result) => {
            let branch = infer_expr(cx, scope, else_result);
            semantic = semantic.supertype(&branch.semantic);
            nullable |= branch.nullable;
        }
        // A CASE without ELSE yields NULL when nothing matches.
        None => nullable = true,
    }
    FieldType::new(semantic, nullable)
}

fn infer_function(cx: &mut BindContext, scope: &BindScope, function: &sql::Function) -> FieldType {
    let name = function
        .name
        .0
        .last()
        .map(|i| i.value.to_uppercase())
        .unwrap_or_default();

    // Walk arguments; markers in argument position have no context.
    let mut arg_fields: Vec<FieldType> = Vec::new();
    if let sql::FunctionArguments::List(list) = &function.args {
        for arg in &list.args {
            match arg {
                sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Expr(e)) => {
                    arg_fields.push(infer_expr(cx, scope, e));
                }
                sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Wildcard) => {}
                _ => {}
            }
        }
    }
    let first = arg_fields.first().cloned();

    // Ranking window functions are non-null whatever their arguments.
    if function.over.is_some()
        && matches!(
            name.as_str(),
            "ROW_NUMBER" | "RANK" | "DENSE_RANK" | "NTILE"
        )
    {
        return FieldType::new(SemanticType::BigInt, false);
    }

    match name.as_str() {
        // Counting aggregates match every group, including empty ones.
        "COUNT" => FieldType::new(SemanticType::BigInt, false),

        // Folding aggregates observe zero rows as NULL.
        "SUM" => {
            let semantic = match first.map(|f| f.semantic) {
                Some(s) if s.is_integer() => SemanticType::BigInt,
                Some(SemanticType::Decimal) => SemanticType::Decimal,
                Some(s) if s.is_numeric() => SemanticType::Double,
                _ => SemanticType::Unknown,
            };
            FieldType::new(semantic, true)
        }
        "AVG" => FieldType::new(SemanticType::Double, true),
        "MIN" | "MAX" => first
            .map(|f| f.with_nullable(true))
            .unwrap_or_else(FieldType::unknown),
        "BOOL_AND" | "BOOL_OR" | "EVERY" => FieldType::new(SemanticType::Boolean, true),
        "STRING_AGG" | "GROUP_CONCAT" | "LISTAGG" => FieldType::new(SemanticType::Text, true),
        "ARRAY_AGG" => {
            let element = first.map(|f| f.semantic).unwrap_or(SemanticType::Unknown);
            FieldType::new(SemanticType::Array(Box::new(element)), true)
        }

        "COALESCE" => {
            let mut semantic = SemanticType::Unknown;
            let mut nullable = true;
            for field in &arg_fields {
                semantic = semantic.supertype(&field.semantic);
                nullable &= field.nullable;
            }
            FieldType::new(semantic, nullable)
        }
        "NULLIF" => first
            .map(|f| f.with_nullable(true))
            .unwrap_or_else(FieldType::unknown),
        "GREATEST" | "LEAST" => first.unwrap_or_else(FieldType::unknown),

        "NOW" | "CURRENT_TIMESTAMP" => FieldType::new(SemanticType::TimestampTz, false),
        "CURRENT_DATE" => FieldType::new(SemanticType::Date, false),

        "LOWER" | "UPPER" | "TRIM" | "LTRIM" | "RTRIM" | "REPLACE" | "CONCAT" | "SUBSTRING"
        | "SUBSTR" | "LEFT" | "RIGHT" => {
            let nullable = arg_fields.iter().any(|f| f.nullable);
            FieldType::new(SemanticType::Text, nullable)
        }
        "LENGTH" | "CHAR_LENGTH" | "OCTET_LENGTH" | "STRPOS" => {
            let nullable = first.map(|f| f.nullable).unwrap_or(true);
            FieldType::new(SemanticType::Integer, nullable)
        }
        "ABS" | "ROUND" | "CEIL" | "CEILING" | "FLOOR" => {
            let field = first.unwrap_or_else(FieldType::unknown);
            let semantic = if field.semantic.is_numeric() {
                field.semantic
            } else {
                SemanticType::Double
            };
            FieldType::new(semantic, field.nullable)
        }

        _ => FieldType::unknown(),
    }
}

/// Walk a subquery with the current scope as parent, returning its result
/// columns when it could be analyzed.
fn walk_subquery(
    cx: &mut BindContext,
    scope: &BindScope,
    subquery: &sql::Query,
) -> Option<Vec<sqlbind_common::ResultColumn>> {
    match crate::statement::infer_query(cx, subquery, Some(scope), &[]) {
        Ok(columns) => Some(columns),
        Err(error) => {
            cx.errors.push(error);
            None
        }
    }
}
