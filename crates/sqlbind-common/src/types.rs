//! Semantic type model for sqlbind
//!
//! Every inferred parameter and result column carries a `SemanticType` and an
//! explicit nullability flag. Inference that cannot conclude anything degrades
//! to the tagged `Unknown` variant so consumers can detect it, instead of a
//! universal "any" type they would silently trust.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The semantic type of a parameter or result column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Boolean (true/false)
    Boolean,

    // Numeric types
    /// 16-bit signed integer
    SmallInt,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInt,
    /// 32-bit IEEE 754 floating point
    Float,
    /// 64-bit IEEE 754 floating point
    Double,
    /// Arbitrary-precision decimal
    Decimal,

    // Character / binary
    /// Variable-length string (UTF-8)
    Text,
    /// Binary data
    Bytes,
    /// UUID
    Uuid,

    // Date/Time
    /// Date (year, month, day)
    Date,
    /// Time of day
    Time,
    /// Timestamp without timezone
    Timestamp,
    /// Timestamp with timezone
    TimestampTz,

    /// Structured/JSON data, kept opaque (no shape narrowing)
    Json,

    /// Array of elements of the same type (list-expansion parameters)
    Array(Box<SemanticType>),

    /// Inference could not conclude anything. Always an explicit tag,
    /// never assumed to be any concrete type.
    Unknown,
}

impl SemanticType {
    /// Returns true if this type is a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SemanticType::SmallInt
                | SemanticType::Integer
                | SemanticType::BigInt
                | SemanticType::Float
                | SemanticType::Double
                | SemanticType::Decimal
        )
    }

    /// Returns true if this type is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SemanticType::SmallInt | SemanticType::Integer | SemanticType::BigInt
        )
    }

    /// Rank used to order numeric types from most to least specific.
    /// A value acceptable at a narrow site is acceptable everywhere wider.
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            SemanticType::SmallInt => Some(0),
            SemanticType::Integer => Some(1),
            SemanticType::BigInt => Some(2),
            SemanticType::Decimal => Some(3),
            SemanticType::Float => Some(4),
            SemanticType::Double => Some(5),
            _ => None,
        }
    }

    /// The most specific type compatible with both, used when the same
    /// placeholder position is typed at several usage sites. `None` means
    /// the sites conflict.
    pub fn unify(&self, other: &SemanticType) -> Option<SemanticType> {
        if self == other {
            return Some(self.clone());
        }
        match (self, other) {
            (SemanticType::Unknown, t) | (t, SemanticType::Unknown) => Some(t.clone()),
            (SemanticType::Array(a), SemanticType::Array(b)) => {
                a.unify(b).map(|e| SemanticType::Array(Box::new(e)))
            }
            (a, b) => match (a.numeric_rank(), b.numeric_rank()) {
                (Some(ra), Some(rb)) => Some(if ra <= rb { a.clone() } else { b.clone() }),
                _ => None,
            },
        }
    }

    /// The widest common type of two branches (CASE arms, UNION sides,
    /// arithmetic operands). Falls back to `Unknown` rather than failing.
    pub fn supertype(&self, other: &SemanticType) -> SemanticType {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (SemanticType::Unknown, t) | (t, SemanticType::Unknown) => t.clone(),
            (a, b) => match (a.numeric_rank(), b.numeric_rank()) {
                (Some(ra), Some(rb)) => {
                    if ra >= rb {
                        a.clone()
                    } else {
                        b.clone()
                    }
                }
                _ => SemanticType::Unknown,
            },
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Boolean => write!(f, "BOOLEAN"),
            SemanticType::SmallInt => write!(f, "SMALLINT"),
            SemanticType::Integer => write!(f, "INTEGER"),
            SemanticType::BigInt => write!(f, "BIGINT"),
            SemanticType::Float => write!(f, "FLOAT"),
            SemanticType::Double => write!(f, "DOUBLE"),
            SemanticType::Decimal => write!(f, "DECIMAL"),
            SemanticType::Text => write!(f, "TEXT"),
            SemanticType::Bytes => write!(f, "BYTES"),
            SemanticType::Uuid => write!(f, "UUID"),
            SemanticType::Date => write!(f, "DATE"),
            SemanticType::Time => write!(f, "TIME"),
            SemanticType::Timestamp => write!(f, "TIMESTAMP"),
            SemanticType::TimestampTz => write!(f, "TIMESTAMPTZ"),
            SemanticType::Json => write!(f, "JSON"),
            SemanticType::Array(inner) => write!(f, "{}[]", inner),
            SemanticType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl Default for SemanticType {
    fn default() -> Self {
        SemanticType::Unknown
    }
}

/// A semantic type plus explicit nullability. Nullability is never omitted:
/// callers treat `nullable: false` as a hard guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub semantic: SemanticType,
    pub nullable: bool,
}

impl FieldType {
    pub fn new(semantic: SemanticType, nullable: bool) -> Self {
        FieldType { semantic, nullable }
    }

    /// The degraded field: explicitly unknown, and nullable because nothing
    /// better can be guaranteed.
    pub fn unknown() -> Self {
        FieldType {
            semantic: SemanticType::Unknown,
            nullable: true,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.semantic, SemanticType::Unknown)
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{} NULL", self.semantic)
        } else {
            write!(f, "{} NOT NULL", self.semantic)
        }
    }
}

/// One column of a statement's result, in SQL declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    /// Output name, unique within one statement
    pub name: String,
    pub field: FieldType,
    /// The source expression, for diagnostics
    pub source: String,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, field: FieldType, source: impl Into<String>) -> Self {
        ResultColumn {
            name: name.into(),
            field,
            source: source.into(),
        }
    }
}

/// The result side of a statement's contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "columns")]
pub enum ResultShape {
    /// Ordered named columns, in SQL declaration order
    Columns(Vec<ResultColumn>),
    /// The statement returns no rows (write-only); the result is omitted
    /// entirely, not an empty record
    NoResult,
    /// The statement could not be analyzed
    Unknown,
}

impl ResultShape {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ResultShape::Unknown)
    }

    /// True if any field in this shape degraded to `Unknown`
    pub fn has_unknown_field(&self) -> bool {
        match self {
            ResultShape::Columns(cols) => cols.iter().any(|c| c.field.is_unknown()),
            ResultShape::NoResult => false,
            ResultShape::Unknown => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric() {
        assert!(SemanticType::Integer.is_numeric());
        assert!(SemanticType::Double.is_numeric());
        assert!(SemanticType::Decimal.is_numeric());
        assert!(!SemanticType::Text.is_numeric());
        assert!(!SemanticType::Boolean.is_numeric());
    }

    #[test]
    fn test_unify_picks_most_specific() {
        assert_eq!(
            SemanticType::Integer.unify(&SemanticType::BigInt),
            Some(SemanticType::Integer)
        );
        assert_eq!(
            SemanticType::Double.unify(&SemanticType::Integer),
            Some(SemanticType::Integer)
        );
        assert_eq!(
            SemanticType::Unknown.unify(&SemanticType::Text),
            Some(SemanticType::Text)
        );
        assert_eq!(SemanticType::Text.unify(&SemanticType::Boolean), None);
    }

    #[test]
    fn test_unify_arrays_elementwise() {
        let a = SemanticType::Array(Box::new(SemanticType::Integer));
        let b = SemanticType::Array(Box::new(SemanticType::BigInt));
        assert_eq!(
            a.unify(&b),
            Some(SemanticType::Array(Box::new(SemanticType::Integer)))
        );
    }

    #[test]
    fn test_supertype_widens() {
        assert_eq!(
            SemanticType::Integer.supertype(&SemanticType::Double),
            SemanticType::Double
        );
        assert_eq!(
            SemanticType::Text.supertype(&SemanticType::Integer),
            SemanticType::Unknown
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SemanticType::Integer.to_string(), "INTEGER");
        assert_eq!(
            SemanticType::Array(Box::new(SemanticType::Text)).to_string(),
            "TEXT[]"
        );
        assert_eq!(
            FieldType::new(SemanticType::Boolean, true).to_string(),
            "BOOLEAN NULL"
        );
    }

    #[test]
    fn test_unknown_field_detection() {
        let shape = ResultShape::Columns(vec![
            ResultColumn::new("id", FieldType::new(SemanticType::Integer, false), "id"),
            ResultColumn::new("blob", FieldType::unknown(), "blob"),
        ]);
        assert!(shape.has_unknown_field());
        assert!(!ResultShape::NoResult.has_unknown_field());
    }
}
