//! Type casts attached to per-key comparisons.

use crate::value::{Value, ValueKind};
use std::fmt;

/// Cast applied to a stored value (and the operand) before comparing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastDirective {
    /// Compare as text
    None,
    Boolean,
    BigInt,
    Float8,
    Numeric,
    Timestamp,
    Date,
    Time,
}

impl CastDirective {
    /// The cast as a SQL suffix, empty for text comparison
    pub fn as_sql(&self) -> &'static str {
        match self {
            CastDirective::None => "",
            CastDirective::Boolean => "::boolean",
            CastDirective::BigInt => "::bigint",
            CastDirective::Float8 => "::float8",
            CastDirective::Numeric => "::numeric",
            CastDirective::Timestamp => "::timestamp",
            CastDirective::Date => "::date",
            CastDirective::Time => "::time",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CastDirective::None)
    }

    /// Cast for a concrete operand value
    pub fn for_value(value: &Value) -> Self {
        cast_for(value.kind())
    }
}

impl fmt::Display for CastDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastDirective::None => f.write_str("text"),
            other => f.write_str(other.as_sql().trim_start_matches("::")),
        }
    }
}

/// Choose the cast for an operand of the given kind
pub fn cast_for(kind: ValueKind) -> CastDirective {
    match kind {
        ValueKind::Boolean => CastDirective::Boolean,
        ValueKind::DateTime => CastDirective::Timestamp,
        ValueKind::Date => CastDirective::Date,
        ValueKind::Time => CastDirective::Time,
        ValueKind::Integer => CastDirective::BigInt,
        ValueKind::Float => CastDirective::Float8,
        ValueKind::Decimal => CastDirective::Numeric,
        ValueKind::Null
        | ValueKind::String
        | ValueKind::List
        | ValueKind::Map
        | ValueKind::Bytes => CastDirective::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_for_kind() {
        assert_eq!(cast_for(ValueKind::Boolean).as_sql(), "::boolean");
        assert_eq!(cast_for(ValueKind::DateTime).as_sql(), "::timestamp");
        assert_eq!(cast_for(ValueKind::Date).as_sql(), "::date");
        assert_eq!(cast_for(ValueKind::Time).as_sql(), "::time");
        assert_eq!(cast_for(ValueKind::Integer).as_sql(), "::bigint");
        assert_eq!(cast_for(ValueKind::Float).as_sql(), "::float8");
        assert_eq!(cast_for(ValueKind::Decimal).as_sql(), "::numeric");
        assert_eq!(cast_for(ValueKind::String).as_sql(), "");
        assert_eq!(cast_for(ValueKind::List).as_sql(), "");
        assert!(cast_for(ValueKind::Null).is_none());
    }

    #[test]
    fn test_cast_for_value() {
        assert_eq!(CastDirective::for_value(&Value::from(2)), CastDirective::BigInt);
        assert_eq!(CastDirective::for_value(&Value::from("2")), CastDirective::None);
        assert_eq!(CastDirective::Float8.to_string(), "float8");
        assert_eq!(CastDirective::None.to_string(), "text");
    }
}
