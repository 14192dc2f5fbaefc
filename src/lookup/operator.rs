//! Comparison operators used by per-key conditions.

use std::cmp::Ordering;

/// Comparison applied between a stored value and an operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    /// Whether an ordering of stored value vs. operand satisfies this operator
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Eq => ordering == Ordering::Equal,
            ComparisonOp::Gt => ordering == Ordering::Greater,
            ComparisonOp::Gte => ordering != Ordering::Less,
            ComparisonOp::Lt => ordering == Ordering::Less,
            ComparisonOp::Lte => ordering != Ordering::Greater,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches() {
        assert!(ComparisonOp::Eq.matches(Ordering::Equal));
        assert!(!ComparisonOp::Eq.matches(Ordering::Less));

        assert!(ComparisonOp::Gt.matches(Ordering::Greater));
        assert!(!ComparisonOp::Gt.matches(Ordering::Equal));
        assert!(ComparisonOp::Gte.matches(Ordering::Equal));
        assert!(ComparisonOp::Gte.matches(Ordering::Greater));

        assert!(ComparisonOp::Lt.matches(Ordering::Less));
        assert!(!ComparisonOp::Lt.matches(Ordering::Equal));
        assert!(ComparisonOp::Lte.matches(Ordering::Equal));
        assert!(!ComparisonOp::Lte.matches(Ordering::Greater));
    }

    #[test]
    fn test_operator_display() {
        assert_eq!(ComparisonOp::Eq.as_str(), "=");
        assert_eq!(ComparisonOp::Gte.as_str(), ">=");
        assert_eq!(ComparisonOp::Lt.as_str(), "<");
    }
}
