//! Compiled conditions against a dictionary column.

use crate::dict::HStoreDict;
use crate::lookup::operator::ComparisonOp;
use crate::value::CastDirective;

/// A condition over one dictionary column, ready for rendering or evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every row
    Always,

    /// The column itself is NULL (or, when negated, is not)
    ColumnIsNull { negated: bool },

    /// The column equals a whole dictionary
    Equals(HStoreDict),

    /// The column holds every pair of the dictionary
    ContainsPairs(HStoreDict),

    /// The column holds every key
    HasKeys(Vec<String>),

    /// The value at `key` is one of `values`
    ValueIn { key: String, values: Vec<String> },

    /// The value at `key`, cast, compares against `value` cast the same way
    Compare {
        key: String,
        op: ComparisonOp,
        cast: CastDirective,
        value: String,
    },

    /// The key is present with the null marker (or, when negated, is not)
    ValueIsNull { key: String, negated: bool },

    /// The column's text form contains `needle`
    TextContains {
        needle: String,
        case_insensitive: bool,
    },

    /// Conjunction
    And(Vec<Condition>),
}

impl Condition {
    /// Conjoin conditions, flattening nested conjunctions and collapsing
    /// trivial ones
    pub fn all(conditions: Vec<Condition>) -> Self {
        let mut flat = Vec::with_capacity(conditions.len());
        for condition in conditions {
            match condition {
                Condition::Always => {}
                Condition::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => Condition::Always,
            1 => flat.remove(0),
            _ => Condition::And(flat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_key(key: &str) -> Condition {
        Condition::HasKeys(vec![key.to_string()])
    }

    #[test]
    fn test_all_flattens() {
        assert_eq!(Condition::all(vec![]), Condition::Always);
        assert_eq!(
            Condition::all(vec![Condition::Always, has_key("a")]),
            has_key("a")
        );

        let nested = Condition::all(vec![
            Condition::And(vec![has_key("a"), has_key("b")]),
            has_key("c"),
        ]);
        assert_eq!(
            nested,
            Condition::And(vec![has_key("a"), has_key("b"), has_key("c")])
        );
    }
}
