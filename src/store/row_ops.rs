//! Whole-row operations on a dictionary column.

use crate::dict::{storage_cmp, HStoreDict};
use crate::lookup::sql::ParamList;

/// An operation applied to one dictionary column of the selected rows
#[derive(Debug, Clone, PartialEq)]
pub enum RowOperation {
    /// All keys, in the database's storage order
    Keys,
    /// The value stored at one key
    Peek(String),
    /// The sub-dictionary of the given keys that are present
    Slice(Vec<String>),
    /// Delete the given keys
    Remove(Vec<String>),
    /// Merge pairs in, overwriting existing keys
    Update(HStoreDict),
}

impl RowOperation {
    /// Whether the operation writes the column
    pub fn is_mutation(&self) -> bool {
        matches!(self, RowOperation::Remove(_) | RowOperation::Update(_))
    }

    /// The hstore expression computing the operation's result
    pub(crate) fn expression(&self, column: &str, params: &mut ParamList) -> String {
        match self {
            RowOperation::Keys => format!("akeys({})", column),
            RowOperation::Peek(key) => format!("{} -> {}", column, params.push(key.as_str())),
            RowOperation::Slice(keys) => format!("slice({}, {})", column, params.push_array(keys)),
            RowOperation::Remove(keys) => {
                format!("delete({}, {})", column, params.push_array(keys))
            }
            RowOperation::Update(pairs) => {
                format!("{} || {}::hstore", column, params.push(pairs.to_hstore_literal()))
            }
        }
    }

    /// Apply a mutation to a stored dictionary; reads leave it untouched
    pub fn apply(&self, dict: &mut HStoreDict) {
        match self {
            RowOperation::Remove(keys) => {
                for key in keys {
                    dict.remove(key);
                }
            }
            RowOperation::Update(pairs) => dict.merge(pairs),
            RowOperation::Keys | RowOperation::Peek(_) | RowOperation::Slice(_) => {}
        }
    }
}

/// Keys in hstore storage order: shorter keys first, then bytewise
pub fn storage_order(dict: &HStoreDict) -> Vec<String> {
    let mut keys: Vec<String> = dict.keys().map(str::to_string).collect();
    keys.sort_by(|a, b| storage_cmp(a, b));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, &str)]) -> HStoreDict {
        HStoreDict::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_storage_order() {
        let stored = dict(&[("v2", "3"), ("aaa", "x"), ("v", "1"), ("b", "2")]);
        assert_eq!(storage_order(&stored), vec!["b", "v", "v2", "aaa"]);
    }

    #[test]
    fn test_apply_mutations() {
        let mut stored = dict(&[("v", "1"), ("v2", "3")]);
        RowOperation::Update(dict(&[("v2", "10"), ("v3", "20")])).apply(&mut stored);
        assert_eq!(stored, dict(&[("v", "1"), ("v2", "10"), ("v3", "20")]));

        RowOperation::Remove(vec!["v".to_string(), "missing".to_string()]).apply(&mut stored);
        assert_eq!(stored, dict(&[("v2", "10"), ("v3", "20")]));

        RowOperation::Keys.apply(&mut stored);
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn test_expressions() {
        let mut params = ParamList::new();
        assert_eq!(RowOperation::Keys.expression("\"data\"", &mut params), "akeys(\"data\")");
        assert_eq!(
            RowOperation::Peek("v".to_string()).expression("\"data\"", &mut params),
            "\"data\" -> $1"
        );
        assert_eq!(
            RowOperation::Remove(vec!["a".to_string(), "b".to_string()])
                .expression("\"data\"", &mut params),
            "delete(\"data\", ARRAY[$2, $3]::text[])"
        );
        assert_eq!(
            RowOperation::Update(dict(&[("v", "1")])).expression("\"data\"", &mut params),
            "\"data\" || $4::hstore"
        );
        assert_eq!(params.into_params(), vec!["v", "a", "b", r#""v"=>"1""#]);
    }
}
