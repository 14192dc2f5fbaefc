//! Translation of lookups into conditions.

use crate::dict::HStoreDict;
use crate::error::HStoreResult;
use crate::lookup::condition::Condition;
use crate::lookup::operator::ComparisonOp;
use crate::lookup::predicate::{Containment, Lookup, LookupKind, NullTest};
use crate::value::{canonicalize, CastDirective, Value};
use log::debug;
use std::collections::BTreeMap;

/// Compile a validated lookup into a condition.
///
/// Casts are chosen per key from the operand value's kind, so a mapping
/// with mixed operand types yields mixed casts.
pub fn compile(lookup: &Lookup) -> HStoreResult<Condition> {
    let condition = match lookup {
        Lookup::Exact(Some(dict)) => Condition::Equals(dict.clone()),
        Lookup::Exact(None) => Condition::ColumnIsNull { negated: false },

        Lookup::Contains(Containment::Pairs(pairs)) => compile_pairs(pairs)?,
        Lookup::Contains(Containment::Keys(keys)) => Condition::HasKeys(keys.clone()),
        Lookup::Contains(Containment::Text(needle)) => Condition::TextContains {
            needle: needle.clone(),
            case_insensitive: false,
        },
        Lookup::IContains(needle) => Condition::TextContains {
            needle: needle.clone(),
            case_insensitive: true,
        },

        Lookup::IsNull(NullTest::Column(is_null)) => Condition::ColumnIsNull { negated: !is_null },
        Lookup::IsNull(NullTest::Keys(keys)) => Condition::all(
            keys.iter()
                .map(|(key, is_null)| Condition::ValueIsNull {
                    key: key.clone(),
                    negated: !is_null,
                })
                .collect(),
        ),

        Lookup::Compare { op, operands } => {
            let mut conditions = Vec::with_capacity(operands.len());
            for (key, value) in operands {
                conditions.push(compare(key, *op, value)?);
            }
            // An empty mapping still requires a non-NULL column.
            if conditions.is_empty() {
                Condition::ContainsPairs(HStoreDict::new())
            } else {
                Condition::all(conditions)
            }
        }

        Lookup::HasKeys(keys) => Condition::HasKeys(keys.clone()),
    };

    debug!(
        "compiled {} lookup into {:?}",
        lookup.kind().map_or("implicit", |k| k.as_str()),
        condition
    );
    Ok(condition)
}

/// Validate and compile a lookup given by name
pub fn compile_lookup(kind: &str, operand: Value) -> HStoreResult<Condition> {
    let kind: LookupKind = kind.parse()?;
    compile(&Lookup::new(kind, operand)?)
}

/// Containment of key/value pairs.
///
/// String and null values are tested with hstore containment, list values
/// with membership, and typed scalars with a cast equality per key.
fn compile_pairs(pairs: &BTreeMap<String, Value>) -> HStoreResult<Condition> {
    let mut plain = HStoreDict::new();
    let mut conditions = Vec::new();

    for (key, value) in pairs {
        match value {
            Value::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(text) = canonicalize(item)? {
                        values.push(text);
                    }
                }
                conditions.push(Condition::ValueIn {
                    key: key.clone(),
                    values,
                });
            }
            Value::Null | Value::String(_) | Value::Map(_) => {
                plain.insert(key.clone(), value.clone())?;
            }
            typed => conditions.push(compare(key, ComparisonOp::Eq, typed)?),
        }
    }

    if !plain.is_empty() || conditions.is_empty() {
        conditions.insert(0, Condition::ContainsPairs(plain));
    }
    Ok(Condition::all(conditions))
}

fn compare(key: &str, op: ComparisonOp, value: &Value) -> HStoreResult<Condition> {
    Ok(Condition::Compare {
        key: key.to_string(),
        op,
        cast: CastDirective::for_value(value),
        value: canonicalize(value)?.unwrap_or_default(),
    })
}
