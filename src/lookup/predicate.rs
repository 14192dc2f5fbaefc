//! Lookup predicates and their operand validation.
//!
//! Each lookup kind accepts a fixed set of operand shapes. Operands are
//! checked when the [`Lookup`] is built, so a malformed predicate never
//! reaches compilation or the database.

use crate::dict::HStoreDict;
use crate::error::{HStoreError, HStoreResult};
use crate::lookup::operator::ComparisonOp;
use crate::value::{canonicalize, Value, ValueKind};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Named lookup kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Exact,
    Contains,
    IContains,
    IsNull,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Exact => "exact",
            LookupKind::Contains => "contains",
            LookupKind::IContains => "icontains",
            LookupKind::IsNull => "isnull",
            LookupKind::Gt => "gt",
            LookupKind::Gte => "gte",
            LookupKind::Lt => "lt",
            LookupKind::Lte => "lte",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupKind {
    type Err = HStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(LookupKind::Exact),
            "contains" => Ok(LookupKind::Contains),
            "icontains" => Ok(LookupKind::IContains),
            "isnull" => Ok(LookupKind::IsNull),
            "gt" => Ok(LookupKind::Gt),
            "gte" => Ok(LookupKind::Gte),
            "lt" => Ok(LookupKind::Lt),
            "lte" => Ok(LookupKind::Lte),
            other => Err(HStoreError::Lookup(format!("unsupported lookup: {}", other))),
        }
    }
}

/// Operand of a `contains` lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Containment {
    /// Key/value pairs the column must hold. A list value means "one of".
    Pairs(BTreeMap<String, Value>),
    /// Keys the column must hold
    Keys(Vec<String>),
    /// Case-sensitive substring of the column's text form
    Text(String),
}

/// Operand of an `isnull` lookup
#[derive(Debug, Clone, PartialEq)]
pub enum NullTest {
    /// Whole column is (or is not) NULL
    Column(bool),
    /// Per key: value is (or is not) the null marker
    Keys(BTreeMap<String, bool>),
}

/// A validated lookup predicate against a dictionary column
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Equality with a whole dictionary; `None` tests for a NULL column
    Exact(Option<HStoreDict>),
    Contains(Containment),
    /// Case-insensitive substring of the column's text form
    IContains(String),
    IsNull(NullTest),
    /// Per-key ordering comparisons, conjoined
    Compare {
        op: ComparisonOp,
        operands: BTreeMap<String, Value>,
    },
    /// Bare mapping: the column must hold every key of the mapping
    HasKeys(Vec<String>),
}

impl Lookup {
    /// Build a lookup of the given kind, validating the operand shape
    pub fn new(kind: LookupKind, operand: Value) -> HStoreResult<Self> {
        match kind {
            LookupKind::Exact => Self::exact(operand),
            LookupKind::Contains => Self::contains(operand),
            LookupKind::IContains => Self::icontains(operand),
            LookupKind::IsNull => Self::isnull(operand),
            LookupKind::Gt => Self::comparison(ComparisonOp::Gt, operand, kind),
            LookupKind::Gte => Self::comparison(ComparisonOp::Gte, operand, kind),
            LookupKind::Lt => Self::comparison(ComparisonOp::Lt, operand, kind),
            LookupKind::Lte => Self::comparison(ComparisonOp::Lte, operand, kind),
        }
    }

    /// Build a lookup from its name, e.g. `"contains"`
    pub fn parse(kind: &str, operand: Value) -> HStoreResult<Self> {
        Self::new(kind.parse()?, operand)
    }

    /// A bare mapping used as a filter value: a key-subset test
    pub fn implicit(operand: Value) -> HStoreResult<Self> {
        match operand {
            Value::Map(entries) => Ok(Lookup::HasKeys(entries.into_keys().collect())),
            other => Err(operand_error("implicit", "a map", &other)),
        }
    }

    pub fn exact(operand: Value) -> HStoreResult<Self> {
        match operand {
            Value::Null => Ok(Lookup::Exact(None)),
            Value::Map(_) | Value::String(_) => {
                Ok(Lookup::Exact(Some(HStoreDict::from_value(operand)?)))
            }
            other => Err(operand_error("exact", "a map, JSON object text or null", &other)),
        }
    }

    pub fn contains(operand: Value) -> HStoreResult<Self> {
        match operand {
            Value::Map(entries) => {
                for (key, value) in &entries {
                    check_containment_value(key, value)?;
                }
                Ok(Lookup::Contains(Containment::Pairs(entries)))
            }
            Value::List(items) => Ok(Lookup::Contains(Containment::Keys(key_list(
                "contains", items,
            )?))),
            Value::String(text) if !text.is_empty() => Ok(Lookup::Contains(Containment::Text(text))),
            Value::String(_) => Err(HStoreError::Lookup(
                "contains lookup needs a non-empty string".to_string(),
            )),
            other => Err(operand_error("contains", "a map, list or string", &other)),
        }
    }

    pub fn icontains(operand: Value) -> HStoreResult<Self> {
        match operand {
            Value::String(text) if !text.is_empty() => Ok(Lookup::IContains(text)),
            Value::String(_) => Err(HStoreError::Lookup(
                "icontains lookup needs a non-empty string".to_string(),
            )),
            other => Err(operand_error("icontains", "a string", &other)),
        }
    }

    pub fn isnull(operand: Value) -> HStoreResult<Self> {
        match operand {
            Value::Boolean(b) => Ok(Lookup::IsNull(NullTest::Column(b))),
            Value::Map(entries) => {
                let mut keys = BTreeMap::new();
                for (key, value) in entries {
                    match value {
                        Value::Boolean(b) => {
                            keys.insert(key, b);
                        }
                        other => {
                            return Err(HStoreError::Lookup(format!(
                                "isnull lookup expects a boolean for key '{}', got {}",
                                key,
                                other.kind()
                            )))
                        }
                    }
                }
                Ok(Lookup::IsNull(NullTest::Keys(keys)))
            }
            other => Err(operand_error("isnull", "a boolean or a map of booleans", &other)),
        }
    }

    /// `gt`/`gte`/`lt`/`lte`: a map of key to comparison operand
    pub fn compare(op: ComparisonOp, operand: Value) -> HStoreResult<Self> {
        let kind = match op {
            ComparisonOp::Gt => LookupKind::Gt,
            ComparisonOp::Gte => LookupKind::Gte,
            ComparisonOp::Lt => LookupKind::Lt,
            ComparisonOp::Lte => LookupKind::Lte,
            ComparisonOp::Eq => {
                return Err(HStoreError::Lookup(
                    "equality is expressed with the exact or contains lookups".to_string(),
                ))
            }
        };
        Self::comparison(op, operand, kind)
    }

    fn comparison(op: ComparisonOp, operand: Value, kind: LookupKind) -> HStoreResult<Self> {
        let entries = match operand {
            Value::Map(entries) => entries,
            other => return Err(operand_error(kind.as_str(), "a map", &other)),
        };

        for (key, value) in &entries {
            match value.kind() {
                ValueKind::Null | ValueKind::List | ValueKind::Map => {
                    return Err(HStoreError::Lookup(format!(
                        "{} lookup cannot compare key '{}' against {}",
                        kind,
                        key,
                        value.kind()
                    )))
                }
                _ => {
                    canonicalize(value)?;
                }
            }
        }

        Ok(Lookup::Compare {
            op,
            operands: entries,
        })
    }

    /// The named kind of this lookup, `None` for the implicit key test
    pub fn kind(&self) -> Option<LookupKind> {
        match self {
            Lookup::Exact(_) => Some(LookupKind::Exact),
            Lookup::Contains(_) => Some(LookupKind::Contains),
            Lookup::IContains(_) => Some(LookupKind::IContains),
            Lookup::IsNull(_) => Some(LookupKind::IsNull),
            Lookup::Compare { op, .. } => match op {
                ComparisonOp::Gt => Some(LookupKind::Gt),
                ComparisonOp::Gte => Some(LookupKind::Gte),
                ComparisonOp::Lt => Some(LookupKind::Lt),
                ComparisonOp::Lte => Some(LookupKind::Lte),
                ComparisonOp::Eq => None,
            },
            Lookup::HasKeys(_) => None,
        }
    }
}

fn operand_error(lookup: &str, expected: &str, actual: &Value) -> HStoreError {
    HStoreError::Lookup(format!(
        "{} lookup expects {}, got {}",
        lookup,
        expected,
        actual.kind()
    ))
}

fn check_containment_value(key: &str, value: &Value) -> HStoreResult<()> {
    match value {
        Value::List(items) => {
            for item in items {
                if item.is_null() {
                    return Err(HStoreError::Lookup(format!(
                        "contains lookup list for key '{}' must not hold null",
                        key
                    )));
                }
                canonicalize(item)?;
            }
            Ok(())
        }
        other => canonicalize(other).map(|_| ()),
    }
}

fn key_list(lookup: &str, items: Vec<Value>) -> HStoreResult<Vec<String>> {
    if items.is_empty() {
        return Err(HStoreError::Lookup(format!(
            "{} lookup needs at least one key",
            lookup
        )));
    }

    items
        .into_iter()
        .map(|item| match item {
            Value::String(key) => Ok(key),
            other => Err(HStoreError::Lookup(format!(
                "{} lookup keys must be strings, got {}",
                lookup,
                other.kind()
            ))),
        })
        .collect()
}
