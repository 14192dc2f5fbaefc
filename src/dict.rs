//! The dictionary value container.
//!
//! [`HStoreDict`] is a flat mapping from string keys to strings or nulls,
//! the in-process mirror of an hstore column value. Every value assigned
//! through [`HStoreDict::insert`] or a constructor is reduced to its
//! canonical form first, so the container never holds anything but
//! `Option<String>`.
//!
//! Its text form ([`HStoreDict::to_text`]) is a JSON object whose values are
//! all JSON strings or nulls; this is also the wire format used by the
//! column binding adapter.

use crate::error::{HStoreError, HStoreResult};
use crate::value::{canonicalize, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A mapping of keys to canonical string values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HStoreDict {
    entries: BTreeMap<String, Option<String>>,
}

impl HStoreDict {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary from a null, a map, or JSON-object text.
    ///
    /// Lists, non-object JSON text and bare scalars are rejected with
    /// [`HStoreError::Dict`]. Map entries are canonicalized.
    pub fn from_value(source: Value) -> HStoreResult<Self> {
        match source {
            Value::Null => Ok(Self::new()),
            Value::String(text) => Self::from_json(&text),
            Value::Map(entries) => {
                let mut dict = Self::new();
                for (key, value) in entries {
                    dict.insert(key, value)?;
                }
                Ok(dict)
            }
            other => Err(HStoreError::Dict(format!(
                "cannot build a dictionary from a {}",
                other.kind()
            ))),
        }
    }

    /// Parse JSON-object text
    pub fn from_json(text: &str) -> HStoreResult<Self> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| HStoreError::Dict(format!("invalid JSON: {}", e)))?;
        if !json.is_object() {
            return Err(HStoreError::Dict(format!(
                "expected a JSON object, found {}",
                json_type_name(&json)
            )));
        }
        Self::from_value(Value::from(json))
    }

    /// Build a dictionary from key/value pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> HStoreResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut dict = Self::new();
        for (key, value) in pairs {
            dict.insert(key, value)?;
        }
        Ok(dict)
    }

    /// Stored string for `key`, `None` when the key is absent or null
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|v| v.as_deref())
    }

    /// Stored value for `key`, or `default` when the key is absent.
    /// A stored null is returned as `None`, not replaced by the default.
    pub fn get_or<'a>(&'a self, key: &str, default: Option<&'a str>) -> Option<&'a str> {
        match self.entries.get(key) {
            Some(value) => value.as_deref(),
            None => default,
        }
    }

    /// Stored value for `key`, failing when the key is absent
    pub fn value(&self, key: &str) -> HStoreResult<Option<&str>> {
        self.entries
            .get(key)
            .map(|v| v.as_deref())
            .ok_or_else(|| HStoreError::KeyNotFound(key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Canonicalize `value` and store it under `key`
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> HStoreResult<()> {
        let canonical = canonicalize(&value.into())?;
        self.entries.insert(key.into(), canonical);
        Ok(())
    }

    /// Remove `key`, returning its stored value if it was present
    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Merge every pair of `other` into this dictionary, overwriting
    pub fn merge(&mut self, other: &HStoreDict) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Sub-dictionary holding only the given keys that are present
    pub fn slice<S: AsRef<str>>(&self, keys: &[S]) -> HStoreDict {
        let entries = keys
            .iter()
            .filter_map(|key| {
                let key = key.as_ref();
                self.entries
                    .get(key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect();
        HStoreDict { entries }
    }

    /// Render as JSON-object text. An empty dictionary renders as `{}`.
    pub fn to_text(&self) -> String {
        let object: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Some(s) => serde_json::Value::String(s.clone()),
                    None => serde_json::Value::Null,
                };
                (k.clone(), value)
            })
            .collect();
        serde_json::Value::Object(object).to_string()
    }

    /// Render in the hstore text format, e.g. `"a"=>"1", "b"=>NULL`.
    ///
    /// Pairs are ordered by key length and then bytes, the order hstore
    /// itself prints them in.
    pub fn to_hstore_literal(&self) -> String {
        let mut pairs: Vec<_> = self.entries.iter().collect();
        pairs.sort_by(|(a, _), (b, _)| storage_cmp(a, b));

        pairs
            .into_iter()
            .map(|(key, value)| match value {
                Some(v) => format!("{}=>{}", quote_hstore(key), quote_hstore(v)),
                None => format!("{}=>NULL", quote_hstore(key)),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The dictionary as a map value of strings and nulls
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        )
    }
}

/// Key order of hstore's own storage: shorter keys first, then bytewise
pub(crate) fn storage_cmp(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

fn quote_hstore(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl fmt::Display for HStoreDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for HStoreDict {
    type Err = HStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

impl TryFrom<Value> for HStoreDict {
    type Error = HStoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl<'a> IntoIterator for &'a HStoreDict {
    type Item = (&'a String, &'a Option<String>);
    type IntoIter = btree_map::Iter<'a, String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_construct_from_accepted_sources() -> HStoreResult<()> {
        assert!(HStoreDict::from_value(Value::map(Vec::<(String, Value)>::new()))?.is_empty());
        assert!(HStoreDict::from_json("{}")?.is_empty());
        assert!(HStoreDict::from_value(Value::Null)?.is_empty());
        assert!(HStoreDict::new().is_empty());

        let dict = HStoreDict::from_value(Value::from(r#"{"a": "1", "b": null}"#))?;
        assert_eq!(dict.get("a"), Some("1"));
        assert_eq!(dict.value("b")?, None);
        Ok(())
    }

    #[test]
    fn test_json_text_keeps_long_integers() -> HStoreResult<()> {
        let dict = HStoreDict::from_json(
            r#"{"big": 100000000000000000000, "neg": -10000000000000000000, "max": 18446744073709551615}"#,
        )?;
        assert_eq!(dict.get("big"), Some("100000000000000000000"));
        assert_eq!(dict.get("neg"), Some("-10000000000000000000"));
        assert_eq!(dict.get("max"), Some("18446744073709551615"));

        let nested = HStoreDict::from_json(r#"{"l": [123456789012345678901]}"#)?;
        assert_eq!(nested.get("l"), Some("[123456789012345678901]"));
        Ok(())
    }

    #[test]
    fn test_construct_rejects_non_mappings() {
        for source in [
            Value::from("wrong"),
            Value::list(["wrong"]),
            Value::from(r#"["wrong"]"#),
            Value::from(3),
            Value::from("3"),
            Value::from(true),
        ] {
            let err = HStoreDict::from_value(source).unwrap_err();
            assert!(matches!(err, HStoreError::Dict(_)), "{}", err);
        }
    }

    #[test]
    fn test_construct_coerces_values() -> HStoreResult<()> {
        let dict = HStoreDict::from_value(Value::map([
            ("num", Value::from(1)),
            ("dec", Value::from(Decimal::new(101, 2))),
            ("flag", Value::from(true)),
        ]))?;
        assert_eq!(dict.get("num"), Some("1"));
        assert_eq!(dict.get("dec"), Some("1.01"));
        assert_eq!(dict.get("flag"), Some("true"));

        let dict = HStoreDict::from_json(r#"{"n": 5, "l": [1, 2]}"#)?;
        assert_eq!(dict.get("n"), Some("5"));
        assert_eq!(dict.get("l"), Some("[1,2]"));
        Ok(())
    }

    #[test]
    fn test_get_and_default() -> HStoreResult<()> {
        let mut dict = HStoreDict::new();
        assert_eq!(dict.get("none_key"), None);
        assert_eq!(dict.get_or("test", Some("test")), Some("test"));
        assert!(matches!(
            dict.value("test"),
            Err(HStoreError::KeyNotFound(_))
        ));

        dict.insert("nothing", Value::Null)?;
        assert_eq!(dict.get_or("nothing", Some("fallback")), None);
        assert!(dict.contains_key("nothing"));
        Ok(())
    }

    #[test]
    fn test_insert_and_remove() -> HStoreResult<()> {
        let mut dict = HStoreDict::new();
        dict.insert("key", "è")?;
        dict.insert("list", Value::list(["a", "b", "c"]))?;
        assert_eq!(dict.get("key"), Some("è"));
        assert_eq!(dict.len(), 2);

        assert_eq!(dict.remove("key"), Some(Some("è".to_string())));
        assert_eq!(dict.remove("key"), None);
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["list"]);

        let err = dict.insert("raw", Value::Bytes(vec![1, 2])).unwrap_err();
        assert!(matches!(err, HStoreError::Coercion { .. }));
        assert!(!dict.contains_key("raw"));
        Ok(())
    }

    #[test]
    fn test_equality_ignores_insertion_order() -> HStoreResult<()> {
        let a = HStoreDict::from_pairs([("v", "1"), ("v2", "3")])?;
        let b = HStoreDict::from_pairs([("v2", "3"), ("v", "1")])?;
        assert_eq!(a, b);
        assert_ne!(a, HStoreDict::from_pairs([("v", "1")])?);
        Ok(())
    }

    #[test]
    fn test_text_round_trip() -> HStoreResult<()> {
        assert_eq!(HStoreDict::new().to_text(), "{}");
        assert_eq!(HStoreDict::new().to_string(), "{}");

        let dict = HStoreDict::from_pairs([
            ("de", Value::from("Grüße, Welt")),
            ("quote", Value::from("' select")),
            ("none", Value::Null),
        ])?;
        let parsed: HStoreDict = dict.to_text().parse()?;
        assert_eq!(parsed, dict);
        assert!(HStoreDict::from_json(&HStoreDict::new().to_text())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_hstore_literal() -> HStoreResult<()> {
        let dict = HStoreDict::from_pairs([
            ("theKey", Value::from("some\"value")),
            ("v2", Value::from("3")),
            ("n", Value::Null),
        ])?;
        assert_eq!(
            dict.to_hstore_literal(),
            r#""n"=>NULL, "v2"=>"3", "theKey"=>"some\"value""#
        );
        assert_eq!(HStoreDict::new().to_hstore_literal(), "");
        Ok(())
    }

    #[test]
    fn test_merge_and_slice() -> HStoreResult<()> {
        let mut dict = HStoreDict::from_pairs([("v", "1"), ("v2", "3")])?;
        dict.merge(&HStoreDict::from_pairs([("v2", "10"), ("v3", "20")])?);
        assert_eq!(
            dict,
            HStoreDict::from_pairs([("v", "1"), ("v2", "10"), ("v3", "20")])?
        );

        assert_eq!(dict.slice(&["v"]), HStoreDict::from_pairs([("v", "1")])?);
        assert!(dict.slice(&["ggg"]).is_empty());
        Ok(())
    }

    #[test]
    fn test_serde_is_transparent() -> HStoreResult<()> {
        let dict = HStoreDict::from_pairs([("a", Value::from("1")), ("b", Value::Null)])?;
        let encoded = bincode::serialize(&dict)?;
        let decoded: HStoreDict = bincode::deserialize(&encoded)?;
        assert_eq!(decoded, dict);
        Ok(())
    }
}
