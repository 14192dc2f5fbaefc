//! Evaluation of conditions against stored dictionaries.
//!
//! This mirrors what the database does with the rendered SQL: a NULL
//! column only satisfies a column null test, a missing key never satisfies
//! a comparison, and casts fail loudly on text that is not valid input for
//! the target type.

use crate::dict::HStoreDict;
use crate::error::{HStoreError, HStoreResult};
use crate::lookup::condition::Condition;
use crate::value::coerce::{parse_date, parse_datetime, parse_time};
use crate::value::CastDirective;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::trace;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

/// A stored value read under a cast
#[derive(Debug, Clone, PartialEq)]
pub enum CastValue {
    Text(String),
    Boolean(bool),
    BigInt(i64),
    Float(f64),
    Numeric(Decimal),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl CastValue {
    /// Read `text` under `cast`
    pub fn parse(text: &str, cast: CastDirective) -> HStoreResult<Self> {
        let invalid = || HStoreError::InvalidCast {
            value: text.to_string(),
            cast,
        };

        let value = match cast {
            CastDirective::None => CastValue::Text(text.to_string()),
            CastDirective::Boolean => CastValue::Boolean(parse_bool(text).ok_or_else(invalid)?),
            CastDirective::BigInt => {
                CastValue::BigInt(text.trim().parse().map_err(|_| invalid())?)
            }
            CastDirective::Float8 => {
                CastValue::Float(text.trim().parse().map_err(|_| invalid())?)
            }
            CastDirective::Numeric => {
                let trimmed = text.trim();
                CastValue::Numeric(
                    Decimal::from_str(trimmed)
                        .or_else(|_| Decimal::from_scientific(trimmed))
                        .map_err(|_| invalid())?,
                )
            }
            CastDirective::Timestamp => {
                CastValue::Timestamp(parse_datetime(text).ok_or_else(invalid)?)
            }
            CastDirective::Date => CastValue::Date(parse_date(text).ok_or_else(invalid)?),
            CastDirective::Time => CastValue::Time(parse_time(text).ok_or_else(invalid)?),
        };
        Ok(value)
    }

    /// Compare two values read under the same cast
    pub fn compare(&self, other: &CastValue) -> Option<Ordering> {
        match (self, other) {
            (CastValue::Text(a), CastValue::Text(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (CastValue::Boolean(a), CastValue::Boolean(b)) => Some(a.cmp(b)),
            (CastValue::BigInt(a), CastValue::BigInt(b)) => Some(a.cmp(b)),
            (CastValue::Float(a), CastValue::Float(b)) => a.partial_cmp(b),
            (CastValue::Numeric(a), CastValue::Numeric(b)) => Some(a.cmp(b)),
            (CastValue::Timestamp(a), CastValue::Timestamp(b)) => Some(a.cmp(b)),
            (CastValue::Date(a), CastValue::Date(b)) => Some(a.cmp(b)),
            (CastValue::Time(a), CastValue::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Boolean input as `::boolean` reads it: any unambiguous prefix of the
/// accepted words, case-insensitively
fn parse_bool(text: &str) -> Option<bool> {
    let word = text.trim().to_ascii_lowercase();
    let abbreviates =
        |full: &str, min: usize| word.len() >= min && full.starts_with(word.as_str());

    if word == "1" || abbreviates("true", 1) || abbreviates("yes", 1) || abbreviates("on", 2) {
        Some(true)
    } else if word == "0" || abbreviates("false", 1) || abbreviates("no", 1) || abbreviates("off", 2)
    {
        Some(false)
    } else {
        None
    }
}

/// Evaluate `condition` against a column value; `None` is a NULL column
pub fn evaluate_condition(condition: &Condition, column: Option<&HStoreDict>) -> HStoreResult<bool> {
    let stored = match column {
        Some(stored) => stored,
        None => return Ok(evaluate_null_column(condition)),
    };

    let matched = match condition {
        Condition::Always => true,

        Condition::ColumnIsNull { negated } => *negated,

        Condition::Equals(dict) => stored == dict,

        Condition::ContainsPairs(dict) => dict
            .into_iter()
            .all(|(key, value)| stored.contains_key(key) && stored.get(key) == value.as_deref()),

        Condition::HasKeys(keys) => keys.iter().all(|key| stored.contains_key(key)),

        Condition::ValueIn { key, values } => match stored.get(key) {
            Some(text) => values.iter().any(|v| v == text),
            None => false,
        },

        Condition::Compare {
            key,
            op,
            cast,
            value,
        } => match stored.get(key) {
            Some(text) => {
                let left = CastValue::parse(text, *cast)?;
                let right = CastValue::parse(value, *cast)?;
                left.compare(&right).map_or(false, |ordering| op.matches(ordering))
            }
            None => false,
        },

        Condition::ValueIsNull { key, negated } => {
            let is_null_marker = stored.contains_key(key) && stored.get(key).is_none();
            is_null_marker != *negated
        }

        Condition::TextContains {
            needle,
            case_insensitive,
        } => {
            let text = stored.to_hstore_literal();
            if *case_insensitive {
                text.to_lowercase().contains(&needle.to_lowercase())
            } else {
                text.contains(needle.as_str())
            }
        }

        Condition::And(conditions) => {
            for condition in conditions {
                if !evaluate_condition(condition, column)? {
                    return Ok(false);
                }
            }
            true
        }
    };

    trace!("{:?} -> {}", condition, matched);
    Ok(matched)
}

/// Against a NULL column only column-level tests can be true
fn evaluate_null_column(condition: &Condition) -> bool {
    match condition {
        Condition::Always => true,
        Condition::ColumnIsNull { negated } => !negated,
        Condition::And(conditions) => conditions.iter().all(evaluate_null_column),
        _ => false,
    }
}
