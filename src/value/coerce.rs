//! Reduction of values to their canonical stored form.

use crate::error::{HStoreError, HStoreResult};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Convert a value into the string (or null) actually persisted for it.
///
/// Strings are kept as-is, scalars become their JSON/decimal text, and
/// lists and maps become compact JSON text. Bytes are rejected.
pub fn canonicalize(value: &Value) -> HStoreResult<Option<String>> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => float_text(*f),
        Value::Decimal(d) => d.to_string(),
        Value::Date(d) => date_text(d),
        Value::DateTime(dt) => datetime_text(dt),
        Value::Time(t) => time_text(t),
        Value::List(_) | Value::Map(_) => to_json(value)?.to_string(),
        Value::Bytes(_) => return Err(HStoreError::Coercion { kind: value.kind() }),
    };
    Ok(Some(text))
}

/// Render a value as JSON, the form used for lists and maps.
///
/// Decimals become JSON numbers, dates and times become JSON strings.
pub fn to_json(value: &Value) -> HStoreResult<serde_json::Value> {
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(n) => serde_json::Value::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or(HStoreError::Coercion { kind: value.kind() })?,
        Value::Decimal(d) => serde_json::Number::from_str(&d.to_string())
            .map(serde_json::Value::Number)
            .map_err(|_| HStoreError::Coercion { kind: value.kind() })?,
        Value::Date(d) => serde_json::Value::String(date_text(d)),
        Value::DateTime(dt) => serde_json::Value::String(datetime_text(dt)),
        Value::Time(t) => serde_json::Value::String(time_text(t)),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(
            items.iter().map(to_json).collect::<HStoreResult<Vec<_>>>()?,
        ),
        Value::Map(entries) => {
            let mut object = serde_json::Map::with_capacity(entries.len());
            for (key, item) in entries {
                object.insert(key.clone(), to_json(item)?);
            }
            serde_json::Value::Object(object)
        }
        Value::Bytes(_) => return Err(HStoreError::Coercion { kind: value.kind() }),
    };
    Ok(json)
}

fn float_text(f: f64) -> String {
    // Finite floats share the JSON rendering so that 1.0 stays "1.0".
    match serde_json::Number::from_f64(f) {
        Some(n) => n.to_string(),
        None => f.to_string(),
    }
}

pub(crate) fn date_text(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub(crate) fn datetime_text(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn time_text(t: &NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Parse a stored date
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

/// Parse a stored timestamp, accepting either a `T` or a space separator
/// and a bare date (midnight).
pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a stored time of day
pub(crate) fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}
