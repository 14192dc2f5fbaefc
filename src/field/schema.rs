//! Typed companion accessors over keys of a dictionary field.
//!
//! A schema declares keys with a type. Each key gets a [`VirtualField`]
//! that reads the stored string back into a typed [`Value`], canonicalizes
//! values written through it, and validates what is stored.

use crate::dict::HStoreDict;
use crate::error::{HStoreError, HStoreResult};
use crate::value::coerce::{parse_date, parse_datetime};
use crate::value::Value;
use rust_decimal::Decimal;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Type of a schema key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Integer,
    Float,
    Boolean,
    Char,
    Text,
    Date,
    DateTime,
    Decimal,
    Email,
    IpAddress,
    Url,
}

impl SchemaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Integer => "integer",
            SchemaKind::Float => "float",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Char => "char",
            SchemaKind::Text => "text",
            SchemaKind::Date => "date",
            SchemaKind::DateTime => "datetime",
            SchemaKind::Decimal => "decimal",
            SchemaKind::Email => "email",
            SchemaKind::IpAddress => "ip",
            SchemaKind::Url => "url",
        }
    }

    fn is_textual(&self) -> bool {
        matches!(
            self,
            SchemaKind::Char
                | SchemaKind::Text
                | SchemaKind::Email
                | SchemaKind::IpAddress
                | SchemaKind::Url
        )
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaKind {
    type Err = HStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "integer" => SchemaKind::Integer,
            "float" => SchemaKind::Float,
            "boolean" => SchemaKind::Boolean,
            "char" => SchemaKind::Char,
            "text" => SchemaKind::Text,
            "date" => SchemaKind::Date,
            "datetime" => SchemaKind::DateTime,
            "decimal" => SchemaKind::Decimal,
            "email" => SchemaKind::Email,
            "ip" => SchemaKind::IpAddress,
            "url" => SchemaKind::Url,
            other => {
                return Err(HStoreError::Dict(format!(
                    "unknown schema kind '{}'",
                    other
                )))
            }
        };
        Ok(kind)
    }
}

/// Declaration of one schema key
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub kind: SchemaKind,
    pub default: Option<Value>,
    pub null: bool,
    pub blank: bool,
    pub max_length: Option<usize>,
    pub choices: Vec<String>,
    pub decimal_places: Option<u32>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, kind: SchemaKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            null: false,
            blank: false,
            max_length: None,
            choices: Vec::new(),
            decimal_places: None,
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn null(mut self, null: bool) -> Self {
        self.null = null;
        self
    }

    pub fn blank(mut self, blank: bool) -> Self {
        self.blank = blank;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn choices<S: Into<String>>(mut self, choices: impl IntoIterator<Item = S>) -> Self {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn decimal_places(mut self, places: u32) -> Self {
        self.decimal_places = Some(places);
        self
    }
}

/// Typed accessor for one key of a dictionary
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualField {
    descriptor: SchemaField,
}

impl VirtualField {
    /// Create an accessor, checking that the declared default fits the kind
    pub fn new(mut descriptor: SchemaField) -> HStoreResult<Self> {
        if let Some(default) = descriptor.default.take() {
            let field = Self {
                descriptor: descriptor.clone(),
            };
            descriptor.default = Some(field.coerce(default)?);
        }
        Ok(Self { descriptor })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> SchemaKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &SchemaField {
        &self.descriptor
    }

    pub fn default_value(&self) -> Option<Value> {
        self.descriptor.default.clone()
    }

    /// Read the key as a typed value; absent keys yield the default
    pub fn get(&self, dict: &HStoreDict) -> HStoreResult<Value> {
        if !dict.contains_key(self.name()) {
            return Ok(self.default_value().unwrap_or(Value::Null));
        }
        match dict.get(self.name()) {
            Some(text) => self.parse(text),
            None => Ok(Value::Null),
        }
    }

    /// Write a value through the accessor
    pub fn set(&self, dict: &mut HStoreDict, value: impl Into<Value>) -> HStoreResult<()> {
        let value = self.coerce(value.into())?;
        dict.insert(self.name(), value)
    }

    /// Check the stored value against the declaration
    pub fn validate(&self, dict: &HStoreDict) -> HStoreResult<()> {
        let value = self.get(dict)?;
        let descriptor = &self.descriptor;

        let text = match &value {
            Value::Null if descriptor.null || descriptor.blank => return Ok(()),
            Value::Null => return Err(self.invalid("this field cannot be null")),
            Value::String(text) => text.as_str(),
            Value::Decimal(d) => {
                if let Some(places) = descriptor.decimal_places {
                    if d.normalize().scale() > places {
                        return Err(self.invalid(format!(
                            "ensure that there are no more than {} decimal places",
                            places
                        )));
                    }
                }
                return Ok(());
            }
            _ => return Ok(()),
        };

        if text.is_empty() {
            if descriptor.blank {
                return Ok(());
            }
            return Err(self.invalid("this field cannot be blank"));
        }
        if let Some(max) = descriptor.max_length {
            let length = text.chars().count();
            if length > max {
                return Err(self.invalid(format!(
                    "ensure this value has at most {} characters (it has {})",
                    max, length
                )));
            }
        }
        if !descriptor.choices.is_empty() && !descriptor.choices.iter().any(|c| c == text) {
            return Err(self.invalid(format!("'{}' is not a valid choice", text)));
        }

        let well_formed = match descriptor.kind {
            SchemaKind::Email => is_email(text),
            SchemaKind::IpAddress => text.parse::<IpAddr>().is_ok(),
            SchemaKind::Url => is_url(text),
            _ => true,
        };
        if !well_formed {
            return Err(self.invalid(format!(
                "'{}' is not a valid {}",
                text, descriptor.kind
            )));
        }
        Ok(())
    }

    /// Read stored text as a value of the declared kind
    fn parse(&self, text: &str) -> HStoreResult<Value> {
        let parsed = match self.descriptor.kind {
            kind if kind.is_textual() => Some(Value::String(text.to_string())),
            SchemaKind::Integer => text.trim().parse::<i64>().ok().map(Value::Integer),
            SchemaKind::Float => text.trim().parse::<f64>().ok().map(Value::Float),
            SchemaKind::Boolean => match text.trim() {
                "true" | "True" | "t" | "1" => Some(Value::Boolean(true)),
                "false" | "False" | "f" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            SchemaKind::Decimal => Decimal::from_str(text.trim()).ok().map(Value::Decimal),
            SchemaKind::Date => parse_date(text).map(Value::Date),
            SchemaKind::DateTime => parse_datetime(text).map(Value::DateTime),
            _ => None,
        };
        parsed.ok_or_else(|| {
            self.invalid(format!(
                "'{}' is not a valid {}",
                text, self.descriptor.kind
            ))
        })
    }

    /// Convert an assigned value to the declared kind
    fn coerce(&self, value: Value) -> HStoreResult<Value> {
        let kind = self.descriptor.kind;
        let coerced = match (kind, value) {
            (_, Value::Null) => Value::Null,
            (_, Value::String(text)) => self.parse(&text)?,
            (SchemaKind::Integer, v @ Value::Integer(_)) => v,
            (SchemaKind::Float, Value::Integer(n)) => Value::Float(n as f64),
            (SchemaKind::Float, v @ Value::Float(_)) => v,
            (SchemaKind::Boolean, v @ Value::Boolean(_)) => v,
            (SchemaKind::Decimal, Value::Integer(n)) => Value::Decimal(Decimal::from(n)),
            (SchemaKind::Decimal, v @ Value::Decimal(_)) => v,
            (SchemaKind::Date, v @ Value::Date(_)) => v,
            (SchemaKind::Date, Value::DateTime(dt)) => Value::Date(dt.date()),
            (SchemaKind::DateTime, v @ Value::DateTime(_)) => v,
            (_, other) => {
                return Err(self.invalid(format!(
                    "expected a {} value, got {}",
                    kind,
                    other.kind()
                )))
            }
        };
        Ok(coerced)
    }

    fn invalid(&self, message: impl Into<String>) -> HStoreError {
        HStoreError::validation(&self.descriptor.name, message)
    }
}

fn is_email(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !text.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn is_url(text: &str) -> bool {
    ["http://", "https://", "ftp://", "ftps://"]
        .iter()
        .find_map(|scheme| text.strip_prefix(scheme))
        .map_or(false, |rest| {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !rest.chars().any(char::is_whitespace)
        })
}
