//! Column binding for dictionary-valued attributes.
//!
//! [`DictionaryField`] is the seam between [`HStoreDict`] and the host
//! persistence layer. The host calls it at fixed points in a record's
//! lifecycle:
//!
//! - [`DictionaryField::default_value`] when a record is created without a
//!   value for the attribute
//! - [`DictionaryField::assign`] when the attribute is assigned
//! - [`DictionaryField::from_db`] when a row is loaded
//! - [`DictionaryField::to_db`] when a row is saved
//! - [`DictionaryField::clean`] during full validation
//!
//! A nullable dictionary field never resolves its default to a true null:
//! it resolves to an empty container. This keeps records created through
//! the field indistinguishable from records with an empty dictionary.

pub mod schema;

pub use schema::{SchemaField, SchemaKind, VirtualField};

use crate::dict::HStoreDict;
use crate::error::{HStoreError, HStoreResult};
use crate::value::Value;
use log::debug;
use std::collections::HashSet;

/// Default declared for a dictionary field
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldDefault {
    /// No default declared: an empty dictionary
    #[default]
    Unset,
    /// An explicit null default
    Null,
    Value(HStoreDict),
}

/// Options of a dictionary field
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldOptions {
    pub null: bool,
    pub blank: bool,
    pub default: FieldDefault,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn null(mut self, null: bool) -> Self {
        self.null = null;
        self
    }

    pub fn blank(mut self, blank: bool) -> Self {
        self.blank = blank;
        self
    }

    pub fn default_value(mut self, default: HStoreDict) -> Self {
        self.default = FieldDefault::Value(default);
        self
    }

    pub fn default_null(mut self) -> Self {
        self.default = FieldDefault::Null;
        self
    }
}

/// A dictionary-valued attribute bound to an hstore column
#[derive(Debug, Clone)]
pub struct DictionaryField {
    name: String,
    options: FieldOptions,
    schema: Vec<VirtualField>,
}

impl DictionaryField {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, FieldOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
            schema: Vec::new(),
        }
    }

    /// Attach typed companion accessors stored under the field's keys
    pub fn with_schema(mut self, schema: Vec<SchemaField>) -> HStoreResult<Self> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(schema.len());
        for descriptor in schema {
            if !seen.insert(descriptor.name.clone()) {
                return Err(HStoreError::validation(
                    &self.name,
                    format!("duplicate schema key '{}'", descriptor.name),
                ));
            }
            fields.push(VirtualField::new(descriptor)?);
        }
        self.schema = fields;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn is_nullable(&self) -> bool {
        self.options.null
    }

    pub fn virtual_fields(&self) -> &[VirtualField] {
        &self.schema
    }

    pub fn virtual_field(&self, name: &str) -> Option<&VirtualField> {
        self.schema.iter().find(|f| f.name() == name)
    }

    /// Resolve the value of an attribute that was not given one.
    ///
    /// Returns `None` only for a non-nullable field declared with a null
    /// default; saving such a record violates the column's NOT NULL
    /// constraint.
    pub fn default_value(&self) -> Option<HStoreDict> {
        match &self.options.default {
            FieldDefault::Value(default) => {
                let mut dict = self.schema_defaults();
                dict.merge(default);
                Some(dict)
            }
            FieldDefault::Unset => Some(self.schema_defaults()),
            FieldDefault::Null if self.options.null => {
                debug!(
                    "field '{}' is nullable, resolving its null default to an empty dictionary",
                    self.name
                );
                Some(self.schema_defaults())
            }
            FieldDefault::Null => None,
        }
    }

    fn schema_defaults(&self) -> HStoreDict {
        let mut dict = HStoreDict::new();
        for field in &self.schema {
            // Defaults were checked when the schema was attached.
            if let Some(default) = field.default_value() {
                if dict.insert(field.name(), default).is_err() {
                    debug!("skipping unstorable default for '{}'", field.name());
                }
            }
        }
        dict
    }

    /// Convert an assigned value into a dictionary
    pub fn assign(&self, value: Value) -> HStoreResult<HStoreDict> {
        HStoreDict::from_value(value)
    }

    /// Build the attribute from the stored column text; NULL becomes empty
    pub fn from_db(&self, stored: Option<&str>) -> HStoreResult<HStoreDict> {
        match stored {
            Some(text) => HStoreDict::from_json(text),
            None => Ok(HStoreDict::new()),
        }
    }

    /// Serialize the attribute for storage
    pub fn to_db(&self, value: Option<&HStoreDict>) -> HStoreResult<Option<String>> {
        match value {
            Some(dict) => Ok(Some(dict.to_text())),
            None if self.options.null => Ok(None),
            None => Err(HStoreError::Integrity(format!(
                "null value in column \"{}\" violates not-null constraint",
                self.name
            ))),
        }
    }

    /// Full validation of the live attribute value.
    ///
    /// Accepts a map whose values are all strings or nulls, or JSON-object
    /// text; anything else is a validation error. Empty dictionaries are
    /// rejected unless the field is blank-able.
    pub fn clean(&self, raw: &Value) -> HStoreResult<HStoreDict> {
        let dict = match raw {
            Value::Null if self.options.null => HStoreDict::new(),
            Value::Null => {
                return Err(HStoreError::validation(&self.name, "this field cannot be null"))
            }
            Value::String(text) => HStoreDict::from_json(text)
                .map_err(|e| HStoreError::validation(&self.name, e.to_string()))?,
            Value::Map(entries) => {
                for (key, value) in entries {
                    if !matches!(value, Value::Null | Value::String(_)) {
                        return Err(HStoreError::validation(
                            &self.name,
                            format!(
                                "value for key '{}' must be a string or null, got {}",
                                key,
                                value.kind()
                            ),
                        ));
                    }
                }
                HStoreDict::from_value(raw.clone())?
            }
            other => {
                return Err(HStoreError::validation(
                    &self.name,
                    format!("expected a dictionary, got {}", other.kind()),
                ))
            }
        };

        self.validate(&dict)?;
        Ok(dict)
    }

    /// Validate a dictionary already held by a record
    pub fn validate(&self, dict: &HStoreDict) -> HStoreResult<()> {
        if dict.is_empty() && !self.options.blank {
            return Err(HStoreError::validation(&self.name, "this field cannot be blank"));
        }
        for field in &self.schema {
            field.validate(dict)?;
        }
        Ok(())
    }
}
