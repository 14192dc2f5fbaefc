//! Rendering of conditions as PostgreSQL hstore SQL.
//!
//! Every key and value is passed as a positional text parameter (`$1`,
//! `$2`, ...), never spliced into the statement.

use crate::lookup::condition::Condition;
use crate::lookup::operator::ComparisonOp;

/// A SQL fragment with its positional text parameters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<String>,
}

/// Accumulates parameters while a statement is rendered
#[derive(Debug, Default)]
pub(crate) struct ParamList {
    params: Vec<String>,
}

impl ParamList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a parameter and return its placeholder
    pub(crate) fn push(&mut self, value: impl Into<String>) -> String {
        self.params.push(value.into());
        format!("${}", self.params.len())
    }

    /// Placeholders for a list of parameters, as an `ARRAY[...]` literal
    pub(crate) fn push_array<S: AsRef<str>>(&mut self, values: &[S]) -> String {
        let placeholders: Vec<String> = values.iter().map(|v| self.push(v.as_ref())).collect();
        format!("ARRAY[{}]::text[]", placeholders.join(", "))
    }

    pub(crate) fn into_params(self) -> Vec<String> {
        self.params
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl Condition {
    /// Render this condition against `column`
    pub fn to_sql(&self, column: &str) -> SqlFragment {
        let mut params = ParamList::new();
        let sql = self.render(&quote_ident(column), &mut params);
        SqlFragment {
            sql,
            params: params.into_params(),
        }
    }

    pub(crate) fn render(&self, column: &str, params: &mut ParamList) -> String {
        match self {
            Condition::Always => "TRUE".to_string(),

            Condition::ColumnIsNull { negated: false } => format!("{} IS NULL", column),
            Condition::ColumnIsNull { negated: true } => format!("{} IS NOT NULL", column),

            Condition::Equals(dict) => {
                format!("{} = {}::hstore", column, params.push(dict.to_hstore_literal()))
            }

            Condition::ContainsPairs(dict) => {
                format!("{} @> {}::hstore", column, params.push(dict.to_hstore_literal()))
            }

            Condition::HasKeys(keys) => format!("{} ?& {}", column, params.push_array(keys)),

            Condition::ValueIn { key, values } => {
                if values.is_empty() {
                    return "FALSE".to_string();
                }
                let key = params.push(key.as_str());
                let placeholders: Vec<String> =
                    values.iter().map(|v| params.push(v.as_str())).collect();
                format!("({} -> {}) IN ({})", column, key, placeholders.join(", "))
            }

            Condition::Compare {
                key,
                op,
                cast,
                value,
            } => {
                let key = params.push(key.as_str());
                let value = params.push(value.as_str());
                let cast = cast.as_sql();
                if cast.is_empty() && *op != ComparisonOp::Eq {
                    // Text ordering must not depend on the database collation.
                    format!(
                        "({} -> {}) COLLATE \"C\" {} {}",
                        column,
                        key,
                        op.as_str(),
                        value
                    )
                } else {
                    format!(
                        "({} -> {}){} {} {}{}",
                        column,
                        key,
                        cast,
                        op.as_str(),
                        value,
                        cast
                    )
                }
            }

            Condition::ValueIsNull { key, negated } => {
                let key = params.push(key.as_str());
                let test = format!("({} ? {} AND ({} -> {}) IS NULL)", column, key, column, key);
                if *negated {
                    format!("NOT {}", test)
                } else {
                    test
                }
            }

            Condition::TextContains {
                needle,
                case_insensitive,
            } => {
                let pattern = params.push(format!("%{}%", escape_like(needle)));
                let op = if *case_insensitive { "ILIKE" } else { "LIKE" };
                format!("{}::text {} {}", column, op, pattern)
            }

            Condition::And(conditions) => {
                if conditions.is_empty() {
                    return "TRUE".to_string();
                }
                conditions
                    .iter()
                    .map(|c| format!("({})", c.render(column, params)))
                    .collect::<Vec<_>>()
                    .join(" AND ")
            }
        }
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
