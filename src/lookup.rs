//! Query lookups against dictionary columns.
//!
//! This module provides:
//! - [`Lookup`]: a validated lookup predicate (`exact`, `contains`,
//!   `icontains`, `isnull`, `gt`/`gte`/`lt`/`lte`, implicit key tests)
//! - [`compile`]: translation of a lookup into a [`Condition`] tree with
//!   per-key casts
//! - [`Condition::to_sql`]: rendering to parameterized hstore SQL
//! - [`evaluate_condition`]: evaluation of a condition against a stored
//!   dictionary with the same semantics the database applies

pub mod compiler;
pub mod condition;
pub mod eval;
pub mod operator;
pub mod predicate;
pub mod sql;

pub use compiler::{compile, compile_lookup};
pub use condition::Condition;
pub use eval::{evaluate_condition, CastValue};
pub use operator::ComparisonOp;
pub use predicate::{Containment, Lookup, LookupKind, NullTest};
pub use sql::{quote_ident, SqlFragment};
