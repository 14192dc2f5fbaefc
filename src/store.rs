//! In-memory reference store for tables with dictionary columns.
//!
//! [`Table`] keeps each row's dictionary columns in their stored text form
//! and executes compiled conditions with [`evaluate_condition`], giving the
//! same results the rendered SQL gives against PostgreSQL. Every query can
//! also be rendered as SQL.
//!
//! [`evaluate_condition`]: crate::lookup::evaluate_condition

pub mod row_ops;
pub mod snapshot;
pub mod table;

pub use row_ops::RowOperation;
pub use snapshot::{load_snapshot, save_snapshot};
pub use table::{Query, Record, Table};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Row identifier, assigned in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
