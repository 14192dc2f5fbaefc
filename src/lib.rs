pub mod dict;
pub mod error;
pub mod field;
pub mod lookup;
pub mod store;
pub mod value;

pub use dict::HStoreDict;
pub use error::{HStoreError, HStoreResult};
pub use field::{DictionaryField, FieldDefault, FieldOptions};
pub use lookup::{compile, compile_lookup, Condition, Lookup, LookupKind, SqlFragment};
pub use store::{RowId, Table};
pub use value::{Value, ValueKind};
