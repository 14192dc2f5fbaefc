//! Snapshots of table contents on disk.
//!
//! A snapshot is the bincode encoding of a table's rows in their stored
//! text form, tagged with the table name and its dictionary columns.

use crate::error::{HStoreError, HStoreResult};
use crate::store::table::{Table, TableState};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    table: String,
    columns: Vec<String>,
    state: TableState,
}

/// Write every row of `table` to `path`
pub fn save_snapshot(table: &Table, path: impl AsRef<Path>) -> HStoreResult<()> {
    let snapshot = Snapshot {
        table: table.name().to_string(),
        columns: table.fields().iter().map(|f| f.name().to_string()).collect(),
        state: table.snapshot_state(),
    };

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    bincode::serialize_into(&mut writer, &snapshot)?;
    writer.flush()?;
    info!(
        "saved {} row(s) of '{}' to {}",
        snapshot.state.rows.len(),
        snapshot.table,
        path.as_ref().display()
    );
    Ok(())
}

/// Replace the rows of `table` with the snapshot at `path`.
///
/// Columns the table has but the snapshot lacks are filled with the
/// field's default, so a NOT NULL column without one fails with
/// `Integrity`.
pub fn load_snapshot(table: &Table, path: impl AsRef<Path>) -> HStoreResult<()> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut snapshot: Snapshot = bincode::deserialize_from(reader)?;

    if snapshot.table != table.name() {
        return Err(HStoreError::Integrity(format!(
            "snapshot of table '{}' cannot be loaded into '{}'",
            snapshot.table,
            table.name()
        )));
    }
    for column in &snapshot.columns {
        table.field(column)?;
    }
    for field in table.fields() {
        if snapshot.state.rows.is_empty() || snapshot.columns.iter().any(|c| c == field.name()) {
            continue;
        }
        let stored = field.to_db(field.default_value().as_ref())?;
        debug!("filling column '{}' missing from the snapshot", field.name());
        for row in snapshot.state.rows.values_mut() {
            row.insert(field.name().to_string(), stored.clone());
        }
    }

    info!(
        "loaded {} row(s) into '{}' from {}",
        snapshot.state.rows.len(),
        table.name(),
        path.as_ref().display()
    );
    table.restore_state(snapshot.state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::HStoreDict;
    use crate::field::{DictionaryField, FieldOptions};
    use crate::store::RowId;
    use crate::value::Value;
    use anyhow::Result;
    use tempfile::tempdir;

    fn table() -> Table {
        Table::new("databag")
            .with_field(DictionaryField::new("data"))
            .with_field(DictionaryField::with_options(
                "extra",
                FieldOptions::new().null(true),
            ))
    }

    #[test]
    fn test_snapshot_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("databag.snapshot");

        let source = table();
        let id = source.insert([
            ("data", Value::map([("v", "1"), ("v2", "3")])),
            ("extra", Value::Null),
        ])?;
        source.insert([("data", Value::map([("v", Value::Null)]))])?;
        save_snapshot(&source, &path)?;

        let restored = table();
        load_snapshot(&restored, &path)?;
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(id)?, source.get(id)?);
        assert_eq!(restored.filter("data", "contains", Value::list(["v2"]))?.ids()?, vec![id]);

        // Identifiers continue after the restored rows.
        assert_eq!(restored.insert([("data", Value::map([("n", "1")]))])?, RowId(3));
        Ok(())
    }

    #[test]
    fn test_snapshot_table_mismatch() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("databag.snapshot");
        save_snapshot(&table(), &path)?;

        let other = Table::new("other").with_field(DictionaryField::new("data"));
        let err = load_snapshot(&other, &path).unwrap_err();
        assert!(matches!(err, HStoreError::Integrity(_)));

        let narrow = Table::new("databag").with_field(DictionaryField::new("data"));
        let err = load_snapshot(&narrow, &path).unwrap_err();
        assert!(matches!(err, HStoreError::UnknownColumn(_)));
        Ok(())
    }

    #[test]
    fn test_snapshot_missing_column_takes_default() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("databag.snapshot");

        let narrow = Table::new("databag").with_field(DictionaryField::new("data"));
        let id = narrow.insert([("data", Value::map([("v", "1")]))])?;
        save_snapshot(&narrow, &path)?;

        let wide = Table::new("databag")
            .with_field(DictionaryField::new("data"))
            .with_field(DictionaryField::new("extra"));
        load_snapshot(&wide, &path)?;
        assert_eq!(wide.filter("extra", "isnull", true)?.count()?, 0);
        assert!(wide.get(id)?.get("extra")?.is_empty());

        let seeded = Table::new("databag")
            .with_field(DictionaryField::new("data"))
            .with_field(DictionaryField::with_options(
                "extra",
                FieldOptions::new().default_value(HStoreDict::from_pairs([("x", "1")])?),
            ));
        load_snapshot(&seeded, &path)?;
        assert_eq!(seeded.peek(id, "extra", "x")?, Some("1".to_string()));

        let strict = Table::new("databag")
            .with_field(DictionaryField::new("data"))
            .with_field(DictionaryField::with_options(
                "extra",
                FieldOptions::new().default_null(),
            ));
        let err = load_snapshot(&strict, &path).unwrap_err();
        assert!(matches!(err, HStoreError::Integrity(_)));
        assert!(strict.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_snapshot_file() {
        let err = load_snapshot(&table(), "/nonexistent/databag.snapshot").unwrap_err();
        assert!(matches!(err, HStoreError::Io(_)));
    }
}
