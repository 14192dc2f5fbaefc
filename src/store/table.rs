//! Tables, records and chained queries.

use crate::dict::HStoreDict;
use crate::error::{HStoreError, HStoreResult};
use crate::field::DictionaryField;
use crate::lookup::sql::ParamList;
use crate::lookup::{compile, evaluate_condition, quote_ident, Condition, Lookup, SqlFragment};
use crate::store::row_ops::{storage_order, RowOperation};
use crate::store::RowId;
use crate::value::Value;
use log::{debug, trace};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stored text of each dictionary column, `None` for NULL
pub(crate) type StoredRow = BTreeMap<String, Option<String>>;

/// Rows of a table and the next identifier to assign
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TableState {
    pub(crate) next_id: u64,
    pub(crate) rows: BTreeMap<RowId, StoredRow>,
}

/// A loaded row: every dictionary column converted for the host
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RowId,
    columns: BTreeMap<String, HStoreDict>,
}

impl Record {
    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn get(&self, column: &str) -> HStoreResult<&HStoreDict> {
        self.columns
            .get(column)
            .ok_or_else(|| HStoreError::UnknownColumn(column.to_string()))
    }
}

/// A table whose columns are dictionary fields
#[derive(Debug)]
pub struct Table {
    name: String,
    fields: Vec<DictionaryField>,
    state: RwLock<TableState>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            state: RwLock::new(TableState::default()),
        }
    }

    /// Add a dictionary column
    pub fn with_field(mut self, field: DictionaryField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[DictionaryField] {
        &self.fields
    }

    pub fn field(&self, column: &str) -> HStoreResult<&DictionaryField> {
        self.fields
            .iter()
            .find(|f| f.name() == column)
            .ok_or_else(|| HStoreError::UnknownColumn(column.to_string()))
    }

    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a row.
    ///
    /// Columns without a value take the field's default. Assigned values go
    /// through the field, so an explicit null becomes an empty dictionary.
    pub fn insert<K, V, I>(&self, values: I) -> HStoreResult<RowId>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut values: BTreeMap<String, Value> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut row = StoredRow::new();
        for field in &self.fields {
            let stored = match values.remove(field.name()) {
                Some(value) => self.stored_text(field, value)?,
                None => field.to_db(field.default_value().as_ref())?,
            };
            row.insert(field.name().to_string(), stored);
        }
        if let Some(column) = values.into_keys().next() {
            return Err(HStoreError::UnknownColumn(column));
        }

        let mut state = self.state.write();
        state.next_id += 1;
        let id = RowId(state.next_id);
        debug!("inserting row {} into '{}'", id, self.name);
        state.rows.insert(id, row);
        Ok(id)
    }

    fn stored_text(&self, field: &DictionaryField, value: Value) -> HStoreResult<Option<String>> {
        let dict = field.assign(value)?;
        field.to_db(Some(&dict))
    }

    /// Load one row
    pub fn get(&self, id: RowId) -> HStoreResult<Record> {
        let state = self.state.read();
        let row = state.rows.get(&id).ok_or(HStoreError::RowNotFound(id))?;
        self.load(id, row)
    }

    fn load(&self, id: RowId, row: &StoredRow) -> HStoreResult<Record> {
        let mut columns = BTreeMap::new();
        for field in &self.fields {
            let stored = row.get(field.name()).and_then(|s| s.as_deref());
            columns.insert(field.name().to_string(), field.from_db(stored)?);
        }
        Ok(Record { id, columns })
    }

    /// A query over every row
    pub fn all(&self) -> Query<'_> {
        Query {
            table: self,
            filters: Vec::new(),
            id: None,
        }
    }

    /// A query filtered by a named lookup on `column`
    pub fn filter(
        &self,
        column: &str,
        kind: &str,
        operand: impl Into<Value>,
    ) -> HStoreResult<Query<'_>> {
        self.all().filter(column, kind, operand)
    }

    /// All keys of one row's column, in storage order
    pub fn keys(&self, id: RowId, column: &str) -> HStoreResult<Vec<String>> {
        let dict = self.read_column(id, column)?;
        Ok(storage_order(&dict))
    }

    /// The value at `key` in one row's column
    pub fn peek(&self, id: RowId, column: &str, key: &str) -> HStoreResult<Option<String>> {
        let dict = self.read_column(id, column)?;
        Ok(dict.get(key).map(str::to_string))
    }

    /// The sub-dictionary of `keys` in one row's column
    pub fn slice<S: AsRef<str>>(
        &self,
        id: RowId,
        column: &str,
        keys: &[S],
    ) -> HStoreResult<HStoreDict> {
        let dict = self.read_column(id, column)?;
        Ok(dict.slice(keys))
    }

    fn read_column(&self, id: RowId, column: &str) -> HStoreResult<HStoreDict> {
        let field = self.field(column)?;
        let state = self.state.read();
        let row = state.rows.get(&id).ok_or(HStoreError::RowNotFound(id))?;
        field.from_db(row.get(column).and_then(|s| s.as_deref()))
    }

    pub(crate) fn snapshot_state(&self) -> TableState {
        self.state.read().clone()
    }

    pub(crate) fn restore_state(&self, state: TableState) {
        *self.state.write() = state;
    }
}

/// A chain of filters over a table
#[derive(Debug, Clone)]
pub struct Query<'a> {
    table: &'a Table,
    filters: Vec<(String, Condition)>,
    id: Option<RowId>,
}

impl<'a> Query<'a> {
    /// Add a named lookup on `column`
    pub fn filter(self, column: &str, kind: &str, operand: impl Into<Value>) -> HStoreResult<Self> {
        let lookup = Lookup::parse(kind, operand.into())?;
        self.lookup(column, &lookup)
    }

    /// Add a validated lookup on `column`
    pub fn lookup(mut self, column: &str, lookup: &Lookup) -> HStoreResult<Self> {
        self.table.field(column)?;
        let condition = compile(lookup)?;
        self.filters.push((column.to_string(), condition));
        Ok(self)
    }

    /// Restrict the query to one row
    pub fn id(mut self, id: RowId) -> Self {
        self.id = Some(id);
        self
    }

    /// Identifiers of matching rows, in insertion order
    pub fn ids(&self) -> HStoreResult<Vec<RowId>> {
        let state = self.table.state.read();
        self.matching(&state)
    }

    pub fn count(&self) -> HStoreResult<usize> {
        Ok(self.ids()?.len())
    }

    pub fn exists(&self) -> HStoreResult<bool> {
        Ok(self.count()? > 0)
    }

    /// Load matching rows
    pub fn records(&self) -> HStoreResult<Vec<Record>> {
        let state = self.table.state.read();
        let mut records = Vec::new();
        for id in self.matching(&state)? {
            if let Some(row) = state.rows.get(&id) {
                records.push(self.table.load(id, row)?);
            }
        }
        Ok(records)
    }

    pub fn first(&self) -> HStoreResult<Option<Record>> {
        Ok(self.records()?.into_iter().next())
    }

    /// Replace `column` in every matching row; returns the number of rows
    pub fn update(&self, column: &str, value: impl Into<Value>) -> HStoreResult<usize> {
        let field = self.table.field(column)?;
        let stored = self.table.stored_text(field, value.into())?;

        let mut state = self.table.state.write();
        let ids = self.matching(&state)?;
        for id in &ids {
            if let Some(row) = state.rows.get_mut(id) {
                row.insert(column.to_string(), stored.clone());
            }
        }
        debug!("updated '{}' in {} row(s)", column, ids.len());
        Ok(ids.len())
    }

    /// Delete keys from `column` in every matching row
    pub fn remove_keys<S: AsRef<str>>(&self, column: &str, keys: &[S]) -> HStoreResult<usize> {
        let keys = keys.iter().map(|k| k.as_ref().to_string()).collect();
        self.apply(column, &RowOperation::Remove(keys))
    }

    /// Merge pairs into `column` in every matching row
    pub fn update_pairs(&self, column: &str, pairs: impl Into<Value>) -> HStoreResult<usize> {
        let pairs = HStoreDict::from_value(pairs.into())?;
        self.apply(column, &RowOperation::Update(pairs))
    }

    /// Apply a mutating row operation to every matching row.
    ///
    /// NULL columns stay NULL, as hstore functions return NULL for them.
    /// Reads go through [`Table::keys`], [`Table::peek`] and [`Table::slice`].
    pub fn apply(&self, column: &str, operation: &RowOperation) -> HStoreResult<usize> {
        let field = self.table.field(column)?;
        if !operation.is_mutation() {
            return Err(HStoreError::Lookup(format!("{:?} is not a mutation", operation)));
        }

        let mut state = self.table.state.write();
        let ids = self.matching(&state)?;
        let mut changed = 0;
        for id in &ids {
            let Some(row) = state.rows.get_mut(id) else {
                continue;
            };
            let Some(Some(text)) = row.get(column) else {
                continue;
            };
            let mut dict = field.from_db(Some(text.as_str()))?;
            operation.apply(&mut dict);
            row.insert(column.to_string(), field.to_db(Some(&dict))?);
            changed += 1;
        }
        debug!("applied {:?} to {} row(s)", operation, changed);
        Ok(changed)
    }

    fn matching(&self, state: &TableState) -> HStoreResult<Vec<RowId>> {
        let mut ids = Vec::new();
        for (id, row) in &state.rows {
            if self.id.is_some_and(|wanted| wanted != *id) {
                continue;
            }
            if self.matches_row(row)? {
                ids.push(*id);
            }
        }
        trace!("{} row(s) matched in '{}'", ids.len(), self.table.name);
        Ok(ids)
    }

    fn matches_row(&self, row: &StoredRow) -> HStoreResult<bool> {
        for (column, condition) in &self.filters {
            let stored = match row.get(column).and_then(|s| s.as_deref()) {
                Some(text) => Some(HStoreDict::from_json(text)?),
                None => None,
            };
            if !evaluate_condition(condition, stored.as_ref())? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Render the query as a SELECT statement
    pub fn to_sql(&self) -> SqlFragment {
        let mut params = ParamList::new();
        let columns: Vec<String> = std::iter::once("id")
            .chain(self.table.fields.iter().map(|f| f.name()))
            .map(quote_ident)
            .collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_ident(&self.table.name)
        );
        self.render_where(&mut sql, &mut params);
        SqlFragment {
            sql,
            params: params.into_params(),
        }
    }

    /// Render a row operation on `column` over the matching rows
    pub fn operation_sql(&self, column: &str, operation: &RowOperation) -> HStoreResult<SqlFragment> {
        self.table.field(column)?;
        let mut params = ParamList::new();
        let quoted = quote_ident(column);
        let table = quote_ident(&self.table.name);
        let expression = operation.expression(&quoted, &mut params);
        let mut sql = if operation.is_mutation() {
            format!("UPDATE {} SET {} = {}", table, quoted, expression)
        } else {
            format!("SELECT {} FROM {}", expression, table)
        };
        self.render_where(&mut sql, &mut params);
        Ok(SqlFragment {
            sql,
            params: params.into_params(),
        })
    }

    fn render_where(&self, sql: &mut String, params: &mut ParamList) {
        let mut clauses = Vec::new();
        if let Some(id) = self.id {
            clauses.push(format!("{} = {}", quote_ident("id"), params.push(id.to_string())));
        }
        for (column, condition) in &self.filters {
            clauses.push(condition.render(&quote_ident(column), params));
        }
        match clauses.len() {
            0 => {}
            1 => {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses[0]);
            }
            _ => {
                let joined: Vec<String> = clauses.iter().map(|c| format!("({})", c)).collect();
                sql.push_str(" WHERE ");
                sql.push_str(&joined.join(" AND "));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldOptions;

    fn bags() -> Table {
        Table::new("databag").with_field(DictionaryField::new("data"))
    }

    fn pairs(entries: &[(&str, &str)]) -> Value {
        Value::map(entries.iter().copied())
    }

    #[test]
    fn test_insert_and_get() -> HStoreResult<()> {
        let table = bags();
        let id = table.insert([("data", pairs(&[("v", "1"), ("v2", "3")]))])?;
        assert_eq!(id, RowId(1));
        assert_eq!(table.len(), 1);

        let record = table.get(id)?;
        assert_eq!(record.get("data")?.get("v"), Some("1"));
        assert!(matches!(record.get("other"), Err(HStoreError::UnknownColumn(_))));
        assert!(matches!(table.get(RowId(9)), Err(HStoreError::RowNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_insert_rejects_unknown_columns() {
        let table = bags();
        let err = table.insert([("nope", pairs(&[]))]).unwrap_err();
        assert!(matches!(err, HStoreError::UnknownColumn(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_defaults_and_integrity() -> HStoreResult<()> {
        let table = Table::new("defaults")
            .with_field(DictionaryField::with_options(
                "b",
                FieldOptions::new().null(true).default_null(),
            ))
            .with_field(DictionaryField::with_options(
                "c",
                FieldOptions::new().default_value(HStoreDict::from_pairs([("x", "1")])?),
            ));
        let id = table.insert(Vec::<(String, Value)>::new())?;
        let record = table.get(id)?;
        assert!(record.get("b")?.is_empty());
        assert_eq!(record.get("c")?.get("x"), Some("1"));

        let bad = Table::new("bad").with_field(DictionaryField::with_options(
            "a",
            FieldOptions::new().default_null(),
        ));
        let err = bad.insert(Vec::<(String, Value)>::new()).unwrap_err();
        assert!(matches!(err, HStoreError::Integrity(_)));
        assert!(bad.is_empty());
        Ok(())
    }

    #[test]
    fn test_chained_filters() -> HStoreResult<()> {
        let table = bags();
        let alpha = table.insert([("data", pairs(&[("v", "1"), ("v2", "3")]))])?;
        table.insert([("data", pairs(&[("v", "2"), ("v2", "4")]))])?;

        let query = table
            .filter("data", "contains", Value::list(["v"]))?
            .filter("data", "lt", Value::map([("v", 2)]))?;
        assert_eq!(query.ids()?, vec![alpha]);
        assert_eq!(table.all().count()?, 2);
        assert!(table.filter("data", "gt", Value::map([("v", 5)]))?.first()?.is_none());
        assert!(matches!(
            table.filter("missing", "exact", pairs(&[])),
            Err(HStoreError::UnknownColumn(_))
        ));
        Ok(())
    }

    #[test]
    fn test_update_replaces_column() -> HStoreResult<()> {
        let table = bags();
        let id = table.insert([("data", pairs(&[("v", "1")]))])?;
        let updated = table
            .all()
            .id(id)
            .update("data", pairs(&[("change", "new value"), ("added", "new")]))?;
        assert_eq!(updated, 1);
        assert_eq!(
            table.get(id)?.get("data")?,
            &HStoreDict::from_pairs([("change", "new value"), ("added", "new")])?
        );

        assert_eq!(table.all().update("data", Value::Null)?, 1);
        assert!(table.get(id)?.get("data")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_row_operations() -> HStoreResult<()> {
        let table = bags();
        let alpha = table.insert([("data", pairs(&[("v", "1"), ("v2", "3")]))])?;

        assert_eq!(table.keys(alpha, "data")?, vec!["v", "v2"]);
        assert_eq!(table.peek(alpha, "data", "v")?, Some("1".to_string()));
        assert_eq!(table.peek(alpha, "data", "invalid")?, None);
        assert_eq!(
            table.slice(alpha, "data", &["v"])?,
            HStoreDict::from_pairs([("v", "1")])?
        );
        assert!(table.slice(alpha, "data", &["ggg"])?.is_empty());

        let query = table.all().id(alpha);
        query.update_pairs("data", pairs(&[("v2", "10"), ("v3", "20")]))?;
        assert_eq!(
            table.get(alpha)?.get("data")?,
            &HStoreDict::from_pairs([("v", "1"), ("v2", "10"), ("v3", "20")])?
        );

        query.remove_keys("data", &["v", "v2", "v3"])?;
        assert!(table.get(alpha)?.get("data")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_apply_rejects_reads() -> HStoreResult<()> {
        let table = bags();
        let alpha = table.insert([("data", pairs(&[("v", "1")]))])?;
        let query = table.all();

        for operation in [
            RowOperation::Keys,
            RowOperation::Peek("v".to_string()),
            RowOperation::Slice(vec!["v".to_string()]),
        ] {
            let err = query.apply("data", &operation).unwrap_err();
            assert!(matches!(err, HStoreError::Lookup(_)), "{}", err);
        }
        assert_eq!(table.peek(alpha, "data", "v")?, Some("1".to_string()));
        Ok(())
    }

    #[test]
    fn test_nullable_column_never_stores_null() -> HStoreResult<()> {
        let table = Table::new("nullable").with_field(DictionaryField::with_options(
            "data",
            FieldOptions::new().null(true),
        ));
        let created = table.insert(Vec::<(String, Value)>::new())?;
        let assigned = table.insert([("data", Value::Null)])?;

        assert!(table.filter("data", "exact", Value::Null)?.ids()?.is_empty());
        assert!(table.filter("data", "isnull", true)?.ids()?.is_empty());
        assert_eq!(
            table.filter("data", "isnull", false)?.ids()?,
            vec![created, assigned]
        );

        assert_eq!(table.all().update_pairs("data", pairs(&[("a", "b")]))?, 2);
        assert_eq!(table.peek(assigned, "data", "a")?, Some("b".to_string()));
        Ok(())
    }

    #[test]
    fn test_query_sql() -> HStoreResult<()> {
        let table = bags();
        let query = table
            .filter("data", "contains", pairs(&[("v", "1")]))?
            .filter("data", "gt", Value::map([("v2", 2)]))?;
        let fragment = query.to_sql();
        assert_eq!(
            fragment.sql,
            "SELECT \"id\", \"data\" FROM \"databag\" WHERE (\"data\" @> $1::hstore) AND ((\"data\" -> $2)::bigint > $3::bigint)"
        );
        assert_eq!(fragment.params, vec![r#""v"=>"1""#, "v2", "2"]);

        assert_eq!(table.all().to_sql().sql, "SELECT \"id\", \"data\" FROM \"databag\"");
        Ok(())
    }

    #[test]
    fn test_operation_sql() -> HStoreResult<()> {
        let table = bags();
        let query = table.all().id(RowId(3));

        let fragment = query.operation_sql("data", &RowOperation::Keys)?;
        assert_eq!(
            fragment.sql,
            "SELECT akeys(\"data\") FROM \"databag\" WHERE \"id\" = $1"
        );
        assert_eq!(fragment.params, vec!["3"]);

        let fragment =
            query.operation_sql("data", &RowOperation::Remove(vec!["v2".to_string()]))?;
        assert_eq!(
            fragment.sql,
            "UPDATE \"databag\" SET \"data\" = delete(\"data\", ARRAY[$1]::text[]) WHERE \"id\" = $2"
        );
        assert_eq!(fragment.params, vec!["v2", "3"]);
        Ok(())
    }
}
