//! Table references and schema descriptors.

use std::ops::Index;
use std::sync::Arc;

use serde::Serialize;

use crate::convert::Converter;
use crate::error::{OrmError, OrmResult};
use crate::field::{Field, Operand, value_sql};
use crate::ident::SqlOptions;
use crate::qb::{Fetchable, SqlSource};
use crate::row::Record;
use crate::value::Value;

#[derive(Debug)]
enum TableNode {
    Named { name: String, alias: Option<String> },
    Raw { sql: String, alias: Option<String> },
    Derived { alias: String, source: Arc<dyn SqlSource> },
}

/// A table reference: a named table, a raw name, or a derived table.
#[derive(Debug, Clone)]
pub struct Table(Arc<TableNode>);

impl Table {
    /// A named table. Dotted names are treated as schema-qualified.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(TableNode::Named {
            name: name.into(),
            alias: None,
        }))
    }

    /// A raw, unescaped table expression.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self(Arc::new(TableNode::Raw {
            sql: sql.into(),
            alias: None,
        }))
    }

    /// A derived table backed by another statement or an inline values list.
    pub fn derived(alias: impl Into<String>, source: Arc<dyn SqlSource>) -> Self {
        Self(Arc::new(TableNode::Derived {
            alias: alias.into(),
            source,
        }))
    }

    /// Alias the table. Columns created from the result are qualified by the alias.
    pub fn alias(&self, alias: impl Into<String>) -> Self {
        match &*self.0 {
            TableNode::Named { name, .. } => Self(Arc::new(TableNode::Named {
                name: name.clone(),
                alias: Some(alias.into()),
            })),
            TableNode::Raw { sql, .. } => Self(Arc::new(TableNode::Raw {
                sql: sql.clone(),
                alias: Some(alias.into()),
            })),
            TableNode::Derived { source, .. } => Self::derived(alias, Arc::clone(source)),
        }
    }

    /// A column of this table.
    pub fn field(&self, column: impl Into<String>) -> Field {
        Field::column(self, column)
    }

    /// A column of this table with a converter.
    pub fn field_with(&self, column: impl Into<String>, converter: Arc<dyn Converter>) -> Field {
        Field::column(self, column).with_converter(converter)
    }

    /// Render in FROM/JOIN/target position.
    pub fn to_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        match &*self.0 {
            TableNode::Named { name, alias } => Ok(match alias {
                Some(alias) => format!("{} as {}", opts.qualified(name), opts.ident(alias)),
                None => opts.qualified(name),
            }),
            TableNode::Raw { sql, alias } => Ok(match alias {
                Some(alias) => format!("{sql} as {}", opts.ident(alias)),
                None => sql.clone(),
            }),
            TableNode::Derived { alias, source } => {
                let mut sql = format!("({}) as {}", source.render_sql(opts)?, opts.ident(alias));
                if let Some(columns) = source.derived_columns() {
                    let columns: Vec<String> = columns.iter().map(|c| opts.ident(c)).collect();
                    sql.push_str(&format!(" ({})", columns.join(", ")));
                }
                Ok(sql)
            }
        }
    }

    /// The name columns are qualified with: the alias if any, else the table name.
    pub fn reference(&self, opts: &SqlOptions) -> String {
        match &*self.0 {
            TableNode::Named {
                alias: Some(alias), ..
            } => opts.ident(alias),
            TableNode::Named { name, alias: None } => opts.qualified(name),
            TableNode::Raw {
                alias: Some(alias), ..
            } => opts.ident(alias),
            TableNode::Raw { sql, alias: None } => sql.clone(),
            TableNode::Derived { alias, .. } => opts.ident(alias),
        }
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        Table::new(name)
    }
}

impl From<&Table> for Table {
    fn from(table: &Table) -> Self {
        table.clone()
    }
}

impl From<&TableDef> for Table {
    fn from(def: &TableDef) -> Self {
        def.table.clone()
    }
}

impl From<TableDef> for Table {
    fn from(def: TableDef) -> Self {
        def.table
    }
}

/// A statement's primary table: a plain reference, or a declared table whose fields then
/// resolve key/value conditions.
pub trait TableSource {
    fn into_parts(self) -> (Table, Option<FieldMap>);
}

impl TableSource for Table {
    fn into_parts(self) -> (Table, Option<FieldMap>) {
        (self, None)
    }
}

impl TableSource for &Table {
    fn into_parts(self) -> (Table, Option<FieldMap>) {
        (self.clone(), None)
    }
}

impl TableSource for &str {
    fn into_parts(self) -> (Table, Option<FieldMap>) {
        (Table::new(self), None)
    }
}

impl TableSource for TableDef {
    fn into_parts(self) -> (Table, Option<FieldMap>) {
        (self.table, Some(self.fields))
    }
}

impl TableSource for &TableDef {
    fn into_parts(self) -> (Table, Option<FieldMap>) {
        (self.table.clone(), Some(self.fields.clone()))
    }
}

/// An ordered name → field list.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: Vec<(String, Field)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field.
    pub fn with(mut self, name: impl Into<String>, field: Field) -> Self {
        self.insert(name, field);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = field,
            None => self.entries.push((name, field)),
        }
    }

    /// Build from pairs, rejecting duplicate names.
    pub fn try_from_pairs<K: Into<String>>(
        pairs: impl IntoIterator<Item = (K, Field)>,
    ) -> OrmResult<Self> {
        let mut map = Self::new();
        for (name, field) in pairs {
            let name = name.into();
            if map.contains(&name) {
                return Err(OrmError::validation(format!("duplicate field '{name}'")));
            }
            map.entries.push((name, field));
        }
        Ok(map)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// A sub-map with only the named fields, in the given order.
    pub fn pick(&self, names: &[&str]) -> OrmResult<FieldMap> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .cloned()
                    .map(|f| (name.to_string(), f))
                    .ok_or_else(|| OrmError::validation(format!("unknown field '{name}'")))
            })
            .collect::<OrmResult<Vec<_>>>()
            .map(|entries| FieldMap { entries })
    }
}

impl Index<&str> for FieldMap {
    type Output = Field;

    fn index(&self, name: &str) -> &Field {
        match self.get(name) {
            Some(field) => field,
            None => panic!("no field named '{name}'"),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Field)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, Field)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (name, field) in iter {
            map.insert(name, field);
        }
        map
    }
}

/// A declared table: its reference plus the ordered field descriptor.
///
/// ```ignore
/// let location = TableDef::build(Table::new("location"), |t| {
///     vec![
///         ("id", t.field("id")),
///         ("name", t.field("name")),
///         ("postalCode", t.field("postalCode")),
///     ]
/// })?;
/// ```
#[derive(Debug, Clone)]
pub struct TableDef {
    table: Table,
    fields: FieldMap,
}

impl TableDef {
    /// Declare a table. Duplicate field names are rejected.
    pub fn new<K: Into<String>>(
        table: Table,
        fields: impl IntoIterator<Item = (K, Field)>,
    ) -> OrmResult<Self> {
        Ok(Self {
            table,
            fields: FieldMap::try_from_pairs(fields)?,
        })
    }

    /// Declare a table whose fields are built from the table reference.
    pub fn build<K, F>(table: Table, fields: F) -> OrmResult<Self>
    where
        K: Into<String>,
        F: FnOnce(&Table) -> Vec<(K, Field)>,
    {
        let pairs = fields(&table);
        Self::new(table, pairs)
    }

    pub(crate) fn from_parts(table: Table, fields: FieldMap) -> Self {
        Self { table, fields }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

impl Index<&str> for TableDef {
    type Output = Field;

    fn index(&self, name: &str) -> &Field {
        &self.fields[name]
    }
}

/// An explicit key → value record, used for key/value conditions, insert rows and
/// update/upsert assignments.
#[derive(Debug, Clone, Default)]
pub struct FieldValues {
    entries: Vec<(String, Operand)>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing an earlier one with the same key.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Operand>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Build from a serializable struct or map. Nested arrays and objects become JSON values.
    pub fn from_serialize<T: Serialize>(value: &T) -> OrmResult<Self> {
        match serde_json::to_value(value) {
            Ok(serde_json::Value::Object(map)) => Ok(map
                .into_iter()
                .fold(Self::new(), |acc, (k, v)| acc.set(k, Value::from_json(v)))),
            Ok(_) => Err(OrmError::validation("expected a struct or map")),
            Err(e) => Err(OrmError::validation(format!("cannot serialize values: {e}"))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Operand> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Operand)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Record> for FieldValues {
    fn from(record: Record) -> Self {
        record
            .into_iter()
            .fold(FieldValues::new(), |acc, (k, v)| acc.set(k, v))
    }
}

/// Inline literal rows usable as a membership list, a derived table, or a local fetchable.
#[derive(Debug, Clone)]
pub struct ValuesTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    converters: Vec<Option<Arc<dyn Converter>>>,
}

impl ValuesTable {
    /// Rows with named columns.
    pub fn new<C: Into<String>>(
        columns: impl IntoIterator<Item = C>,
        rows: Vec<Vec<Value>>,
    ) -> OrmResult<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(OrmError::validation(format!(
                "values row has {} entries, expected {}",
                row.len(),
                columns.len()
            )));
        }
        let converters = vec![None; columns.len()];
        Ok(Self {
            columns,
            rows,
            converters,
        })
    }

    /// A single `value` column, written through `converter`.
    pub fn list<V: Into<Value>>(
        values: impl IntoIterator<Item = V>,
        converter: Option<Arc<dyn Converter>>,
    ) -> Self {
        Self {
            columns: vec!["value".to_string()],
            rows: values.into_iter().map(|v| vec![v.into()]).collect(),
            converters: vec![converter],
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn row_sql(&self, row: &[Value]) -> OrmResult<Vec<String>> {
        row.iter()
            .zip(&self.converters)
            .map(|(value, conv)| value_sql(value, conv.as_ref()))
            .collect()
    }

    /// Expose as a derived table named `alias`.
    pub fn as_table(&self, alias: &str) -> TableDef {
        let table = Table::derived(alias, Arc::new(self.clone()));
        let fields = self
            .columns
            .iter()
            .map(|c| (c.clone(), table.field(c.clone())))
            .collect();
        TableDef::from_parts(table, fields)
    }
}

impl SqlSource for ValuesTable {
    fn render_sql(&self, _opts: &SqlOptions) -> OrmResult<String> {
        if self.rows.is_empty() {
            return Err(OrmError::validation("VALUES list requires at least one row"));
        }
        let rows = self
            .rows
            .iter()
            .map(|row| Ok(format!("({})", self.row_sql(row)?.join(", "))))
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(format!("VALUES {}", rows.join(", ")))
    }

    fn membership_sql(&self, _opts: &SqlOptions) -> OrmResult<String> {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut parts = self.row_sql(row)?;
                Ok(if parts.len() == 1 {
                    parts.remove(0)
                } else {
                    format!("({})", parts.join(", "))
                })
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(rows.join(", "))
    }

    fn is_empty_list(&self) -> bool {
        self.rows.is_empty()
    }

    fn derived_columns(&self) -> Option<Vec<String>> {
        Some(self.columns.clone())
    }
}

impl Fetchable for ValuesTable {
    type Item = Record;

    fn to_sql(&self) -> OrmResult<String> {
        self.render_sql(&SqlOptions::quoted())
    }

    async fn fetch(&self) -> OrmResult<Vec<Record>> {
        Ok(self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .filter(|(_, v)| !v.is_null())
                    .map(|(c, v)| (c.clone(), v.clone()))
                    .collect()
            })
            .collect())
    }

    async fn fetch_one(&self) -> OrmResult<Option<Record>> {
        Ok(self.fetch().await?.into_iter().next())
    }
}
