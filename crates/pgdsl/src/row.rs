//! Result mapping.
//!
//! Raw rows come back from the client as positional [`Value`] arrays. The mapper pairs them
//! with the projection that produced them:
//! - a field map produces [`Record`]s keyed by the map's names,
//! - a single field produces scalars,
//! - an empty projection (`*`) passes the driver rows through, keyed by column name.
//!
//! Converters run only on non-null values; a null becomes an absent key (or `Value::Null` for
//! scalars).

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::client::QueryOutput;
use crate::error::{OrmError, OrmResult};
use crate::field::Field;
use crate::table::FieldMap;
use crate::value::Value;

/// An ordered name → value record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing an existing one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Deserialize into a user type.
    ///
    /// Absent keys deserialize as missing fields, so `Option<T>` members read them as `None`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> OrmResult<T> {
        serde_json::from_value(self.to_json())
            .map_err(|e| OrmError::conversion(format!("cannot deserialize record: {e}")))
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Items that can be exported to JSON, used by `fetch_as`.
pub trait ToJson {
    fn to_json(&self) -> JsonValue;
}

impl ToJson for Record {
    fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .iter()
                .map(|(n, v)| (n.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl ToJson for Value {
    fn to_json(&self) -> JsonValue {
        Value::to_json(self)
    }
}

/// Items that expose a named key, used by `fetch_map`.
pub trait KeyedItem {
    fn key_value(&self, key: &str) -> Option<Value>;
}

impl KeyedItem for Record {
    fn key_value(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

fn check_width(output: &QueryOutput, expected: usize) -> OrmResult<()> {
    match output.rows.iter().find(|row| row.len() != expected) {
        Some(row) => Err(OrmError::decode(
            "*",
            format!("row has {} columns, projection expects {}", row.len(), expected),
        )),
        None => Ok(()),
    }
}

/// Map rows produced by a field-map projection.
pub fn map_records(fields: &FieldMap, output: QueryOutput) -> OrmResult<Vec<Record>> {
    if fields.is_empty() {
        return Ok(raw_records(output));
    }
    check_width(&output, fields.len())?;
    output
        .rows
        .into_iter()
        .map(|row| {
            let mut record = Record::new();
            for ((name, field), raw) in fields.iter().zip(row) {
                if raw.is_null() {
                    continue;
                }
                let value = match field.converter() {
                    Some(conv) => conv.from_db(&raw)?,
                    None => raw,
                };
                record.insert(name, value);
            }
            Ok(record)
        })
        .collect()
}

/// Map rows produced by a single-field projection.
pub fn map_scalars(field: &Field, output: QueryOutput) -> OrmResult<Vec<Value>> {
    check_width(&output, 1)?;
    output
        .rows
        .into_iter()
        .map(|row| {
            let raw = row.into_iter().next().unwrap_or(Value::Null);
            match field.converter() {
                Some(conv) if !raw.is_null() => conv.from_db(&raw),
                _ => Ok(raw),
            }
        })
        .collect()
}

/// Pass driver rows through, keyed by the column names the driver reported.
pub fn raw_records(output: QueryOutput) -> Vec<Record> {
    let QueryOutput { columns, rows } = output;
    rows.into_iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| c.name.clone())
                .zip(row)
                .collect()
        })
        .collect()
}
