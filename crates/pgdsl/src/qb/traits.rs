//! Terminal contracts shared by statement builders.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use serde::de::DeserializeOwned;

use crate::error::{OrmError, OrmResult};
use crate::ident::SqlOptions;
use crate::row::{KeyedItem, ToJson};
use crate::value::Value;

/// Anything that renders to SQL usable inside another statement: a subquery, an
/// `INSERT ... SELECT` source, a derived table, or a membership list.
pub trait SqlSource: Send + Sync {
    /// Render as a complete statement.
    fn render_sql(&self, opts: &SqlOptions) -> OrmResult<String>;

    /// Render as the right-hand side of `IN (...)`.
    fn membership_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        self.render_sql(opts)
    }

    /// Whether this is a literal list with no entries.
    fn is_empty_list(&self) -> bool {
        false
    }

    /// Column names to declare when used as a derived table.
    fn derived_columns(&self) -> Option<Vec<String>> {
        None
    }
}

impl fmt::Debug for dyn SqlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SqlSource")
    }
}

/// A statement (or literal data) that produces rows.
pub trait Fetchable: Send + Sync {
    /// Mapped row type.
    type Item: Send + 'static;

    /// Render the statement.
    fn to_sql(&self) -> OrmResult<String>;

    /// Fetch all rows.
    fn fetch(&self) -> impl Future<Output = OrmResult<Vec<Self::Item>>> + Send;

    /// Fetch the first row, if any.
    ///
    /// Select statements run with `LIMIT 1` on an internal copy; the caller's builder is
    /// untouched.
    fn fetch_one(&self) -> impl Future<Output = OrmResult<Option<Self::Item>>> + Send;

    /// Fetch the first row, failing with [`OrmError::EmptyResult`] when there is none.
    fn fetch_one_or_throw(&self) -> impl Future<Output = OrmResult<Self::Item>> + Send {
        async move {
            self.fetch_one()
                .await?
                .ok_or_else(OrmError::empty_result)
        }
    }

    /// Fetch all rows keyed by the value of `key`. Later rows win on duplicate keys; rows
    /// without the key are stored under `Value::Null`.
    fn fetch_map(
        &self,
        key: &str,
    ) -> impl Future<Output = OrmResult<HashMap<Value, Self::Item>>> + Send
    where
        Self::Item: KeyedItem,
    {
        async move {
            let mut map = HashMap::new();
            for item in self.fetch().await? {
                let k = item.key_value(key).unwrap_or(Value::Null);
                map.insert(k, item);
            }
            Ok(map)
        }
    }

    /// Fetch all rows and deserialize each into `T`.
    fn fetch_as<T>(&self) -> impl Future<Output = OrmResult<Vec<T>>> + Send
    where
        T: DeserializeOwned + Send,
        Self::Item: ToJson,
    {
        async move {
            self.fetch()
                .await?
                .iter()
                .map(|item| {
                    serde_json::from_value(item.to_json())
                        .map_err(|e| OrmError::conversion(format!("cannot deserialize row: {e}")))
                })
                .collect()
        }
    }
}

/// A statement that reports an affected-row count.
pub trait Executable: Send + Sync {
    /// Render the statement.
    fn to_sql(&self) -> OrmResult<String>;

    /// Run the statement and return the number of affected rows.
    fn execute(&self) -> impl Future<Output = OrmResult<u64>> + Send;
}
