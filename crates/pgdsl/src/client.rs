//! Database client interface consumed by terminal operations.
//!
//! Statements are rendered to complete SQL text (literals inlined), so a client only needs to
//! run text and hand back rows plus column metadata. Errors go through [`DriverError`], which
//! keeps the backend SQLSTATE so unique violations can be told apart.

use std::future::Future;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::{Column, Row};
use tokio_postgres::types::{FromSql, Type};

use crate::error::DriverError;
use crate::value::Value;

/// Column metadata reported alongside rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Rows returned by a query, as positional value arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A database client that can run SQL text.
///
/// Implemented for `tokio_postgres::Client` and, with the `pool` feature, for
/// `deadpool_postgres::Pool` and pooled clients.
pub trait GenericClient: Send + Sync {
    /// Run a query and return all rows.
    fn query(&self, sql: &str) -> impl Future<Output = Result<QueryOutput, DriverError>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str) -> impl Future<Output = Result<u64, DriverError>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str) -> Result<QueryOutput, DriverError> {
        // `query(&str, ..)` prepares internally anyway; keeping the statement gives column
        // metadata even when no rows come back.
        let statement = self.prepare(sql).await?;
        let rows = tokio_postgres::Client::query(self, &statement, &[]).await?;
        decode_rows(statement.columns(), &rows)
    }

    async fn execute(&self, sql: &str) -> Result<u64, DriverError> {
        Ok(tokio_postgres::Client::execute(self, sql, &[]).await?)
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str) -> Result<QueryOutput, DriverError> {
        let client: &tokio_postgres::Client = self;
        GenericClient::query(client, sql).await
    }

    async fn execute(&self, sql: &str) -> Result<u64, DriverError> {
        let client: &tokio_postgres::Client = self;
        GenericClient::execute(client, sql).await
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Pool {
    async fn query(&self, sql: &str) -> Result<QueryOutput, DriverError> {
        let client = self.get().await.map_err(pool_error)?;
        GenericClient::query(&client, sql).await
    }

    async fn execute(&self, sql: &str) -> Result<u64, DriverError> {
        let client = self.get().await.map_err(pool_error)?;
        GenericClient::execute(&client, sql).await
    }
}

#[cfg(feature = "pool")]
fn pool_error(err: deadpool_postgres::PoolError) -> DriverError {
    let message = format!("pool checkout failed: {err}");
    DriverError {
        code: None,
        constraint: None,
        message,
        source: Some(Box::new(err)),
    }
}

/// A client for SQL-only contexts. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl GenericClient for Detached {
    async fn query(&self, _sql: &str) -> Result<QueryOutput, DriverError> {
        Err(DriverError::new("no database client attached"))
    }

    async fn execute(&self, _sql: &str) -> Result<u64, DriverError> {
        Err(DriverError::new("no database client attached"))
    }
}

fn decode_rows(columns: &[Column], rows: &[Row]) -> Result<QueryOutput, DriverError> {
    let columns = columns
        .iter()
        .map(|c| ColumnMeta::new(c.name(), c.type_().name()))
        .collect();
    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|idx| decode_column(row, idx)).collect())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QueryOutput { columns, rows })
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>, DriverError> {
    Ok(row.try_get::<_, Option<T>>(idx)?)
}

fn decode_column(row: &Row, idx: usize) -> Result<Value, DriverError> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let value = if *ty == Type::BOOL {
        get::<bool>(row, idx)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        get::<i16>(row, idx)?.map(Value::from)
    } else if *ty == Type::INT4 {
        get::<i32>(row, idx)?.map(Value::from)
    } else if *ty == Type::INT8 {
        get::<i64>(row, idx)?.map(Value::Int)
    } else if *ty == Type::OID {
        get::<u32>(row, idx)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        get::<f32>(row, idx)?.map(Value::from)
    } else if *ty == Type::FLOAT8 {
        get::<f64>(row, idx)?.map(Value::Float)
    } else if <&str as FromSql>::accepts(ty) {
        get::<String>(row, idx)?.map(Value::Text)
    } else if *ty == Type::DATE {
        get::<NaiveDate>(row, idx)?.map(Value::Date)
    } else if *ty == Type::TIMESTAMP {
        get::<NaiveDateTime>(row, idx)?.map(Value::Timestamp)
    } else if *ty == Type::TIMESTAMPTZ {
        get::<DateTime<Utc>>(row, idx)?.map(Value::TimestampTz)
    } else if *ty == Type::UUID {
        get::<uuid::Uuid>(row, idx)?.map(Value::Uuid)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        get::<serde_json::Value>(row, idx)?.map(Value::Json)
    } else {
        decode_other(row, idx, ty)?
    };
    Ok(value.unwrap_or(Value::Null))
}

#[cfg(feature = "rust_decimal")]
fn decode_other(row: &Row, idx: usize, ty: &Type) -> Result<Option<Value>, DriverError> {
    if *ty == Type::NUMERIC {
        return Ok(get::<rust_decimal::Decimal>(row, idx)?.map(|d| Value::Text(d.to_string())));
    }
    Err(unsupported_column(row, idx, ty))
}

#[cfg(not(feature = "rust_decimal"))]
fn decode_other(row: &Row, idx: usize, ty: &Type) -> Result<Option<Value>, DriverError> {
    Err(unsupported_column(row, idx, ty))
}

fn unsupported_column(row: &Row, idx: usize, ty: &Type) -> DriverError {
    DriverError::new(format!(
        "cannot decode column '{}' of type {}; cast it to a supported type (e.g. ::text)",
        row.columns()[idx].name(),
        ty.name()
    ))
}
