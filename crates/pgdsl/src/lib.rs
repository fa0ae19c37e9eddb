//! # pgdsl
//!
//! A typed SQL construction layer for Postgres.
//!
//! ## Features
//!
//! - **Expression algebra**: fields, operators, aggregates and conditions build an immutable
//!   tree that always renders correctly parenthesized and quoted SQL
//! - **Step-typed builders**: each statement is a state machine; a join without a predicate
//!   must be followed by `on` before anything else compiles
//! - **Branchable chains**: every step consumes itself and returns a fresh context, so a
//!   cloned step can be extended independently
//! - **Converters**: fields can map application values to and from their stored form
//! - **Upserts**: `ON CONFLICT` targets, `DO NOTHING`, `DO UPDATE SET` with `excluded`
//!
//! ## Example
//!
//! ```ignore
//! use pgdsl::prelude::*;
//!
//! let location = TableDef::build(Table::new("location"), |t| {
//!     vec![
//!         ("id", t.field("id")),
//!         ("name", t.field("name")),
//!         ("postalCode", t.field("postalCode")),
//!     ]
//! })?;
//!
//! let dsl = Dsl::connect(&DslConfig::from_env()?)?;
//!
//! let rows = dsl
//!     .select(location.fields().pick(&["id", "name"])?)
//!     .from(&location)
//!     .where_values(FieldValues::new().set("postalCode", "65551"))
//!     .order_by(&location["id"])
//!     .fetch()
//!     .await?;
//!
//! let sql = dsl
//!     .select(location["id"].count().alias("n"))
//!     .from(&location)
//!     .group_by(&location["postalCode"])
//!     .to_sql()?;
//! ```

pub mod client;
pub mod condition;
pub mod config;
pub mod convert;
pub mod dsl;
pub mod error;
pub mod field;
pub mod ident;
pub mod prelude;
pub mod qb;
pub mod row;
pub mod table;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(test)]
mod test_support;

pub use client::{ColumnMeta, Detached, GenericClient, QueryOutput};
pub use condition::{Condition, IntoConditions, conditions_from_values};
pub use config::DslConfig;
pub use convert::{Converter, FnConverter, JsonConverter, UnionConverter};
pub use dsl::{
    Dsl, and, and_values, count, excluded, excluded_column, field, field_with, not, now, or,
    or_values, random, raw, raw_condition, tuple,
};
pub use error::{DriverError, OrmError, OrmResult};
pub use field::{Aggregate, Direction, Field, Operand, OrderField};
pub use ident::SqlOptions;
pub use qb::{AllColumns, ConflictTarget, Executable, Fetchable, JoinKind, Projection, SqlSource};
pub use row::{KeyedItem, Record, ToJson};
pub use table::{FieldMap, FieldValues, Table, TableDef, TableSource, ValuesTable};
pub use value::Value;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config, create_pool_with_tls};
