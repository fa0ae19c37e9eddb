//! Convenient imports for typical `pgdsl` usage.
//!
//! ```ignore
//! use pgdsl::prelude::*;
//! ```

pub use crate::{
    AllColumns, Condition, Direction, Dsl, DslConfig, Executable, Fetchable, Field, FieldMap,
    FieldValues, GenericClient, OrmError, OrmResult, Record, SqlOptions, Table, TableDef, Value,
    ValuesTable,
};

pub use crate::dsl::{and, count, excluded, excluded_column, field, not, now, or, raw};
