//! Statement builders.
//!
//! Each statement kind is an explicit state machine: every step is its own type holding the
//! accumulated context, and exposes only the methods valid in that state. Every method consumes
//! the step and returns the next one, so a step can be cloned to branch a statement; branches
//! never share mutable state.
//!
//! # Usage
//!
//! ```ignore
//! use pgdsl::prelude::*;
//!
//! let rows = dsl
//!     .select(FieldMap::new().with("id", location["id"].clone()))
//!     .from(&location)
//!     .where_values(FieldValues::new().set("postalCode", "65551"))
//!     .order_by(&location["id"])
//!     .fetch()
//!     .await?;
//!
//! dsl.insert_into(&alone, [row])
//!     .on_conflict("id")
//!     .do_update()
//!     .set_excluded()
//!     .execute()
//!     .await?;
//! ```

#[macro_use]
mod macros;

mod delete;
mod insert;
mod join;
mod projection;
mod render;
mod returning;
mod select;
mod traits;
mod update;

pub use delete::{DeleteContext, DeleteStep, DeleteWhereStep};
pub use insert::{
    ConflictTarget, InsertConflictStep, InsertContext, InsertStep, OnConflictStep,
    OnConflictUpdateStep,
};
pub use join::JoinKind;
pub use projection::{AllColumns, Projection};
pub use returning::{ReturningStep, Statement};
pub use select::{
    IntoFields, IntoOrderFields, SelectFromStep, SelectGroupByStep, SelectJoinStep,
    SelectLimitStep, SelectOrderStep, SelectStep, SelectWhereStep,
};
pub use traits::{Executable, Fetchable, SqlSource};
pub use update::{UpdateContext, UpdateFromStep, UpdateJoinStep, UpdateStep, UpdateWhereStep};

pub(crate) use delete::new_delete;
pub(crate) use join::{JoinClause, JoinTarget};
pub(crate) use insert::{new_insert, new_insert_query};
pub(crate) use select::new_select;
pub(crate) use update::new_update;

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use crate::client::{GenericClient, QueryOutput};
use crate::condition::{Condition, conditions_from_values};
use crate::error::{OrmError, OrmResult};
use crate::ident::SqlOptions;
use crate::table::{FieldMap, FieldValues};

/// Default number of SQL characters kept in log events.
pub const DEFAULT_SQL_LOG_LIMIT: usize = 200;

/// Shared execution handle threaded through every statement context.
///
/// The client is held behind an `Arc` and never cloned itself; concurrent executions rely on
/// the client's own concurrency control.
pub(crate) struct Runtime<C> {
    pub(crate) client: Arc<C>,
    pub(crate) options: SqlOptions,
    pub(crate) sql_log_limit: Option<usize>,
}

impl<C> Clone for Runtime<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            options: self.options,
            sql_log_limit: self.sql_log_limit,
        }
    }
}

impl<C> Runtime<C> {
    pub(crate) fn new(client: Arc<C>, options: SqlOptions) -> Self {
        Self {
            client,
            options,
            sql_log_limit: Some(DEFAULT_SQL_LOG_LIMIT),
        }
    }

    fn display_sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.sql_log_limit {
            Some(max) => truncate_sql(sql, max),
            None => Cow::Borrowed(sql),
        }
    }
}

impl<C: GenericClient> Runtime<C> {
    /// Run a query, logging it and enriching driver errors with the SQL text.
    pub(crate) async fn query(&self, sql: &str) -> OrmResult<QueryOutput> {
        let start = Instant::now();
        match self.client.query(sql).await {
            Ok(output) => {
                tracing::debug!(
                    target: "pgdsl.sql",
                    sql = %self.display_sql(sql),
                    rows = output.rows.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "query"
                );
                Ok(output)
            }
            Err(err) => {
                tracing::warn!(
                    target: "pgdsl.sql",
                    sql = %self.display_sql(sql),
                    code = err.code.as_deref().unwrap_or("-"),
                    error = %err,
                    "query failed"
                );
                Err(OrmError::from_driver(sql, err))
            }
        }
    }

    /// Run a statement and return the affected row count.
    pub(crate) async fn execute(&self, sql: &str) -> OrmResult<u64> {
        let start = Instant::now();
        match self.client.execute(sql).await {
            Ok(affected) => {
                tracing::debug!(
                    target: "pgdsl.sql",
                    sql = %self.display_sql(sql),
                    affected,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "execute"
                );
                Ok(affected)
            }
            Err(err) => {
                tracing::warn!(
                    target: "pgdsl.sql",
                    sql = %self.display_sql(sql),
                    code = err.code.as_deref().unwrap_or("-"),
                    error = %err,
                    "execute failed"
                );
                Err(OrmError::from_driver(sql, err))
            }
        }
    }
}

/// Truncate SQL to at most `max` characters, appending `...` when cut.
pub(crate) fn truncate_sql(sql: &str, max: usize) -> Cow<'_, str> {
    match sql.char_indices().nth(max) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &sql[..idx])),
        None => Cow::Borrowed(sql),
    }
}

/// Keep the first error recorded while building a chain.
pub(crate) fn record_error(slot: &mut Option<String>, err: OrmError) {
    if slot.is_none() {
        *slot = Some(match err {
            OrmError::Validation(message) => message,
            other => other.to_string(),
        });
    }
}

/// Key/value conditions, recording a resolution failure instead of returning it.
pub(crate) fn values_conditions(
    build_error: &mut Option<String>,
    schema: Option<&FieldMap>,
    values: &FieldValues,
    op: &str,
) -> Vec<Condition> {
    match conditions_from_values(values, op, schema) {
        Ok(conditions) => conditions,
        Err(err) => {
            record_error(build_error, err);
            Vec::new()
        }
    }
}

/// `(prior...) OR (new...)`, each side taken as one AND group.
pub(crate) fn fold_or(prior: Vec<Condition>, new: Vec<Condition>) -> Condition {
    Condition::or([Condition::and(prior), Condition::and(new)])
}

pub(crate) fn check_build_error(slot: &Option<String>) -> OrmResult<()> {
    match slot {
        Some(message) => Err(OrmError::Validation(message.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests;
