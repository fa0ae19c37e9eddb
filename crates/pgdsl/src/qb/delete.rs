//! DELETE builder.
//!
//! No WHERE clause is implied: `delete(t).execute()` removes every row.

use crate::condition::{Condition, conditions_sql};
use crate::error::OrmResult;
use crate::ident::SqlOptions;
use crate::qb::render::push_returning;
use crate::qb::returning::Statement;
use crate::qb::{Runtime, check_build_error};
use crate::table::{FieldMap, Table};

/// Accumulated state of a DELETE.
#[derive(Debug, Clone)]
pub struct DeleteContext {
    table: Table,
    schema: Option<FieldMap>,
    conditions: Vec<Condition>,
    build_error: Option<String>,
}

impl Statement for DeleteContext {
    fn render(&self, opts: &SqlOptions, returning: Option<&str>) -> OrmResult<String> {
        check_build_error(&self.build_error)?;
        let mut sql = format!("DELETE FROM {}", self.table.to_sql(opts)?);
        let predicate = conditions_sql(&self.conditions, opts)?;
        if !predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        push_returning(&mut sql, returning);
        Ok(sql)
    }
}

pub(crate) fn new_delete<C>(
    rt: Runtime<C>,
    table: Table,
    schema: Option<FieldMap>,
) -> DeleteStep<C> {
    DeleteStep::new(
        rt,
        DeleteContext {
            table,
            schema,
            conditions: Vec::new(),
            build_error: None,
        },
    )
}

define_step!(
    /// `DELETE FROM t`.
    DeleteStep<C>(DeleteContext)
);

define_step!(
    /// After WHERE.
    DeleteWhereStep<C>(DeleteContext)
);

impl<C> DeleteStep<C> {
    where_methods!(DeleteWhereStep<C>);
}

impl<C> DeleteWhereStep<C> {
    where_methods!(DeleteWhereStep<C>);
    chain_methods!(DeleteWhereStep<C>);
}

mutation_terminals!(DeleteContext => DeleteStep, DeleteWhereStep);
