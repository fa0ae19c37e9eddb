//! UPDATE builder, including multi-table `UPDATE ... FROM`.

use crate::condition::{Condition, conditions_sql};
use crate::error::OrmResult;
use crate::ident::SqlOptions;
use crate::qb::join::{JoinClause, JoinTarget, joins_sql};
use crate::qb::render::{assignments_sql, push_returning};
use crate::qb::returning::Statement;
use crate::qb::{Runtime, check_build_error};
use crate::table::{FieldMap, FieldValues, Table};

/// One comma-separated FROM item with its own joins.
#[derive(Debug, Clone)]
struct FromItem {
    table: Table,
    joins: Vec<JoinClause>,
}

/// Accumulated state of an UPDATE.
#[derive(Debug, Clone)]
pub struct UpdateContext {
    table: Table,
    schema: Option<FieldMap>,
    values: FieldValues,
    from: Vec<FromItem>,
    conditions: Vec<Condition>,
    build_error: Option<String>,
}

impl UpdateContext {
    fn push_from(&mut self, table: Table) {
        self.from.push(FromItem {
            table,
            joins: Vec::new(),
        });
    }
}

impl JoinTarget for UpdateContext {
    fn push_join(&mut self, join: JoinClause) {
        if let Some(item) = self.from.last_mut() {
            item.joins.push(join);
        }
    }

    fn last_join_mut(&mut self) -> Option<&mut JoinClause> {
        self.from.last_mut().and_then(|item| item.joins.last_mut())
    }
}

impl Statement for UpdateContext {
    fn render(&self, opts: &SqlOptions, returning: Option<&str>) -> OrmResult<String> {
        check_build_error(&self.build_error)?;

        let empty = FieldMap::new();
        let fields = self.schema.as_ref().unwrap_or(&empty);
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table.to_sql(opts)?,
            assignments_sql(&self.values, fields, opts, false)?
        );

        if !self.from.is_empty() {
            let items = self
                .from
                .iter()
                .map(|item| {
                    Ok(format!(
                        "{}{}",
                        item.table.to_sql(opts)?,
                        joins_sql(&item.joins, opts)?
                    ))
                })
                .collect::<OrmResult<Vec<_>>>()?;
            sql.push_str(" FROM ");
            sql.push_str(&items.join(", "));
        }

        let predicate = conditions_sql(&self.conditions, opts)?;
        if !predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        push_returning(&mut sql, returning);
        Ok(sql)
    }
}

pub(crate) fn new_update<C>(
    rt: Runtime<C>,
    table: Table,
    fields: FieldMap,
    values: FieldValues,
) -> UpdateStep<C> {
    UpdateStep::new(
        rt,
        UpdateContext {
            table,
            schema: Some(fields),
            values,
            from: Vec::new(),
            conditions: Vec::new(),
            build_error: None,
        },
    )
}

define_step!(
    /// `UPDATE t SET ...`.
    UpdateStep<C>(UpdateContext)
);

define_step!(
    /// `UPDATE t SET ... FROM a [JOIN ...]`.
    UpdateFromStep<C>(UpdateContext)
);

define_step!(
    /// A join in the FROM list awaiting its `on` predicate.
    UpdateJoinStep<C>(UpdateContext)
);

define_step!(
    /// After WHERE.
    UpdateWhereStep<C>(UpdateContext)
);

impl<C> UpdateStep<C> {
    /// Add a FROM item. Assignment values and conditions may reference its columns.
    pub fn from(mut self, table: impl Into<Table>) -> UpdateFromStep<C> {
        self.ctx.push_from(table.into());
        UpdateFromStep::new(self.rt, self.ctx)
    }

    where_methods!(UpdateWhereStep<C>);
}

impl<C> UpdateFromStep<C> {
    /// Add another comma-separated FROM item.
    pub fn from(mut self, table: impl Into<Table>) -> UpdateFromStep<C> {
        self.ctx.push_from(table.into());
        self
    }

    join_methods!(UpdateFromStep<C>, UpdateJoinStep<C>);
    where_methods!(UpdateWhereStep<C>);
}

impl<C> UpdateJoinStep<C> {
    on_method!(UpdateFromStep<C>);
}

impl<C> UpdateWhereStep<C> {
    where_methods!(UpdateWhereStep<C>);
    chain_methods!(UpdateWhereStep<C>);
}

mutation_terminals!(UpdateContext => UpdateStep, UpdateFromStep, UpdateWhereStep);
