//! INSERT builder with upsert support.

use std::sync::Arc;

use crate::error::{OrmError, OrmResult};
use crate::field::{Field, Operand, value_sql};
use crate::ident::SqlOptions;
use crate::qb::render::{assignments_sql, push_returning};
use crate::qb::returning::Statement;
use crate::qb::traits::SqlSource;
use crate::qb::{Runtime, check_build_error};
use crate::table::{FieldMap, FieldValues, Table};

/// Conflict target of `ON CONFLICT`.
#[derive(Debug, Clone)]
pub enum ConflictTarget {
    /// Any conflict; no target list. Only valid with `DO NOTHING`.
    Any,
    /// Column names. A name matching a declared field key resolves to that field's column.
    Columns(Vec<String>),
    Fields(Vec<Field>),
    /// `ON CONSTRAINT name`.
    Constraint(String),
}

impl From<&str> for ConflictTarget {
    fn from(column: &str) -> Self {
        ConflictTarget::Columns(vec![column.to_string()])
    }
}

impl From<String> for ConflictTarget {
    fn from(column: String) -> Self {
        ConflictTarget::Columns(vec![column])
    }
}

impl From<Vec<&str>> for ConflictTarget {
    fn from(columns: Vec<&str>) -> Self {
        ConflictTarget::Columns(columns.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ConflictTarget {
    fn from(columns: [&str; N]) -> Self {
        ConflictTarget::Columns(columns.into_iter().map(String::from).collect())
    }
}

impl From<&Field> for ConflictTarget {
    fn from(field: &Field) -> Self {
        ConflictTarget::Fields(vec![field.clone()])
    }
}

impl From<Field> for ConflictTarget {
    fn from(field: Field) -> Self {
        ConflictTarget::Fields(vec![field])
    }
}

impl From<Vec<Field>> for ConflictTarget {
    fn from(fields: Vec<Field>) -> Self {
        ConflictTarget::Fields(fields)
    }
}

impl ConflictTarget {
    fn to_sql(&self, fields: &FieldMap, opts: &SqlOptions) -> OrmResult<String> {
        match self {
            ConflictTarget::Any => Ok(String::new()),
            ConflictTarget::Columns(names) => {
                let columns = names
                    .iter()
                    .map(|name| match fields.get(name) {
                        Some(field) => field.column_name(opts),
                        None => Ok(opts.ident(name)),
                    })
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(format!(" ({})", columns.join(", ")))
            }
            ConflictTarget::Fields(list) => {
                let columns = list
                    .iter()
                    .map(|f| f.column_name(opts))
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(format!(" ({})", columns.join(", ")))
            }
            ConflictTarget::Constraint(name) => Ok(format!(" ON CONSTRAINT {}", opts.ident(name))),
        }
    }
}

#[derive(Debug, Clone)]
enum InsertSource {
    Rows(Vec<FieldValues>),
    Query(Arc<dyn SqlSource>),
}

#[derive(Debug, Clone)]
enum ConflictAction {
    Nothing,
    Update(FieldValues),
}

#[derive(Debug, Clone)]
struct OnConflict {
    target: ConflictTarget,
    action: ConflictAction,
}

/// Accumulated state of an INSERT.
#[derive(Debug, Clone)]
pub struct InsertContext {
    table: Table,
    fields: FieldMap,
    source: InsertSource,
    conflict: Option<OnConflict>,
    build_error: Option<String>,
}

impl InsertContext {
    fn row_sql(&self, row: &FieldValues, opts: &SqlOptions) -> OrmResult<String> {
        if let Some(key) = row.keys().find(|k| !self.fields.contains(k)) {
            return Err(OrmError::validation(format!(
                "unknown field '{key}' in insert row"
            )));
        }
        let values = self
            .fields
            .iter()
            .map(|(name, field)| match row.get(name) {
                Some(Operand::Value(v)) => value_sql(v, field.converter()),
                Some(Operand::Field(f)) => f.expr_sql(opts),
                None => Ok("DEFAULT".to_string()),
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(format!("({})", values.join(", ")))
    }

    fn conflict_sql(&self, conflict: &OnConflict, opts: &SqlOptions) -> OrmResult<String> {
        let mut sql = String::from(" ON CONFLICT");
        sql.push_str(&conflict.target.to_sql(&self.fields, opts)?);
        match &conflict.action {
            ConflictAction::Nothing => sql.push_str(" DO NOTHING"),
            ConflictAction::Update(_) if matches!(conflict.target, ConflictTarget::Any) => {
                return Err(OrmError::unsupported(
                    "ON CONFLICT DO UPDATE requires a conflict target",
                ));
            }
            ConflictAction::Update(values) => {
                sql.push_str(" DO UPDATE SET ");
                sql.push_str(&assignments_sql(values, &self.fields, opts, true)?);
            }
        }
        Ok(sql)
    }

    fn set_conflict(&mut self, target: ConflictTarget, action: ConflictAction) {
        self.conflict = Some(OnConflict { target, action });
    }

    fn set_action(&mut self, action: ConflictAction) {
        if let Some(conflict) = self.conflict.as_mut() {
            conflict.action = action;
        }
    }
}

impl Statement for InsertContext {
    fn render(&self, opts: &SqlOptions, returning: Option<&str>) -> OrmResult<String> {
        check_build_error(&self.build_error)?;
        if self.fields.is_empty() {
            return Err(OrmError::validation("INSERT requires at least one field"));
        }

        let columns = self
            .fields
            .iter()
            .map(|(_, f)| f.column_name(opts))
            .collect::<OrmResult<Vec<_>>>()?;
        let mut sql = format!(
            "INSERT INTO {} ({})",
            self.table.to_sql(opts)?,
            columns.join(", ")
        );

        match &self.source {
            InsertSource::Rows(rows) => {
                if rows.is_empty() {
                    return Err(OrmError::validation("INSERT requires at least one row"));
                }
                let rows = rows
                    .iter()
                    .map(|row| self.row_sql(row, opts))
                    .collect::<OrmResult<Vec<_>>>()?;
                sql.push_str(" VALUES ");
                sql.push_str(&rows.join(", "));
            }
            InsertSource::Query(query) => {
                sql.push(' ');
                sql.push_str(&query.render_sql(opts)?);
            }
        }

        if let Some(conflict) = &self.conflict {
            sql.push_str(&self.conflict_sql(conflict, opts)?);
        }
        push_returning(&mut sql, returning);
        Ok(sql)
    }
}

fn context(table: Table, fields: FieldMap, source: InsertSource) -> InsertContext {
    InsertContext {
        table,
        fields,
        source,
        conflict: None,
        build_error: None,
    }
}

pub(crate) fn new_insert<C>(
    rt: Runtime<C>,
    table: Table,
    fields: FieldMap,
    rows: Vec<FieldValues>,
) -> InsertStep<C> {
    InsertStep::new(rt, context(table, fields, InsertSource::Rows(rows)))
}

pub(crate) fn new_insert_query<C>(
    rt: Runtime<C>,
    table: Table,
    fields: FieldMap,
    query: Arc<dyn SqlSource>,
) -> InsertStep<C> {
    InsertStep::new(rt, context(table, fields, InsertSource::Query(query)))
}

define_step!(
    /// `INSERT INTO t (...) VALUES ...` or `INSERT INTO t (...) SELECT ...`.
    InsertStep<C>(InsertContext)
);

define_step!(
    /// `ON CONFLICT ...` awaiting its action.
    OnConflictStep<C>(InsertContext)
);

define_step!(
    /// `ON CONFLICT ... DO UPDATE` awaiting its assignments.
    OnConflictUpdateStep<C>(InsertContext)
);

define_step!(
    /// An INSERT with a complete conflict clause.
    InsertConflictStep<C>(InsertContext)
);

impl<C> InsertStep<C> {
    /// `ON CONFLICT (target)`.
    pub fn on_conflict(mut self, target: impl Into<ConflictTarget>) -> OnConflictStep<C> {
        self.ctx.set_conflict(target.into(), ConflictAction::Nothing);
        OnConflictStep::new(self.rt, self.ctx)
    }

    /// `ON CONFLICT ON CONSTRAINT name`.
    pub fn on_conflict_constraint(mut self, name: impl Into<String>) -> OnConflictStep<C> {
        self.ctx
            .set_conflict(ConflictTarget::Constraint(name.into()), ConflictAction::Nothing);
        OnConflictStep::new(self.rt, self.ctx)
    }

    /// `ON CONFLICT DO NOTHING` for any conflict.
    pub fn on_conflict_do_nothing(mut self) -> InsertConflictStep<C> {
        self.ctx
            .set_conflict(ConflictTarget::Any, ConflictAction::Nothing);
        InsertConflictStep::new(self.rt, self.ctx)
    }
}

impl<C> OnConflictStep<C> {
    pub fn do_nothing(mut self) -> InsertConflictStep<C> {
        self.ctx.set_action(ConflictAction::Nothing);
        InsertConflictStep::new(self.rt, self.ctx)
    }

    pub fn do_update(mut self) -> OnConflictUpdateStep<C> {
        self.ctx.set_action(ConflictAction::Update(FieldValues::new()));
        OnConflictUpdateStep::new(self.rt, self.ctx)
    }
}

impl<C> OnConflictUpdateStep<C> {
    /// Assignments for the conflicting row. Values may reference the proposed row through
    /// `excluded()` / `excluded_column(name)`.
    pub fn set(mut self, values: FieldValues) -> InsertConflictStep<C> {
        self.ctx.set_action(ConflictAction::Update(values));
        InsertConflictStep::new(self.rt, self.ctx)
    }

    /// Overwrite every declared column with the proposed row's value.
    pub fn set_excluded(mut self) -> InsertConflictStep<C> {
        let values = self
            .ctx
            .fields
            .names()
            .fold(FieldValues::new(), |acc, name| {
                acc.set(name, Field::excluded(None))
            });
        self.ctx.set_action(ConflictAction::Update(values));
        InsertConflictStep::new(self.rt, self.ctx)
    }
}

mutation_terminals!(InsertContext => InsertStep, InsertConflictStep);
