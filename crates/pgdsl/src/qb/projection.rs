//! What a statement selects or returns, and how its rows are mapped back.

use std::fmt;

use crate::client::QueryOutput;
use crate::error::OrmResult;
use crate::field::Field;
use crate::ident::SqlOptions;
use crate::row::{self, Record};
use crate::table::{FieldMap, Table};
use crate::value::Value;

/// Key under which a single-field projection is exposed by `as_table`.
pub const SCALAR_KEY: &str = "value";

/// A projection: a field map (records), a single field (scalars), or all columns (raw rows).
pub trait Projection: Clone + fmt::Debug + Send + Sync + 'static {
    /// Mapped row type.
    type Item: Send + 'static;

    /// Render the SELECT list.
    fn select_sql(&self, opts: &SqlOptions) -> OrmResult<String>;

    /// Render the SELECT list of a derived table, naming each column by its key.
    fn derived_sql(&self, opts: &SqlOptions) -> OrmResult<String>;

    /// Render the RETURNING list.
    fn returning_sql(&self, opts: &SqlOptions) -> OrmResult<String>;

    /// Map driver rows.
    fn map_output(&self, output: QueryOutput) -> OrmResult<Vec<Self::Item>>;

    /// Fields of the derived table `table` built from this projection.
    fn derived_fields(&self, table: &Table) -> FieldMap;

    /// Named fields that key/value conditions may resolve against when the statement
    /// has no declared schema.
    fn known_fields(&self) -> Option<FieldMap> {
        None
    }
}

/// `*`: every column, rows passed through keyed by column name.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllColumns;

impl Projection for AllColumns {
    type Item = Record;

    fn select_sql(&self, _opts: &SqlOptions) -> OrmResult<String> {
        Ok("*".to_string())
    }

    fn derived_sql(&self, _opts: &SqlOptions) -> OrmResult<String> {
        Ok("*".to_string())
    }

    fn returning_sql(&self, _opts: &SqlOptions) -> OrmResult<String> {
        Ok("*".to_string())
    }

    fn map_output(&self, output: QueryOutput) -> OrmResult<Vec<Record>> {
        Ok(row::raw_records(output))
    }

    fn derived_fields(&self, _table: &Table) -> FieldMap {
        FieldMap::new()
    }
}

fn join_fields(
    fields: &FieldMap,
    render: impl Fn(&str, &Field) -> OrmResult<String>,
) -> OrmResult<String> {
    if fields.is_empty() {
        return Ok("*".to_string());
    }
    let parts = fields
        .iter()
        .map(|(name, field)| render(name, field))
        .collect::<OrmResult<Vec<_>>>()?;
    Ok(parts.join(", "))
}

impl Projection for FieldMap {
    type Item = Record;

    fn select_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        join_fields(self, |_, f| f.to_sql(opts))
    }

    fn derived_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        join_fields(self, |name, f| {
            Ok(format!("{} as {}", f.expr_sql(opts)?, opts.ident(name)))
        })
    }

    fn returning_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        join_fields(self, |_, f| f.column_name(opts))
    }

    fn map_output(&self, output: QueryOutput) -> OrmResult<Vec<Record>> {
        row::map_records(self, output)
    }

    fn derived_fields(&self, table: &Table) -> FieldMap {
        self.iter()
            .map(|(name, f)| (name, derived_field(table, name, f)))
            .collect()
    }

    fn known_fields(&self) -> Option<FieldMap> {
        (!self.is_empty()).then(|| self.clone())
    }
}

impl Projection for Field {
    type Item = Value;

    fn select_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        self.to_sql(opts)
    }

    fn derived_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        Ok(format!("{} as {}", self.expr_sql(opts)?, opts.ident(SCALAR_KEY)))
    }

    fn returning_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        self.column_name(opts)
    }

    fn map_output(&self, output: QueryOutput) -> OrmResult<Vec<Value>> {
        row::map_scalars(self, output)
    }

    fn derived_fields(&self, table: &Table) -> FieldMap {
        FieldMap::new().with(SCALAR_KEY, derived_field(table, SCALAR_KEY, self))
    }
}

// The derived column carries the source field's converter.
fn derived_field(table: &Table, name: &str, source: &Field) -> Field {
    let field = table.field(name);
    match source.converter() {
        Some(conv) => field.with_converter(conv.clone()),
        None => field,
    }
}
