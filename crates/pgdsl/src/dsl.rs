//! The statement root and expression helpers.

use std::fmt;
use std::sync::Arc;

use crate::client::{Detached, GenericClient};
use crate::condition::{Condition, IntoConditions, conditions_from_values};
use crate::convert::Converter;
use crate::error::OrmResult;
use crate::field::Field;
use crate::ident::SqlOptions;
use crate::qb::{
    AllColumns, DeleteStep, InsertStep, Projection, Runtime, SelectFromStep, SelectStep,
    SqlSource, UpdateStep, new_delete, new_insert, new_insert_query, new_select, new_update,
};
use crate::row::{Record, raw_records};
use crate::table::{FieldMap, FieldValues, Table, TableDef, TableSource};

/// Entry point for building statements against one client.
///
/// Every statement built from a `Dsl` shares its client through an `Arc`; cloning a `Dsl` is
/// cheap and never clones the client.
///
/// ```ignore
/// let dsl = Dsl::new(pool);
/// let rows = dsl
///     .select_from(&location)
///     .where_values(FieldValues::new().set("postalCode", "65551"))
///     .order_by(&location["id"])
///     .fetch()
///     .await?;
/// ```
pub struct Dsl<C> {
    rt: Runtime<C>,
}

impl<C> Clone for Dsl<C> {
    fn clone(&self) -> Self {
        Self {
            rt: self.rt.clone(),
        }
    }
}

impl<C> fmt::Debug for Dsl<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dsl")
            .field("options", &self.rt.options)
            .field("sql_log_limit", &self.rt.sql_log_limit)
            .finish()
    }
}

impl<C: GenericClient> Dsl<C> {
    /// Wrap a client. Identifiers are quoted with `"`.
    pub fn new(client: C) -> Self {
        Self::from_arc(Arc::new(client))
    }

    /// Wrap a client that is already shared.
    pub fn from_arc(client: Arc<C>) -> Self {
        Self {
            rt: Runtime::new(client, SqlOptions::quoted()),
        }
    }

    /// Run raw SQL and return the affected row count.
    pub async fn execute_raw(&self, sql: &str) -> OrmResult<u64> {
        self.rt.execute(sql).await
    }

    /// Run raw SQL and return the rows keyed by column name.
    pub async fn query_raw(&self, sql: &str) -> OrmResult<Vec<Record>> {
        Ok(raw_records(self.rt.query(sql).await?))
    }
}

impl<C> Dsl<C> {
    pub fn with_options(mut self, options: SqlOptions) -> Self {
        self.rt.options = options;
        self
    }

    /// Characters of SQL kept in log events; `None` logs statements in full.
    pub fn with_sql_log_limit(mut self, limit: Option<usize>) -> Self {
        self.rt.sql_log_limit = limit;
        self
    }

    pub fn client(&self) -> &Arc<C> {
        &self.rt.client
    }

    pub fn options(&self) -> &SqlOptions {
        &self.rt.options
    }

    /// `SELECT projection`. A [`FieldMap`] maps rows into records, a single [`Field`] into
    /// scalars, and [`AllColumns`] passes rows through.
    pub fn select<P: Projection>(&self, projection: P) -> SelectStep<C, P> {
        new_select(self.rt.clone(), projection)
    }

    /// `SELECT <declared fields> FROM table`.
    pub fn select_from(&self, table: &TableDef) -> SelectFromStep<C, FieldMap> {
        self.select(table.fields().clone()).from(table)
    }

    /// `SELECT * FROM table`, rows passed through unmapped.
    pub fn select_all_from(&self, table: impl TableSource) -> SelectFromStep<C, AllColumns> {
        self.select(AllColumns).from(table)
    }

    /// `INSERT INTO table (<declared columns>) VALUES ...`.
    ///
    /// A row missing a declared column writes `DEFAULT`; a key that is not declared fails the
    /// statement.
    pub fn insert_into(
        &self,
        table: &TableDef,
        rows: impl IntoIterator<Item = FieldValues>,
    ) -> InsertStep<C> {
        self.insert_into_fields(table.table(), table.fields().clone(), rows)
    }

    /// `INSERT INTO table (<fields>) VALUES ...` with an explicit column set.
    pub fn insert_into_fields(
        &self,
        table: impl Into<Table>,
        fields: FieldMap,
        rows: impl IntoIterator<Item = FieldValues>,
    ) -> InsertStep<C> {
        new_insert(
            self.rt.clone(),
            table.into(),
            fields,
            rows.into_iter().collect(),
        )
    }

    /// `INSERT INTO table (<declared columns>) SELECT ...`.
    pub fn insert_into_query<Q>(&self, table: &TableDef, query: &Q) -> InsertStep<C>
    where
        Q: SqlSource + Clone + 'static,
    {
        new_insert_query(
            self.rt.clone(),
            table.table().clone(),
            table.fields().clone(),
            Arc::new(query.clone()),
        )
    }

    /// `UPDATE table SET ...`. Keys of `values` must be declared fields of `table`.
    pub fn update(&self, table: &TableDef, values: FieldValues) -> UpdateStep<C> {
        new_update(
            self.rt.clone(),
            table.table().clone(),
            table.fields().clone(),
            values,
        )
    }

    /// `DELETE FROM table`. Key/value conditions use bare column names.
    pub fn delete(&self, table: impl Into<Table>) -> DeleteStep<C> {
        new_delete(self.rt.clone(), table.into(), None)
    }

    /// `DELETE FROM table`, resolving key/value conditions against the declared fields.
    pub fn delete_from(&self, table: &TableDef) -> DeleteStep<C> {
        new_delete(
            self.rt.clone(),
            table.table().clone(),
            Some(table.fields().clone()),
        )
    }
}

impl Dsl<Detached> {
    /// A root for rendering SQL only; every terminal that touches the database fails.
    pub fn detached(options: SqlOptions) -> Self {
        Dsl::new(Detached).with_options(options)
    }
}

#[cfg(feature = "pool")]
impl Dsl<deadpool_postgres::Pool> {
    /// Build a pool from `config` and wrap it.
    pub fn connect(config: &crate::config::DslConfig) -> OrmResult<Self> {
        let pool = crate::pool::create_pool_from(config)?;
        Ok(Dsl::new(pool)
            .with_options(config.options)
            .with_sql_log_limit(config.sql_log_limit))
    }

    /// Close the pool. Statements built afterwards fail at execution.
    pub fn close(&self) {
        self.rt.client.close();
    }
}

/// A bare column name.
pub fn field(name: impl Into<String>) -> Field {
    Field::named(name)
}

/// A bare column name with a converter.
pub fn field_with(name: impl Into<String>, converter: Arc<dyn Converter>) -> Field {
    Field::named(name).with_converter(converter)
}

/// A raw SQL expression.
pub fn raw(sql: impl Into<String>) -> Field {
    Field::raw(sql)
}

/// `count(*)`.
pub fn count() -> Field {
    Field::count_all()
}

pub fn now() -> Field {
    Field::raw("now()")
}

pub fn random() -> Field {
    Field::raw("random()")
}

/// The proposed row's value for the assigned column, inside an upsert `SET`.
pub fn excluded() -> Field {
    Field::excluded(None)
}

/// The proposed row's value for `column`, inside an upsert `SET`.
pub fn excluded_column(column: impl Into<String>) -> Field {
    Field::excluded(Some(column.into()))
}

pub fn tuple(fields: impl IntoIterator<Item = Field>) -> Field {
    Field::tuple(fields)
}

pub fn and(conditions: impl IntoConditions) -> Condition {
    Condition::and(conditions)
}

pub fn or(conditions: impl IntoConditions) -> Condition {
    Condition::or(conditions)
}

pub fn not(condition: Condition) -> Condition {
    Condition::not(condition)
}

pub fn raw_condition(sql: impl Into<String>) -> Condition {
    Condition::raw(sql)
}

/// AND of one comparison per key, each resolved against `fields`.
pub fn and_values(fields: &FieldMap, values: &FieldValues, op: &str) -> OrmResult<Condition> {
    Ok(Condition::and(conditions_from_values(values, op, Some(fields))?))
}

/// OR of one comparison per key, each resolved against `fields`.
pub fn or_values(fields: &FieldMap, values: &FieldValues, op: &str) -> OrmResult<Condition> {
    Ok(Condition::or(conditions_from_values(values, op, Some(fields))?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::UnionConverter;
    use crate::error::OrmError;

    fn q() -> SqlOptions {
        SqlOptions::quoted()
    }

    #[test]
    fn helpers_render() {
        assert_eq!(count().to_sql(&q()).unwrap(), "count(*)");
        assert_eq!(now().to_sql(&q()).unwrap(), "now()");
        assert_eq!(
            tuple([field("a"), field("b")]).to_sql(&q()).unwrap(),
            "(\"a\", \"b\")"
        );
        assert_eq!(
            not(raw_condition("x > 1")).to_sql(&q()).unwrap(),
            "NOT (x > 1)"
        );
        assert!(excluded().to_sql(&q()).unwrap_err().is_unsupported());
    }

    #[test]
    fn and_values_writes_literals_through_converters() {
        let t = Table::new("t");
        let fields = FieldMap::new().with("a", t.field("a")).with(
            "b",
            t.field("b")
                .with_converter(UnionConverter::new([("two", 2)]).shared()),
        );
        let values = FieldValues::new().set("a", 1).set("b", "two");
        assert_eq!(
            and_values(&fields, &values, "=").unwrap().to_sql(&q()).unwrap(),
            "(\"t\".\"a\" = 1 AND \"t\".\"b\" = 2)"
        );
        assert_eq!(
            or_values(&fields, &values, ">").unwrap().to_sql(&q()).unwrap(),
            "(\"t\".\"a\" > 1 OR \"t\".\"b\" > 2)"
        );
    }

    #[test]
    fn and_values_rejects_unknown_keys() {
        let fields = FieldMap::new().with("a", field("a"));
        let err = and_values(&fields, &FieldValues::new().set("zzz", 1), "=").unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));
    }

    #[test]
    fn detached_keeps_options() {
        let dsl = Dsl::detached(SqlOptions::bare());
        assert_eq!(*dsl.options(), SqlOptions::bare());
        let dsl = dsl.with_options(q()).with_sql_log_limit(None);
        assert_eq!(*dsl.options(), q());
    }
}
