//! SELECT builder.

use std::sync::Arc;

use crate::client::GenericClient;
use crate::condition::{Condition, conditions_sql};
use crate::error::OrmResult;
use crate::field::{Direction, Field, OrderField};
use crate::ident::SqlOptions;
use crate::qb::join::{JoinClause, JoinTarget, joins_sql};
use crate::qb::projection::Projection;
use crate::qb::traits::SqlSource;
use crate::qb::{Runtime, check_build_error};
use crate::table::{FieldMap, Table, TableDef, TableSource};

/// GROUP BY input: one field or several.
pub trait IntoFields {
    fn into_fields(self) -> Vec<Field>;
}

impl IntoFields for Field {
    fn into_fields(self) -> Vec<Field> {
        vec![self]
    }
}

impl IntoFields for &Field {
    fn into_fields(self) -> Vec<Field> {
        vec![self.clone()]
    }
}

impl IntoFields for Vec<Field> {
    fn into_fields(self) -> Vec<Field> {
        self
    }
}

impl<const N: usize> IntoFields for [Field; N] {
    fn into_fields(self) -> Vec<Field> {
        self.into()
    }
}

/// ORDER BY input: fields (no direction token), ordered fields, or lists of either.
pub trait IntoOrderFields {
    fn into_order_fields(self) -> Vec<OrderField>;
}

impl IntoOrderFields for OrderField {
    fn into_order_fields(self) -> Vec<OrderField> {
        vec![self]
    }
}

impl IntoOrderFields for Field {
    fn into_order_fields(self) -> Vec<OrderField> {
        vec![self.into()]
    }
}

impl IntoOrderFields for &Field {
    fn into_order_fields(self) -> Vec<OrderField> {
        vec![self.into()]
    }
}

impl IntoOrderFields for (Field, Direction) {
    fn into_order_fields(self) -> Vec<OrderField> {
        vec![self.into()]
    }
}

impl IntoOrderFields for Vec<OrderField> {
    fn into_order_fields(self) -> Vec<OrderField> {
        self
    }
}

impl IntoOrderFields for Vec<Field> {
    fn into_order_fields(self) -> Vec<OrderField> {
        self.into_iter().map(OrderField::from).collect()
    }
}

impl<const N: usize> IntoOrderFields for [OrderField; N] {
    fn into_order_fields(self) -> Vec<OrderField> {
        self.into()
    }
}

impl<const N: usize> IntoOrderFields for [Field; N] {
    fn into_order_fields(self) -> Vec<OrderField> {
        self.into_iter().map(OrderField::from).collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SelectContext<P> {
    projection: P,
    from: Option<Table>,
    joins: Vec<JoinClause>,
    conditions: Vec<Condition>,
    schema: Option<FieldMap>,
    group_by: Vec<Field>,
    order_by: Vec<OrderField>,
    limit: Option<u64>,
    offset: Option<u64>,
    build_error: Option<String>,
}

impl<P: Projection> SelectContext<P> {
    fn new(projection: P) -> Self {
        Self {
            projection,
            from: None,
            joins: Vec::new(),
            conditions: Vec::new(),
            schema: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            build_error: None,
        }
    }

    fn with_limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    fn render(&self, opts: &SqlOptions) -> OrmResult<String> {
        self.render_with(opts, false)
    }

    fn render_with(&self, opts: &SqlOptions, derived: bool) -> OrmResult<String> {
        check_build_error(&self.build_error)?;

        let projection = if derived {
            self.projection.derived_sql(opts)?
        } else {
            self.projection.select_sql(opts)?
        };
        let mut sql = format!("SELECT {projection}");

        if let Some(table) = &self.from {
            sql.push_str(" FROM ");
            sql.push_str(&table.to_sql(opts)?);
        }
        sql.push_str(&joins_sql(&self.joins, opts)?);

        let predicate = conditions_sql(&self.conditions, opts)?;
        if !predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }

        if !self.group_by.is_empty() {
            let names = self
                .group_by
                .iter()
                .map(|f| f.name(opts))
                .collect::<OrmResult<Vec<_>>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&names.join(", "));
        }

        if !self.order_by.is_empty() {
            let terms = self
                .order_by
                .iter()
                .map(|o| o.to_sql(opts))
                .collect::<OrmResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        Ok(sql)
    }

    async fn fetch<C: GenericClient>(&self, rt: &Runtime<C>) -> OrmResult<Vec<P::Item>> {
        let sql = self.render(&rt.options)?;
        let output = rt.query(&sql).await?;
        self.projection.map_output(output)
    }

    fn as_table(&self, alias: &str) -> TableDef {
        let table = Table::derived(alias, Arc::new(DerivedSelect(self.clone())));
        let fields = self.projection.derived_fields(&table);
        TableDef::from_parts(table, fields)
    }
}

impl<P> JoinTarget for SelectContext<P> {
    fn push_join(&mut self, join: JoinClause) {
        self.joins.push(join);
    }

    fn last_join_mut(&mut self) -> Option<&mut JoinClause> {
        self.joins.last_mut()
    }
}

/// A select rendered as a derived table, with every column named by its key.
#[derive(Debug)]
struct DerivedSelect<P>(SelectContext<P>);

impl<P: Projection> SqlSource for DerivedSelect<P> {
    fn render_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        self.0.render_with(opts, true)
    }
}

pub(crate) fn new_select<C, P: Projection>(rt: Runtime<C>, projection: P) -> SelectStep<C, P> {
    SelectStep::new(rt, SelectContext::new(projection))
}

define_step!(
    /// `SELECT ...` with no table yet. Terminal calls render a FROM-less select.
    SelectStep<C, P>(SelectContext<P>)
);

define_step!(
    /// `SELECT ... FROM t [JOIN ...]`.
    SelectFromStep<C, P>(SelectContext<P>)
);

define_step!(
    /// A join awaiting its `on` predicate.
    SelectJoinStep<C, P>(SelectContext<P>)
);

define_step!(
    /// After WHERE.
    SelectWhereStep<C, P>(SelectContext<P>)
);

define_step!(
    /// After GROUP BY.
    SelectGroupByStep<C, P>(SelectContext<P>)
);

define_step!(
    /// After ORDER BY.
    SelectOrderStep<C, P>(SelectContext<P>)
);

define_step!(
    /// After LIMIT. Only terminal calls remain.
    SelectLimitStep<C, P>(SelectContext<P>)
);

impl<C, P: Projection> SelectStep<C, P> {
    /// Set the primary table. Key/value conditions resolve against the fields of a
    /// [`TableDef`], or against the projected field map when the table is bare.
    pub fn from(mut self, source: impl TableSource) -> SelectFromStep<C, P> {
        let (table, schema) = source.into_parts();
        self.ctx.from = Some(table);
        self.ctx.schema = schema.or_else(|| self.ctx.projection.known_fields());
        SelectFromStep::new(self.rt, self.ctx)
    }
}

impl<C, P> SelectFromStep<C, P> {
    join_methods!(SelectFromStep<C, P>, SelectJoinStep<C, P>);
    where_methods!(SelectWhereStep<C, P>);
    group_by_methods!(SelectGroupByStep<C, P>);
    order_by_methods!(SelectOrderStep<C, P>);
    limit_methods!(SelectLimitStep<C, P>);
}

impl<C, P> SelectJoinStep<C, P> {
    on_method!(SelectFromStep<C, P>);
}

impl<C, P> SelectWhereStep<C, P> {
    where_methods!(SelectWhereStep<C, P>);
    chain_methods!(SelectWhereStep<C, P>);
    group_by_methods!(SelectGroupByStep<C, P>);
    order_by_methods!(SelectOrderStep<C, P>);
    limit_methods!(SelectLimitStep<C, P>);
}

impl<C, P> SelectGroupByStep<C, P> {
    order_by_methods!(SelectOrderStep<C, P>);
    limit_methods!(SelectLimitStep<C, P>);
}

impl<C, P> SelectOrderStep<C, P> {
    limit_methods!(SelectLimitStep<C, P>);
}

select_terminals!(
    SelectStep,
    SelectFromStep,
    SelectWhereStep,
    SelectGroupByStep,
    SelectOrderStep,
    SelectLimitStep,
);
