//! Macros generating the step types and the clause methods they share.
//!
//! Clause methods are expanded inside each step's `impl` block and move the accumulated
//! context into the next step with `<Next>::new(rt, ctx)`. Contexts share the field names
//! `conditions`, `schema` and `build_error` so the same expansions serve every statement kind.

/// Declare a step type wrapping a runtime handle and a statement context.
macro_rules! define_step {
    ($(#[$meta:meta])* $name:ident<C, P>($ctx:ty)) => {
        $(#[$meta])*
        pub struct $name<C, P> {
            rt: $crate::qb::Runtime<C>,
            ctx: $ctx,
        }

        impl<C, P> $name<C, P> {
            pub(crate) fn new(rt: $crate::qb::Runtime<C>, ctx: $ctx) -> Self {
                Self { rt, ctx }
            }
        }

        impl<C, P: Clone> Clone for $name<C, P> {
            fn clone(&self) -> Self {
                Self {
                    rt: self.rt.clone(),
                    ctx: self.ctx.clone(),
                }
            }
        }

        impl<C, P: std::fmt::Debug> std::fmt::Debug for $name<C, P> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("ctx", &self.ctx)
                    .finish()
            }
        }
    };
    ($(#[$meta:meta])* $name:ident<C>($ctx:ty)) => {
        $(#[$meta])*
        pub struct $name<C> {
            rt: $crate::qb::Runtime<C>,
            ctx: $ctx,
        }

        impl<C> $name<C> {
            pub(crate) fn new(rt: $crate::qb::Runtime<C>, ctx: $ctx) -> Self {
                Self { rt, ctx }
            }
        }

        impl<C> Clone for $name<C> {
            fn clone(&self) -> Self {
                Self {
                    rt: self.rt.clone(),
                    ctx: self.ctx.clone(),
                }
            }
        }

        impl<C> std::fmt::Debug for $name<C> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("ctx", &self.ctx)
                    .finish()
            }
        }
    };
}

/// `where_`, `where_values`, `where_values_op`.
macro_rules! where_methods {
    ($next:ty) => {
        /// Add WHERE conditions (implicitly AND-ed with earlier ones).
        pub fn where_(mut self, conditions: impl $crate::condition::IntoConditions) -> $next {
            self.ctx.conditions.extend(conditions.into_conditions());
            <$next>::new(self.rt, self.ctx)
        }

        /// Add one `=` comparison per key of `values`.
        pub fn where_values(self, values: $crate::table::FieldValues) -> $next {
            self.where_values_op(values, "=")
        }

        /// Add one comparison per key of `values` using `op`.
        ///
        /// Keys are resolved against the statement's declared fields when it has any; an
        /// unknown key fails the statement with a validation error.
        pub fn where_values_op(mut self, values: $crate::table::FieldValues, op: &str) -> $next {
            let conditions = $crate::qb::values_conditions(
                &mut self.ctx.build_error,
                self.ctx.schema.as_ref(),
                &values,
                op,
            );
            self.ctx.conditions.extend(conditions);
            <$next>::new(self.rt, self.ctx)
        }
    };
}

/// `and`, `and_values[_op]`, `or`, `or_values[_op]`.
macro_rules! chain_methods {
    ($next:ty) => {
        pub fn and(mut self, conditions: impl $crate::condition::IntoConditions) -> $next {
            self.ctx.conditions.extend(conditions.into_conditions());
            <$next>::new(self.rt, self.ctx)
        }

        pub fn and_values(self, values: $crate::table::FieldValues) -> $next {
            self.and_values_op(values, "=")
        }

        pub fn and_values_op(self, values: $crate::table::FieldValues, op: &str) -> $next {
            self.where_values_op(values, op)
        }

        /// OR `conditions` against everything accumulated so far, taken as one AND group.
        pub fn or(mut self, conditions: impl $crate::condition::IntoConditions) -> $next {
            let prior = std::mem::take(&mut self.ctx.conditions);
            self.ctx.conditions = vec![$crate::qb::fold_or(prior, conditions.into_conditions())];
            <$next>::new(self.rt, self.ctx)
        }

        pub fn or_values(self, values: $crate::table::FieldValues) -> $next {
            self.or_values_op(values, "=")
        }

        pub fn or_values_op(mut self, values: $crate::table::FieldValues, op: &str) -> $next {
            let conditions = $crate::qb::values_conditions(
                &mut self.ctx.build_error,
                self.ctx.schema.as_ref(),
                &values,
                op,
            );
            let prior = std::mem::take(&mut self.ctx.conditions);
            self.ctx.conditions = vec![$crate::qb::fold_or(prior, conditions)];
            <$next>::new(self.rt, self.ctx)
        }
    };
}

/// Join family. `x_join(table)` moves to a step that requires `on`; `x_join_on(table, cond)`
/// stays on the FROM step.
macro_rules! join_methods {
    (@each $from:ty, $pending:ty; $($name:ident, $name_on:ident => $kind:ident;)*) => {
        $(
            pub fn $name(self, table: impl Into<$crate::table::Table>) -> $pending {
                self.join_kind($crate::qb::JoinKind::$kind, table)
            }

            pub fn $name_on(
                self,
                table: impl Into<$crate::table::Table>,
                conditions: impl $crate::condition::IntoConditions,
            ) -> $from {
                self.join_kind_on($crate::qb::JoinKind::$kind, table, conditions)
            }
        )*
    };
    ($from:ty, $pending:ty) => {
        join_methods!(@each $from, $pending;
            join, join_on => Inner;
            left_join, left_join_on => Left;
            right_join, right_join_on => Right;
            left_outer_join, left_outer_join_on => LeftOuter;
            right_outer_join, right_outer_join_on => RightOuter;
            full_outer_join, full_outer_join_on => FullOuter;
        );

        /// `CROSS JOIN`, which takes no predicate.
        pub fn cross_join(mut self, table: impl Into<$crate::table::Table>) -> $from {
            $crate::qb::JoinTarget::push_join(
                &mut self.ctx,
                $crate::qb::JoinClause::new($crate::qb::JoinKind::Cross, table.into(), Vec::new()),
            );
            <$from>::new(self.rt, self.ctx)
        }

        /// Join with an explicit kind; the predicate must follow via `on`.
        pub fn join_kind(
            mut self,
            kind: $crate::qb::JoinKind,
            table: impl Into<$crate::table::Table>,
        ) -> $pending {
            $crate::qb::JoinTarget::push_join(
                &mut self.ctx,
                $crate::qb::JoinClause::new(kind, table.into(), Vec::new()),
            );
            <$pending>::new(self.rt, self.ctx)
        }

        /// Join with an explicit kind and inline predicate.
        pub fn join_kind_on(
            mut self,
            kind: $crate::qb::JoinKind,
            table: impl Into<$crate::table::Table>,
            conditions: impl $crate::condition::IntoConditions,
        ) -> $from {
            $crate::qb::JoinTarget::push_join(
                &mut self.ctx,
                $crate::qb::JoinClause::new(kind, table.into(), conditions.into_conditions()),
            );
            <$from>::new(self.rt, self.ctx)
        }
    };
}

/// `on`, completing a pending join.
macro_rules! on_method {
    ($next:ty) => {
        /// Predicate for the join just added.
        pub fn on(mut self, conditions: impl $crate::condition::IntoConditions) -> $next {
            if let Some(join) = $crate::qb::JoinTarget::last_join_mut(&mut self.ctx) {
                join.conditions.extend(conditions.into_conditions());
            }
            <$next>::new(self.rt, self.ctx)
        }
    };
}

macro_rules! group_by_methods {
    ($next:ty) => {
        /// Add GROUP BY terms. Aliased fields are referenced by alias.
        pub fn group_by(mut self, fields: impl $crate::qb::IntoFields) -> $next {
            self.ctx.group_by.extend(fields.into_fields());
            <$next>::new(self.rt, self.ctx)
        }
    };
}

macro_rules! order_by_methods {
    ($next:ty) => {
        /// Add ORDER BY terms.
        pub fn order_by(mut self, fields: impl $crate::qb::IntoOrderFields) -> $next {
            self.ctx.order_by.extend(fields.into_order_fields());
            <$next>::new(self.rt, self.ctx)
        }
    };
}

macro_rules! limit_methods {
    ($next:ty) => {
        /// Limit the row count.
        pub fn limit(mut self, count: u64) -> $next {
            self.ctx.limit = Some(count);
            <$next>::new(self.rt, self.ctx)
        }

        /// Skip `offset` rows, then return at most `count`.
        pub fn limit_offset(mut self, offset: u64, count: u64) -> $next {
            self.ctx.offset = Some(offset);
            self.ctx.limit = Some(count);
            <$next>::new(self.rt, self.ctx)
        }

        /// Sugar for `limit(1)`.
        pub fn first(self) -> $next {
            self.limit(1)
        }
    };
}

/// Terminal operations of select steps.
macro_rules! select_terminals {
    ($($name:ident),* $(,)?) => {
        $(
            impl<C, P> $crate::qb::SqlSource for $name<C, P>
            where
                C: $crate::client::GenericClient,
                P: $crate::qb::Projection,
            {
                fn render_sql(
                    &self,
                    opts: &$crate::ident::SqlOptions,
                ) -> $crate::error::OrmResult<String> {
                    self.ctx.render(opts)
                }
            }

            impl<C, P> $crate::qb::Fetchable for $name<C, P>
            where
                C: $crate::client::GenericClient,
                P: $crate::qb::Projection,
            {
                type Item = P::Item;

                fn to_sql(&self) -> $crate::error::OrmResult<String> {
                    self.ctx.render(&self.rt.options)
                }

                async fn fetch(&self) -> $crate::error::OrmResult<Vec<P::Item>> {
                    self.ctx.fetch(&self.rt).await
                }

                async fn fetch_one(&self) -> $crate::error::OrmResult<Option<P::Item>> {
                    let first = self.ctx.clone().with_limit(1);
                    Ok(first.fetch(&self.rt).await?.into_iter().next())
                }
            }

            impl<C, P: $crate::qb::Projection> $name<C, P> {
                /// Expose this query as a derived table named `alias`.
                ///
                /// Each projected column is named by its key (`value` for a single field).
                pub fn as_table(&self, alias: &str) -> $crate::table::TableDef {
                    self.ctx.as_table(alias)
                }
            }
        )*
    };
}

/// Terminal operations of mutation steps without a RETURNING clause.
macro_rules! mutation_terminals {
    ($ctx:ty => $($name:ident),* $(,)?) => {
        $(
            impl<C: $crate::client::GenericClient> $crate::qb::Executable for $name<C> {
                fn to_sql(&self) -> $crate::error::OrmResult<String> {
                    $crate::qb::Statement::render(&self.ctx, &self.rt.options, None)
                }

                async fn execute(&self) -> $crate::error::OrmResult<u64> {
                    let sql = $crate::qb::Executable::to_sql(self)?;
                    self.rt.execute(&sql).await
                }
            }

            impl<C> $name<C> {
                /// `RETURNING *`, rows passed through unmapped.
                pub fn returning_all(self) -> $crate::qb::ReturningStep<C, $ctx, $crate::qb::AllColumns> {
                    $crate::qb::ReturningStep::new(self.rt, self.ctx, $crate::qb::AllColumns)
                }

                /// Return the given fields, mapped into records.
                pub fn returning(
                    self,
                    fields: $crate::table::FieldMap,
                ) -> $crate::qb::ReturningStep<C, $ctx, $crate::table::FieldMap> {
                    $crate::qb::ReturningStep::new(self.rt, self.ctx, fields)
                }

                /// Return a single field, mapped into scalars.
                pub fn returning_field(
                    self,
                    field: $crate::field::Field,
                ) -> $crate::qb::ReturningStep<C, $ctx, $crate::field::Field> {
                    $crate::qb::ReturningStep::new(self.rt, self.ctx, field)
                }
            }
        )*
    };
}
