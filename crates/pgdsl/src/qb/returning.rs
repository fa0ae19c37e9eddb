//! RETURNING support shared by INSERT, UPDATE and DELETE.

use std::fmt;

use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::ident::SqlOptions;
use crate::qb::Runtime;
use crate::qb::projection::Projection;
use crate::qb::traits::Fetchable;

/// A mutation context that renders with an optional RETURNING list.
pub trait Statement: Clone + fmt::Debug + Send + Sync + 'static {
    fn render(&self, opts: &SqlOptions, returning: Option<&str>) -> OrmResult<String>;
}

/// A mutation with a RETURNING clause; fetches the returned rows.
pub struct ReturningStep<C, S, P> {
    rt: Runtime<C>,
    ctx: S,
    projection: P,
}

impl<C, S, P> ReturningStep<C, S, P> {
    pub(crate) fn new(rt: Runtime<C>, ctx: S, projection: P) -> Self {
        Self {
            rt,
            ctx,
            projection,
        }
    }
}

impl<C, S: Clone, P: Clone> Clone for ReturningStep<C, S, P> {
    fn clone(&self) -> Self {
        Self {
            rt: self.rt.clone(),
            ctx: self.ctx.clone(),
            projection: self.projection.clone(),
        }
    }
}

impl<C, S: fmt::Debug, P: fmt::Debug> fmt::Debug for ReturningStep<C, S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturningStep")
            .field("ctx", &self.ctx)
            .field("projection", &self.projection)
            .finish()
    }
}

impl<C, S, P> ReturningStep<C, S, P>
where
    S: Statement,
    P: Projection,
{
    fn render(&self, opts: &SqlOptions) -> OrmResult<String> {
        let returning = self.projection.returning_sql(opts)?;
        self.ctx.render(opts, Some(&returning))
    }
}

impl<C, S, P> Fetchable for ReturningStep<C, S, P>
where
    C: GenericClient,
    S: Statement,
    P: Projection,
{
    type Item = P::Item;

    fn to_sql(&self) -> OrmResult<String> {
        self.render(&self.rt.options)
    }

    async fn fetch(&self) -> OrmResult<Vec<P::Item>> {
        let sql = self.render(&self.rt.options)?;
        let output = self.rt.query(&sql).await?;
        self.projection.map_output(output)
    }

    /// The mutation still applies to every matched row; only the first returned row is kept.
    async fn fetch_one(&self) -> OrmResult<Option<P::Item>> {
        Ok(self.fetch().await?.into_iter().next())
    }
}
