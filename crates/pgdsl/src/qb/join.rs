//! Join clauses.

use crate::condition::{Condition, conditions_sql};
use crate::error::{OrmError, OrmResult};
use crate::ident::SqlOptions;
use crate::table::Table;

/// Supported join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::RightOuter => "RIGHT OUTER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// A joined table with its predicate list.
#[derive(Debug, Clone)]
pub(crate) struct JoinClause {
    pub(crate) table: Table,
    pub(crate) kind: JoinKind,
    pub(crate) conditions: Vec<Condition>,
}

impl JoinClause {
    pub(crate) fn new(kind: JoinKind, table: Table, conditions: Vec<Condition>) -> Self {
        Self {
            table,
            kind,
            conditions,
        }
    }

    pub(crate) fn to_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        let table = self.table.to_sql(opts)?;
        let on = conditions_sql(&self.conditions, opts)?;
        match (self.kind, on.is_empty()) {
            (JoinKind::Cross, true) => Ok(format!("{} {}", self.kind.as_sql(), table)),
            (JoinKind::Cross, false) => Err(OrmError::unsupported(
                "CROSS JOIN does not take an ON condition",
            )),
            (kind, true) => Err(OrmError::unsupported(format!(
                "{} without an ON condition",
                kind.as_sql()
            ))),
            (kind, false) => Ok(format!("{} {} ON {}", kind.as_sql(), table, on)),
        }
    }
}

/// Contexts that accept joins.
pub(crate) trait JoinTarget {
    fn push_join(&mut self, join: JoinClause);

    /// The most recent join, completed by a following `on`.
    fn last_join_mut(&mut self) -> Option<&mut JoinClause>;
}

pub(crate) fn joins_sql(joins: &[JoinClause], opts: &SqlOptions) -> OrmResult<String> {
    let mut sql = String::new();
    for join in joins {
        sql.push(' ');
        sql.push_str(&join.to_sql(opts)?);
    }
    Ok(sql)
}
