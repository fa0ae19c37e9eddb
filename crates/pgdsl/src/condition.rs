//! Condition (predicate) algebra.
//!
//! `And`/`Or` are the only combinators. Their rendering rule:
//! - no children (or only children that render empty): empty string
//! - one child: the child, unparenthesized
//! - two or more: `(a AND b ...)`
//!
//! Callers omit the `WHERE`/`ON` keyword when a condition list renders empty.

use std::sync::Arc;

use crate::error::{OrmError, OrmResult};
use crate::field::{Field, Operand, value_sql};
use crate::ident::SqlOptions;
use crate::qb::SqlSource;
use crate::table::{FieldMap, FieldValues};

/// Comparison operators accepted by [`Field::operator`].
const COMPARE_OPERATORS: &[&str] = &[
    "=",
    "<>",
    "!=",
    "<",
    "<=",
    ">",
    ">=",
    "LIKE",
    "NOT LIKE",
    "ILIKE",
    "NOT ILIKE",
    "SIMILAR TO",
    "NOT SIMILAR TO",
    "IS DISTINCT FROM",
    "IS NOT DISTINCT FROM",
    "~",
    "~*",
    "!~",
    "!~*",
    "@>",
    "<@",
    "&&",
];

#[derive(Debug)]
enum ConditionNode {
    Raw(String),
    Compare {
        left: Field,
        op: String,
        right: Operand,
    },
    Unary {
        left: Field,
        op: &'static str,
    },
    Membership {
        left: Field,
        negated: bool,
        source: Arc<dyn SqlSource>,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Condition),
}

/// A boolean predicate node. Cheap to clone; nodes are shared.
#[derive(Debug, Clone)]
pub struct Condition(Arc<ConditionNode>);

impl Condition {
    fn from_node(node: ConditionNode) -> Self {
        Self(Arc::new(node))
    }

    /// Raw SQL predicate fragment, emitted verbatim.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::from_node(ConditionNode::Raw(sql.into()))
    }

    pub(crate) fn compare(left: Field, op: &str, right: Operand) -> Self {
        Self::from_node(ConditionNode::Compare {
            left,
            op: op.trim().to_ascii_uppercase(),
            right,
        })
    }

    pub(crate) fn unary(left: Field, op: &'static str) -> Self {
        Self::from_node(ConditionNode::Unary { left, op })
    }

    pub(crate) fn membership(left: Field, negated: bool, source: Arc<dyn SqlSource>) -> Self {
        Self::from_node(ConditionNode::Membership {
            left,
            negated,
            source,
        })
    }

    /// Combine with AND.
    pub fn and(conditions: impl IntoConditions) -> Self {
        Self::from_node(ConditionNode::And(conditions.into_conditions()))
    }

    /// Combine with OR.
    pub fn or(conditions: impl IntoConditions) -> Self {
        Self::from_node(ConditionNode::Or(conditions.into_conditions()))
    }

    /// Negate. Renders empty when the inner condition does.
    pub fn not(condition: Condition) -> Self {
        Self::from_node(ConditionNode::Not(condition))
    }

    /// Render as a SQL boolean expression.
    pub fn to_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        match &*self.0 {
            ConditionNode::Raw(sql) => Ok(sql.clone()),
            ConditionNode::Compare { left, op, right } => {
                if !COMPARE_OPERATORS.contains(&op.as_str()) {
                    return Err(OrmError::unsupported(format!(
                        "comparison operator '{op}'"
                    )));
                }
                let right_sql = match right {
                    Operand::Field(f) => f.expr_sql(opts)?,
                    // Literals go through the left side's converter.
                    Operand::Value(v) => value_sql(v, left.converter())?,
                };
                Ok(format!("{} {} {}", left.expr_sql(opts)?, op, right_sql))
            }
            ConditionNode::Unary { left, op } => Ok(format!("{} {}", left.expr_sql(opts)?, op)),
            ConditionNode::Membership {
                left,
                negated,
                source,
            } => {
                if source.is_empty_list() {
                    return Ok(if *negated { "1=1" } else { "1=0" }.to_string());
                }
                let keyword = if *negated { "NOT IN" } else { "IN" };
                Ok(format!(
                    "{} {} ({})",
                    left.expr_sql(opts)?,
                    keyword,
                    source.membership_sql(opts)?
                ))
            }
            ConditionNode::And(children) => join_conditions(children, " AND ", opts),
            ConditionNode::Or(children) => join_conditions(children, " OR ", opts),
            ConditionNode::Not(inner) => {
                let sql = inner.to_sql(opts)?;
                if sql.is_empty() {
                    Ok(sql)
                } else {
                    Ok(format!("NOT ({sql})"))
                }
            }
        }
    }
}

fn join_conditions(children: &[Condition], sep: &str, opts: &SqlOptions) -> OrmResult<String> {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        let sql = child.to_sql(opts)?;
        if !sql.is_empty() {
            parts.push(sql);
        }
    }
    Ok(match parts.len() {
        0 => String::new(),
        1 => parts.remove(0),
        _ => format!("({})", parts.join(sep)),
    })
}

/// Render a condition list as an implicit AND, empty when nothing renders.
pub(crate) fn conditions_sql(conditions: &[Condition], opts: &SqlOptions) -> OrmResult<String> {
    join_conditions(conditions, " AND ", opts)
}

/// Build one comparison per key of `values`.
///
/// When `fields` is given each key must name one of its fields (and that field's converter is
/// used); unknown keys are rejected. Without a field map a bare-name field is synthesized.
pub fn conditions_from_values(
    values: &FieldValues,
    op: &str,
    fields: Option<&FieldMap>,
) -> OrmResult<Vec<Condition>> {
    values
        .iter()
        .map(|(key, value)| {
            let field = match fields {
                Some(map) => map.get(key).cloned().ok_or_else(|| {
                    OrmError::validation(format!("unknown field '{key}' in condition values"))
                })?,
                None => Field::named(key),
            };
            Ok(Condition::compare(field, op, value.clone()))
        })
        .collect()
}

/// Conversion into an ordered list of conditions.
///
/// Implemented for a single condition, vectors, arrays and slices.
pub trait IntoConditions {
    fn into_conditions(self) -> Vec<Condition>;
}

impl IntoConditions for Condition {
    fn into_conditions(self) -> Vec<Condition> {
        vec![self]
    }
}

impl IntoConditions for &Condition {
    fn into_conditions(self) -> Vec<Condition> {
        vec![self.clone()]
    }
}

impl IntoConditions for Vec<Condition> {
    fn into_conditions(self) -> Vec<Condition> {
        self
    }
}

impl IntoConditions for &[Condition] {
    fn into_conditions(self) -> Vec<Condition> {
        self.to_vec()
    }
}

impl<const N: usize> IntoConditions for [Condition; N] {
    fn into_conditions(self) -> Vec<Condition> {
        self.into()
    }
}

impl IntoConditions for Option<Condition> {
    fn into_conditions(self) -> Vec<Condition> {
        self.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::UnionConverter;
    use crate::table::Table;

    fn q() -> SqlOptions {
        SqlOptions::quoted()
    }

    #[test]
    fn combinator_arity_rules() {
        let a = Field::named("a").eq(1);
        let b = Field::named("b").eq(2);
        assert_eq!(Condition::and(Vec::new()).to_sql(&q()).unwrap(), "");
        assert_eq!(Condition::or(Vec::new()).to_sql(&q()).unwrap(), "");
        assert_eq!(Condition::and([a.clone()]).to_sql(&q()).unwrap(), "\"a\" = 1");
        assert_eq!(
            Condition::and([a.clone(), b.clone()]).to_sql(&q()).unwrap(),
            "(\"a\" = 1 AND \"b\" = 2)"
        );
        assert_eq!(
            Condition::or([a, b]).to_sql(&q()).unwrap(),
            "(\"a\" = 1 OR \"b\" = 2)"
        );
    }

    #[test]
    fn nested_combinators() {
        let a = Field::named("a").eq(1);
        let b = Field::named("b").eq(2);
        let c = Field::named("c").is_null();
        let tree = Condition::or([Condition::and([a, b]), c]);
        assert_eq!(
            tree.to_sql(&q()).unwrap(),
            "((\"a\" = 1 AND \"b\" = 2) OR \"c\" IS NULL)"
        );
    }

    #[test]
    fn empty_children_are_dropped() {
        let a = Field::named("a").eq(1);
        let tree = Condition::and([Condition::or(Vec::new()), a]);
        assert_eq!(tree.to_sql(&q()).unwrap(), "\"a\" = 1");
    }

    #[test]
    fn literal_strings_are_escaped() {
        let c = Field::named("name").eq("a'b");
        assert_eq!(c.to_sql(&q()).unwrap(), "\"name\" = 'a''b'");
    }

    #[test]
    fn compare_uses_left_converter() {
        let kind = Field::named("kind").with_converter(UnionConverter::new([("first", 1)]).shared());
        assert_eq!(kind.eq("first").to_sql(&q()).unwrap(), "\"kind\" = 1");
        assert_eq!(kind.eq(Option::<&str>::None).to_sql(&q()).unwrap(), "\"kind\" = null");
    }

    #[test]
    fn unknown_operator_is_unsupported() {
        let c = Field::named("a").operator("===", 1);
        assert!(c.to_sql(&q()).unwrap_err().is_unsupported());
        let c = Field::named("a").operator("not ilike", "x%");
        assert_eq!(c.to_sql(&q()).unwrap(), "\"a\" NOT ILIKE 'x%'");
    }

    #[test]
    fn membership_lists() {
        let id = Field::named("id");
        assert_eq!(id.in_list([1, 2]).to_sql(&q()).unwrap(), "\"id\" IN (1, 2)");
        assert_eq!(id.not_in_list(["a"]).to_sql(&q()).unwrap(), "\"id\" NOT IN ('a')");
        assert_eq!(id.in_list(Vec::<i32>::new()).to_sql(&q()).unwrap(), "1=0");
        assert_eq!(id.not_in_list(Vec::<i32>::new()).to_sql(&q()).unwrap(), "1=1");
    }

    #[test]
    fn membership_list_uses_converter() {
        let kind = Field::named("kind")
            .with_converter(UnionConverter::new([("first", 1), ("second", 2)]).shared());
        assert_eq!(
            kind.in_list(["first", "second"]).to_sql(&q()).unwrap(),
            "\"kind\" IN (1, 2)"
        );
    }

    #[test]
    fn negation() {
        let c = Condition::not(Field::named("a").eq(1));
        assert_eq!(c.to_sql(&q()).unwrap(), "NOT (\"a\" = 1)");
        assert_eq!(Condition::not(Condition::and(Vec::new())).to_sql(&q()).unwrap(), "");
    }

    #[test]
    fn values_to_conditions_use_declared_fields() {
        let t = Table::new("t");
        let fields = FieldMap::new()
            .with("a", t.field("a"))
            .with(
                "b",
                t.field("b")
                    .with_converter(UnionConverter::new([("two", 2)]).shared()),
            );
        let values = FieldValues::new().set("a", 1).set("b", "two");
        let conds = conditions_from_values(&values, "=", Some(&fields)).unwrap();
        assert_eq!(
            Condition::and(conds).to_sql(&q()).unwrap(),
            "(\"t\".\"a\" = 1 AND \"t\".\"b\" = 2)"
        );
    }

    #[test]
    fn values_to_conditions_reject_unknown_keys() {
        let fields = FieldMap::new().with("a", Field::named("a"));
        let values = FieldValues::new().set("nope", 1);
        let err = conditions_from_values(&values, "=", Some(&fields)).unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));

        let conds = conditions_from_values(&values, "=", None).unwrap();
        assert_eq!(conds[0].to_sql(&q()).unwrap(), "\"nope\" = 1");
    }
}
