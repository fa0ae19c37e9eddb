//! Field and expression algebra.
//!
//! A [`Field`] is an immutable scalar-expression node. Nodes are reference counted, so cloning a
//! field (or a tree containing it) never deep-copies. Comparison and arithmetic methods build new
//! [`Condition`] or [`Field`] nodes without evaluating anything.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::condition::Condition;
use crate::convert::Converter;
use crate::error::{OrmError, OrmResult};
use crate::ident::SqlOptions;
use crate::qb::SqlSource;
use crate::table::{Table, ValuesTable};
use crate::value::Value;

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Avg,
    Min,
    Max,
    Sum,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Avg => "avg",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Sum => "sum",
        }
    }
}

#[derive(Debug)]
enum FieldNode {
    Named(String),
    Raw(String),
    Column { table: Table, column: String },
    Aliased { inner: Field, alias: String },
    Binary { left: Operand, op: &'static str, right: Operand },
    Prefix { op: &'static str, operand: Operand },
    Aggregate { kind: Aggregate, inner: Option<Field> },
    Tuple(Vec<Field>),
    Excluded(Option<String>),
}

/// A typed SQL scalar expression with an optional value converter.
#[derive(Clone)]
pub struct Field {
    node: Arc<FieldNode>,
    converter: Option<Arc<dyn Converter>>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("node", &self.node)
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

/// Either side of a binary expression or comparison: another field or a literal value.
#[derive(Debug, Clone)]
pub enum Operand {
    Field(Field),
    Value(Value),
}

impl Operand {
    pub(crate) fn converter(&self) -> Option<&Arc<dyn Converter>> {
        match self {
            Operand::Field(f) => f.converter.as_ref(),
            Operand::Value(_) => None,
        }
    }
}

impl From<Field> for Operand {
    fn from(f: Field) -> Self {
        Operand::Field(f)
    }
}

impl From<&Field> for Operand {
    fn from(f: &Field) -> Self {
        Operand::Field(f.clone())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Operand::Value(v.into())
    }
}

macro_rules! impl_operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_operand_from_value!(
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    &str,
    String,
    &String,
    NaiveDate,
    NaiveDateTime,
    DateTime<Utc>,
    Uuid,
    serde_json::Value,
);

impl Field {
    fn from_node(node: FieldNode, converter: Option<Arc<dyn Converter>>) -> Self {
        Self {
            node: Arc::new(node),
            converter,
        }
    }

    /// A bare identifier, quoted according to the options.
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_node(FieldNode::Named(name.into()), None)
    }

    /// A pre-formed SQL fragment emitted verbatim, e.g. `now()`.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::from_node(FieldNode::Raw(sql.into()), None)
    }

    /// A column owned by `table`.
    pub fn column(table: &Table, column: impl Into<String>) -> Self {
        Self::from_node(
            FieldNode::Column {
                table: table.clone(),
                column: column.into(),
            },
            None,
        )
    }

    /// An ordered group of fields, rendered as `(a, b)`.
    pub fn tuple(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::from_node(FieldNode::Tuple(fields.into_iter().collect()), None)
    }

    /// `count(*)`.
    pub fn count_all() -> Self {
        Self::from_node(
            FieldNode::Aggregate {
                kind: Aggregate::Count,
                inner: None,
            },
            None,
        )
    }

    /// The proposed-insert row inside an upsert `SET` clause.
    ///
    /// With no column name the assigned column's own name is used.
    pub fn excluded(column: Option<String>) -> Self {
        Self::from_node(FieldNode::Excluded(column), None)
    }

    /// Attach a converter.
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// The converter owned by this field, if any.
    pub fn converter(&self) -> Option<&Arc<dyn Converter>> {
        self.converter.as_ref()
    }

    /// Alias this expression. Aliasing an aliased field rewraps the original expression.
    pub fn alias(&self, alias: impl Into<String>) -> Field {
        let inner = match &*self.node {
            FieldNode::Aliased { inner, .. } => inner.clone(),
            _ => self.clone(),
        };
        Self::from_node(
            FieldNode::Aliased {
                inner,
                alias: alias.into(),
            },
            self.converter.clone(),
        )
    }

    /// The alias, when this field is aliased.
    pub fn alias_name(&self) -> Option<&str> {
        match &*self.node {
            FieldNode::Aliased { alias, .. } => Some(alias),
            _ => None,
        }
    }

    pub(crate) fn excluded_target(&self) -> Option<Option<&str>> {
        match &*self.node {
            FieldNode::Excluded(column) => Some(column.as_deref()),
            _ => None,
        }
    }

    /// Render as a projection item, including the alias if any.
    pub fn to_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        match &*self.node {
            FieldNode::Aliased { inner, alias } => {
                Ok(format!("{} as {}", inner.expr_sql(opts)?, opts.ident(alias)))
            }
            _ => self.expr_sql(opts),
        }
    }

    /// The addressable name of this expression: its alias if aliased, else its SQL.
    pub fn name(&self, opts: &SqlOptions) -> OrmResult<String> {
        match &*self.node {
            FieldNode::Aliased { alias, .. } => Ok(opts.ident(alias)),
            _ => self.expr_sql(opts),
        }
    }

    /// The unqualified column name, used by INSERT column lists, SET and RETURNING.
    pub fn column_name(&self, opts: &SqlOptions) -> OrmResult<String> {
        match &*self.node {
            FieldNode::Column { column, .. } => Ok(opts.ident(column)),
            FieldNode::Named(name) => Ok(opts.ident(name)),
            FieldNode::Aliased { alias, .. } => Ok(opts.ident(alias)),
            _ => self.expr_sql(opts),
        }
    }

    /// Render as a scalar expression, ignoring any alias.
    pub(crate) fn expr_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        match &*self.node {
            FieldNode::Named(name) => Ok(opts.ident(name)),
            FieldNode::Raw(sql) => Ok(sql.clone()),
            FieldNode::Column { table, column } => {
                Ok(format!("{}.{}", table.reference(opts), opts.ident(column)))
            }
            FieldNode::Aliased { inner, .. } => inner.expr_sql(opts),
            FieldNode::Binary { left, op, right } => Ok(format!(
                "{} {} {}",
                operand_sql(left, opts)?,
                op,
                operand_sql(right, opts)?
            )),
            FieldNode::Prefix { op, operand } => Ok(format!("{}{}", op, operand_sql(operand, opts)?)),
            FieldNode::Aggregate { kind, inner } => match inner {
                Some(inner) => Ok(format!("{}({})", kind.as_str(), inner.expr_sql(opts)?)),
                None => Ok(format!("{}(*)", kind.as_str())),
            },
            FieldNode::Tuple(fields) => {
                let parts = fields
                    .iter()
                    .map(|f| f.expr_sql(opts))
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(format!("({})", parts.join(", ")))
            }
            FieldNode::Excluded(_) => Err(OrmError::unsupported(
                "excluded() is only valid inside an upsert SET clause",
            )),
        }
    }

    fn is_compound(&self) -> bool {
        matches!(&*self.node, FieldNode::Binary { .. } | FieldNode::Prefix { .. })
    }

    fn binary(&self, op: &'static str, right: Operand) -> Field {
        // Left operand wins when both sides carry a converter.
        let converter = self.converter.clone().or_else(|| right.converter().cloned());
        Self::from_node(
            FieldNode::Binary {
                left: Operand::Field(self.clone()),
                op,
                right,
            },
            converter,
        )
    }

    fn aggregate(&self, kind: Aggregate, keep_converter: bool) -> Field {
        let converter = if keep_converter {
            self.converter.clone()
        } else {
            None
        };
        Self::from_node(
            FieldNode::Aggregate {
                kind,
                inner: Some(self.clone()),
            },
            converter,
        )
    }

    // ==================== Comparisons ====================

    pub fn eq(&self, other: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), "=", other.into())
    }

    pub fn ne(&self, other: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), "<>", other.into())
    }

    pub fn lt(&self, other: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), "<", other.into())
    }

    pub fn le(&self, other: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), "<=", other.into())
    }

    pub fn gt(&self, other: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), ">", other.into())
    }

    pub fn ge(&self, other: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), ">=", other.into())
    }

    pub fn like(&self, pattern: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), "LIKE", pattern.into())
    }

    pub fn ilike(&self, pattern: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), "ILIKE", pattern.into())
    }

    /// Compare with an arbitrary operator. Unknown operators fail at serialization.
    pub fn operator(&self, op: &str, other: impl Into<Operand>) -> Condition {
        Condition::compare(self.clone(), op, other.into())
    }

    pub fn is_null(&self) -> Condition {
        Condition::unary(self.clone(), "IS NULL")
    }

    pub fn is_not_null(&self) -> Condition {
        Condition::unary(self.clone(), "IS NOT NULL")
    }

    /// `IN` over a literal list. Values are written through this field's converter.
    pub fn in_list<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        let source = ValuesTable::list(values, self.converter.clone());
        Condition::membership(self.clone(), false, Arc::new(source))
    }

    pub fn not_in_list<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        let source = ValuesTable::list(values, self.converter.clone());
        Condition::membership(self.clone(), true, Arc::new(source))
    }

    /// `IN` over a subquery.
    pub fn in_query<Q: SqlSource + Clone + 'static>(&self, query: &Q) -> Condition {
        Condition::membership(self.clone(), false, Arc::new(query.clone()))
    }

    pub fn not_in_query<Q: SqlSource + Clone + 'static>(&self, query: &Q) -> Condition {
        Condition::membership(self.clone(), true, Arc::new(query.clone()))
    }

    // ==================== Arithmetic ====================

    pub fn add(&self, other: impl Into<Operand>) -> Field {
        self.binary("+", other.into())
    }

    pub fn subtract(&self, other: impl Into<Operand>) -> Field {
        self.binary("-", other.into())
    }

    pub fn multiply(&self, other: impl Into<Operand>) -> Field {
        self.binary("*", other.into())
    }

    pub fn divide(&self, other: impl Into<Operand>) -> Field {
        self.binary("/", other.into())
    }

    pub fn modulo(&self, other: impl Into<Operand>) -> Field {
        self.binary("%", other.into())
    }

    pub fn concat(&self, other: impl Into<Operand>) -> Field {
        self.binary("||", other.into())
    }

    // ==================== Bitwise ====================

    pub fn bit_and(&self, other: impl Into<Operand>) -> Field {
        self.binary("&", other.into())
    }

    pub fn bit_or(&self, other: impl Into<Operand>) -> Field {
        self.binary("|", other.into())
    }

    pub fn bit_xor(&self, other: impl Into<Operand>) -> Field {
        self.binary("#", other.into())
    }

    pub fn bit_not(&self) -> Field {
        Self::from_node(
            FieldNode::Prefix {
                op: "~",
                operand: Operand::Field(self.clone()),
            },
            self.converter.clone(),
        )
    }

    pub fn bit_nand(&self, other: impl Into<Operand>) -> Field {
        self.bit_and(other).bit_not()
    }

    pub fn bit_nor(&self, other: impl Into<Operand>) -> Field {
        self.bit_or(other).bit_not()
    }

    pub fn bit_xnor(&self, other: impl Into<Operand>) -> Field {
        self.bit_xor(other).bit_not()
    }

    pub fn shift_left(&self, other: impl Into<Operand>) -> Field {
        self.binary("<<", other.into())
    }

    pub fn shift_right(&self, other: impl Into<Operand>) -> Field {
        self.binary(">>", other.into())
    }

    // ==================== Aggregates ====================

    pub fn count(&self) -> Field {
        self.aggregate(Aggregate::Count, false)
    }

    pub fn avg(&self) -> Field {
        self.aggregate(Aggregate::Avg, false)
    }

    pub fn sum(&self) -> Field {
        self.aggregate(Aggregate::Sum, false)
    }

    pub fn min(&self) -> Field {
        self.aggregate(Aggregate::Min, true)
    }

    pub fn max(&self) -> Field {
        self.aggregate(Aggregate::Max, true)
    }

    // ==================== Ordering ====================

    pub fn asc(&self) -> OrderField {
        OrderField::new(self.clone(), Some(Direction::Asc))
    }

    pub fn desc(&self) -> OrderField {
        OrderField::new(self.clone(), Some(Direction::Desc))
    }
}

fn operand_sql(operand: &Operand, opts: &SqlOptions) -> OrmResult<String> {
    match operand {
        Operand::Field(f) if f.is_compound() => Ok(format!("({})", f.expr_sql(opts)?)),
        Operand::Field(f) => f.expr_sql(opts),
        Operand::Value(v) => Ok(v.to_literal()),
    }
}

/// Render a literal through a converter. Null stays `null` and skips the converter.
pub(crate) fn value_sql(value: &Value, converter: Option<&Arc<dyn Converter>>) -> OrmResult<String> {
    match (value, converter) {
        (Value::Null, _) => Ok(value.to_literal()),
        (_, Some(conv)) => Ok(conv.to_db(value)?.to_literal()),
        (_, None) => Ok(value.to_literal()),
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// An ORDER BY term. Without a direction no `ASC`/`DESC` token is emitted.
#[derive(Debug, Clone)]
pub struct OrderField {
    pub field: Field,
    pub direction: Option<Direction>,
}

impl OrderField {
    pub fn new(field: Field, direction: Option<Direction>) -> Self {
        Self { field, direction }
    }

    pub(crate) fn to_sql(&self, opts: &SqlOptions) -> OrmResult<String> {
        let name = self.field.name(opts)?;
        Ok(match self.direction {
            Some(dir) => format!("{} {}", name, dir.as_sql()),
            None => name,
        })
    }
}

impl From<Field> for OrderField {
    fn from(field: Field) -> Self {
        OrderField::new(field, None)
    }
}

impl From<&Field> for OrderField {
    fn from(field: &Field) -> Self {
        OrderField::new(field.clone(), None)
    }
}

impl From<(Field, Direction)> for OrderField {
    fn from((field, direction): (Field, Direction)) -> Self {
        OrderField::new(field, Some(direction))
    }
}
