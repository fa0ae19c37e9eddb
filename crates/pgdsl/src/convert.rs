//! Value converters attached to fields.
//!
//! A converter maps between the value user code works with and the value stored in the
//! database. For every valid `x`, `from_db(to_db(x)) == x` must hold. Null values never reach a
//! converter.

use std::fmt;
use std::sync::Arc;

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Bidirectional mapping between an application value and its database representation.
pub trait Converter: Send + Sync {
    /// Convert an application value into the value written to the database.
    fn to_db(&self, value: &Value) -> OrmResult<Value>;

    /// Convert a value read from the database back into the application value.
    fn from_db(&self, value: &Value) -> OrmResult<Value>;
}

impl fmt::Debug for dyn Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Converter")
    }
}

type ConvertFn = dyn Fn(&Value) -> OrmResult<Value> + Send + Sync;

/// Converter built from a pair of closures.
pub struct FnConverter {
    to_db: Box<ConvertFn>,
    from_db: Box<ConvertFn>,
}

impl FnConverter {
    pub fn new<T, F>(to_db: T, from_db: F) -> Self
    where
        T: Fn(&Value) -> OrmResult<Value> + Send + Sync + 'static,
        F: Fn(&Value) -> OrmResult<Value> + Send + Sync + 'static,
    {
        Self {
            to_db: Box::new(to_db),
            from_db: Box::new(from_db),
        }
    }

    /// Wrap into the shared handle fields carry.
    pub fn shared(self) -> Arc<dyn Converter> {
        Arc::new(self)
    }
}

impl Converter for FnConverter {
    fn to_db(&self, value: &Value) -> OrmResult<Value> {
        (self.to_db)(value)
    }

    fn from_db(&self, value: &Value) -> OrmResult<Value> {
        (self.from_db)(value)
    }
}

/// Discrete label ↔ code mapping, for enum-like columns.
///
/// ```ignore
/// let kind = UnionConverter::new([("first", 1), ("second", 2)]);
/// assert_eq!(kind.to_db(&"second".into())?, Value::Int(2));
/// ```
#[derive(Debug, Clone)]
pub struct UnionConverter {
    pairs: Vec<(Value, Value)>,
}

impl UnionConverter {
    pub fn new<L, C>(pairs: impl IntoIterator<Item = (L, C)>) -> Self
    where
        L: Into<Value>,
        C: Into<Value>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(label, code)| (label.into(), code.into()))
                .collect(),
        }
    }

    pub fn shared(self) -> Arc<dyn Converter> {
        Arc::new(self)
    }
}

impl Converter for UnionConverter {
    fn to_db(&self, value: &Value) -> OrmResult<Value> {
        self.pairs
            .iter()
            .find(|(label, _)| label == value)
            .map(|(_, code)| code.clone())
            .ok_or_else(|| OrmError::conversion(format!("no code mapped for label {value}")))
    }

    fn from_db(&self, value: &Value) -> OrmResult<Value> {
        self.pairs
            .iter()
            .find(|(_, code)| code == value)
            .map(|(label, _)| label.clone())
            .ok_or_else(|| OrmError::conversion(format!("no label mapped for code {value}")))
    }
}

/// Stores JSON documents in text columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl Converter for JsonConverter {
    fn to_db(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Json(json) => Ok(Value::Text(json.to_string())),
            other => Ok(other.clone()),
        }
    }

    fn from_db(&self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Text(text) => serde_json::from_str(text)
                .map(Value::Json)
                .map_err(|e| OrmError::conversion(format!("invalid JSON document: {e}"))),
            other => Ok(other.clone()),
        }
    }
}
