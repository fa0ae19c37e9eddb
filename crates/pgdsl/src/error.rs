//! Error types for pgdsl

use thiserror::Error;

/// Result type alias for pgdsl operations
pub type OrmResult<T> = Result<T, OrmError>;

/// SQLSTATE reported by Postgres for unique constraint violations.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Error reported by a database client while running a statement.
///
/// This is the error channel of [`GenericClient`](crate::GenericClient). It keeps the
/// backend SQLSTATE so conflicts can be told apart from generic failures.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    /// Backend SQLSTATE, when the failure came from the server.
    pub code: Option<String>,
    /// Constraint name reported by the server, if any.
    pub constraint: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Underlying error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    /// Create a driver error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            constraint: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a SQLSTATE code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a constraint name.
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Whether the backend reported a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION_CODE)
    }
}

impl From<tokio_postgres::Error> for DriverError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => Self {
                code: Some(db_err.code().code().to_string()),
                constraint: db_err.constraint().map(str::to_string),
                message: db_err.message().to_string(),
                source: Some(Box::new(err)),
            },
            None => Self {
                code: None,
                constraint: None,
                message: err.to_string(),
                source: Some(Box::new(err)),
            },
        }
    }
}

/// Error types for building and running statements
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The driver rejected a statement
    #[error("{source} | query: {sql}")]
    SqlSyntax { sql: String, source: DriverError },

    /// Unique constraint violation
    #[error("Unique constraint violation: {source} | query: {sql}")]
    UniqueViolation { sql: String, source: DriverError },

    /// No serialization rule exists for the requested construct
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// `fetch_one_or_throw` found no rows
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// A converter had no mapping for a value
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Invalid builder or schema input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create a converter error
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion(message.into())
    }

    /// Create an empty result error
    pub fn empty_result() -> Self {
        Self::EmptyResult("zero rows fetched, cannot return first row".to_string())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Check if this is an empty result error
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult(_))
    }

    /// Check if this is an unsupported operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// SQL text of the statement that failed, for driver errors.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::SqlSyntax { sql, .. } | Self::UniqueViolation { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Wrap a driver failure together with the SQL that caused it.
    pub fn from_driver(sql: impl Into<String>, err: DriverError) -> Self {
        let sql = sql.into();
        if err.is_unique_violation() {
            Self::UniqueViolation { sql, source: err }
        } else {
            Self::SqlSyntax { sql, source: err }
        }
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
