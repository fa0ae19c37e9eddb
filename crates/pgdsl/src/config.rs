//! Runtime configuration for a [`Dsl`](crate::Dsl).

use crate::error::{OrmError, OrmResult};
use crate::ident::SqlOptions;
use crate::qb::DEFAULT_SQL_LOG_LIMIT;

/// Default maximum number of pooled connections.
pub const DEFAULT_MAX_POOL_SIZE: usize = 16;

/// Environment variable holding the connection URL.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Environment variable overriding the pool size.
pub const MAX_POOL_SIZE_ENV: &str = "PGDSL_MAX_POOL_SIZE";

/// Connection and rendering settings.
///
/// ```ignore
/// let config = DslConfig::new("postgres://localhost/app")
///     .max_pool_size(8)
///     .sql_log_limit(None);
/// let dsl = Dsl::connect(&config)?;
/// ```
#[derive(Debug, Clone)]
pub struct DslConfig {
    pub database_url: String,
    pub max_pool_size: usize,
    pub options: SqlOptions,
    /// Characters of SQL kept in log events; `None` logs statements in full.
    pub sql_log_limit: Option<usize>,
}

impl DslConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            options: SqlOptions::quoted(),
            sql_log_limit: Some(DEFAULT_SQL_LOG_LIMIT),
        }
    }

    /// Read `DATABASE_URL` and the optional `PGDSL_MAX_POOL_SIZE`.
    pub fn from_env() -> OrmResult<Self> {
        let url = std::env::var(DATABASE_URL_ENV)
            .map_err(|_| OrmError::validation(format!("{DATABASE_URL_ENV} is not set")))?;
        let config = Self::new(url);
        match std::env::var(MAX_POOL_SIZE_ENV) {
            Ok(raw) => Ok(config.max_pool_size(parse_pool_size(&raw)?)),
            Err(_) => Ok(config),
        }
    }

    pub fn max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn options(mut self, options: SqlOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sql_log_limit(mut self, limit: Option<usize>) -> Self {
        self.sql_log_limit = limit;
        self
    }
}

fn parse_pool_size(raw: &str) -> OrmResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(OrmError::validation(format!(
            "{MAX_POOL_SIZE_ENV} must be a positive integer, got '{raw}'"
        ))),
    }
}
