//! In-memory client for exercising terminal calls without a database.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::client::{ColumnMeta, GenericClient, QueryOutput};
use crate::dsl::Dsl;
use crate::error::DriverError;
use crate::value::Value;

/// Records every statement and replays queued results in order. With nothing queued,
/// queries return no rows and executes report zero rows.
#[derive(Debug, Default)]
pub(crate) struct MockClient {
    executed: Mutex<Vec<String>>,
    query_results: Mutex<VecDeque<Result<QueryOutput, DriverError>>>,
    execute_results: Mutex<VecDeque<Result<u64, DriverError>>>,
}

impl MockClient {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_query(&self, result: Result<QueryOutput, DriverError>) {
        self.query_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns
            .iter()
            .map(|name| ColumnMeta::new(*name, "unknown"))
            .collect();
        self.push_query(Ok(QueryOutput::new(columns, rows)));
    }

    pub(crate) fn push_execute(&self, result: Result<u64, DriverError>) {
        self.execute_results.lock().unwrap().push_back(result);
    }

    /// Statements issued so far, oldest first.
    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn record(&self, sql: &str) {
        self.executed.lock().unwrap().push(sql.to_string());
    }
}

impl GenericClient for MockClient {
    async fn query(&self, sql: &str) -> Result<QueryOutput, DriverError> {
        self.record(sql);
        let next = self.query_results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(QueryOutput::default()))
    }

    async fn execute(&self, sql: &str) -> Result<u64, DriverError> {
        self.record(sql);
        let next = self.execute_results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(0))
    }
}

/// A quoted-identifier root over a fresh mock, plus a handle to inspect it.
pub(crate) fn mock_dsl() -> (Dsl<MockClient>, Arc<MockClient>) {
    let client = MockClient::new();
    (Dsl::from_arc(Arc::clone(&client)), client)
}
