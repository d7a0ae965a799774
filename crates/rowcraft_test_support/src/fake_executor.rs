use async_trait::async_trait;
use rowcraft_core::{
    ColumnDetail, DbError, QueryExecutor, QueryRequest, QueryResult, SchemaSource,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum FakeQueryOutcome {
    Success(QueryResult),
    Error(String),
    Timeout,
}

impl FakeQueryOutcome {
    fn to_result(&self) -> Result<QueryResult, DbError> {
        match self {
            Self::Success(result) => Ok(result.clone()),
            Self::Error(message) => Err(DbError::query_failed(message.clone())),
            Self::Timeout => Err(DbError::Timeout),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeExecutorStats {
    pub executed_requests: Vec<QueryRequest>,
}

impl FakeExecutorStats {
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed_requests
            .iter()
            .map(|request| request.sql.clone())
            .collect()
    }
}

#[derive(Default)]
struct FakeExecutorState {
    query_outcomes: RwLock<HashMap<String, FakeQueryOutcome>>,
    prefix_outcomes: RwLock<Vec<(String, FakeQueryOutcome)>>,
    default_outcome: RwLock<Option<FakeQueryOutcome>>,
    executed_requests: Mutex<Vec<QueryRequest>>,
}

/// Scripted `QueryExecutor`.
///
/// Lookup order: exact SQL, then the first matching prefix, then the default
/// outcome. Without a default every statement reports one affected row.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<FakeExecutorState>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_result(self, sql: impl Into<String>, result: QueryResult) -> Self {
        self.set_query_outcome(sql, FakeQueryOutcome::Success(result));
        self
    }

    pub fn with_query_error(self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.set_query_outcome(sql, FakeQueryOutcome::Error(message.into()));
        self
    }

    pub fn with_prefix_result(self, prefix: impl Into<String>, result: QueryResult) -> Self {
        rwlock_write(&self.state.prefix_outcomes)
            .push((prefix.into(), FakeQueryOutcome::Success(result)));
        self
    }

    pub fn with_prefix_error(self, prefix: impl Into<String>, message: impl Into<String>) -> Self {
        rwlock_write(&self.state.prefix_outcomes)
            .push((prefix.into(), FakeQueryOutcome::Error(message.into())));
        self
    }

    pub fn with_default_result(self, result: QueryResult) -> Self {
        *rwlock_write(&self.state.default_outcome) = Some(FakeQueryOutcome::Success(result));
        self
    }

    pub fn with_default_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.default_outcome) = Some(FakeQueryOutcome::Error(message.into()));
        self
    }

    pub fn set_query_outcome(&self, sql: impl Into<String>, outcome: FakeQueryOutcome) {
        rwlock_write(&self.state.query_outcomes).insert(sql.into(), outcome);
    }

    pub fn clear_query_outcome(&self, sql: &str) {
        rwlock_write(&self.state.query_outcomes).remove(sql);
    }

    pub fn stats(&self) -> FakeExecutorStats {
        FakeExecutorStats {
            executed_requests: mutex_lock(&self.state.executed_requests).clone(),
        }
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.stats().executed_sql()
    }

    pub fn reset_stats(&self) {
        mutex_lock(&self.state.executed_requests).clear();
    }

    fn outcome_for(&self, sql: &str) -> Option<FakeQueryOutcome> {
        if let Some(outcome) = rwlock_read(&self.state.query_outcomes).get(sql) {
            return Some(outcome.clone());
        }

        if let Some((_, outcome)) = rwlock_read(&self.state.prefix_outcomes)
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
        {
            return Some(outcome.clone());
        }

        rwlock_read(&self.state.default_outcome).clone()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, DbError> {
        mutex_lock(&self.state.executed_requests).push(request.clone());
        log::debug!("[FAKE] {}", request.sql);

        match self.outcome_for(&request.sql) {
            Some(outcome) => outcome.to_result(),
            None => Ok(QueryResult::affected(1, Duration::ZERO)),
        }
    }
}

/// `SchemaSource` serving fixed column lists by table name.
#[derive(Clone, Default)]
pub struct FakeSchemaSource {
    tables: Arc<RwLock<HashMap<String, Vec<ColumnDetail>>>>,
    error: Arc<RwLock<Option<String>>>,
    lookups: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl FakeSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: impl Into<String>, columns: Vec<ColumnDetail>) -> Self {
        rwlock_write(&self.tables).insert(table.into(), columns);
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.error) = Some(message.into());
        self
    }

    /// `(database, schema, table)` of every lookup so far.
    pub fn lookups(&self) -> Vec<(String, String, String)> {
        mutex_lock(&self.lookups).clone()
    }
}

#[async_trait]
impl SchemaSource for FakeSchemaSource {
    async fn get_columns(
        &self,
        _connection_id: &str,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnDetail>, DbError> {
        mutex_lock(&self.lookups).push((
            database.to_string(),
            schema.to_string(),
            table.to_string(),
        ));

        if let Some(message) = rwlock_read(&self.error).clone() {
            return Err(DbError::query_failed(message));
        }

        Ok(rwlock_read(&self.tables)
            .get(table)
            .cloned()
            .unwrap_or_default())
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}
