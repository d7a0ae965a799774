use crate::{ColumnDetail, DbError, QueryRequest, QueryResult};
use async_trait::async_trait;

/// Runs SQL against a remote database.
///
/// The edit engine never reasons about transport, authentication or pooling;
/// implementations own all of that. Any backend failure is reported as a
/// `DbError` whose message is surfaced to the user verbatim.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, DbError>;
}

/// Read-only column metadata lookup.
///
/// Consumed only to learn which columns form the primary key.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn get_columns(
        &self,
        connection_id: &str,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnDetail>, DbError>;
}
