mod config;
mod edit_session;
mod error;
mod execution_context;
mod identity;
mod ledger;
mod profile;
mod query;
mod schema;
mod sql_dialect;
mod sql_generation;
mod sql_query_builder;
mod table_browser;
mod table_view;
mod traits;
mod value;

pub use config::{EditorConfig, EditorConfigStore};
pub use edit_session::{CommitBatch, CommitOutcome, EditSession, execute_batch};
pub use error::{DbError, SessionError, ViewError};
pub use execution_context::ExecutionContext;
pub use identity::{IdentityHash, PrimaryKeyValues};
pub use ledger::{
    CellEdit, CellEditOutcome, ChangeId, ChangeKind, ChangeLedger, ChangeSummary,
    PendingRowChange,
};
pub use profile::DbKind;
pub use query::{ColumnMeta, NamedRow, QueryRequest, QueryResult, Row};
pub use schema::{ColumnDetail, primary_key_columns};
pub use sql_dialect::{
    MYSQL_DIALECT, MysqlDialect, POSTGRES_DIALECT, PostgresDialect, SqlDialect,
};
pub use sql_generation::{generate_commit_statements, wrap_in_transaction};
pub use sql_query_builder::SqlQueryBuilder;
pub use table_browser::{
    DEFAULT_PAGE_SIZE, FilterCondition, FilterOperator, OrderByColumn, Pagination, SortDirection,
    TableBrowseRequest, TableRef, build_filter_clause, is_valid_identifier,
};
pub use table_view::{NavigationAction, NavigationDecision, PagedTableView};
pub use traits::{QueryExecutor, SchemaSource};
pub use value::{NULL_IDENTITY_TEXT, Value};
