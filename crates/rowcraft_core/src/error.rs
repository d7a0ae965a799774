use crate::ledger::ChangeId;
use thiserror::Error;

/// Failures reported by the query boundary or local storage.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Query timed out")]
    Timeout,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DbError {
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Message shown to the user as the session's commit error.
    pub fn message(&self) -> String {
        match self {
            Self::QueryFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Operations rejected by the edit session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Table has no primary key and cannot be edited")]
    NotEditable,

    #[error("Edit mode is not active")]
    NotInEditMode,

    #[error("A commit is already in progress")]
    CommitInProgress,

    #[error("Row is marked for deletion")]
    RowPendingDeletion,

    #[error("Pending change not found: {0}")]
    ChangeNotFound(ChangeId),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Primary key column `{0}` cannot be edited on an existing row")]
    PrimaryKeyEdit(String),

    #[error("Navigation is blocked while a commit is in progress")]
    NavigationBlocked,

    #[error("Row {0} is not loaded in the current page")]
    RowNotLoaded(usize),
}

/// Failures of a paged table view: a rejected state transition or a failed
/// page load.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Db(#[from] DbError),
}
