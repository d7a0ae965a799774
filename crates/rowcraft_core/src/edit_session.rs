use crate::ledger::{CellEditOutcome, ChangeId, ChangeLedger, ChangeSummary, PendingRowChange};
use crate::sql_generation::{generate_commit_statements, wrap_in_transaction};
use crate::{
    ColumnDetail, DbKind, ExecutionContext, NamedRow, PrimaryKeyValues, QueryExecutor,
    QueryRequest, SessionError, TableRef, Value, primary_key_columns,
};
use log::{debug, error, info, warn};

/// Statements of one commit, frozen when the commit starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitBatch {
    pub statements: Vec<String>,

    /// Same context for every statement of the batch.
    pub context: ExecutionContext,

    /// Whether `statements` starts with a transaction opener.
    pub in_transaction: bool,
}

impl CommitBatch {
    /// Statements generated from the ledger, without the transaction opener
    /// and `COMMIT`.
    pub fn change_count(&self) -> usize {
        if self.in_transaction {
            self.statements.len().saturating_sub(2)
        } else {
            self.statements.len()
        }
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.statements
            .iter()
            .map(|sql| QueryRequest::new(sql.clone(), &self.context))
            .collect()
    }
}

/// How a commit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The ledger was empty; nothing ran.
    NothingToCommit,

    /// Every statement succeeded and the ledger was cleared.
    Committed { statements: usize, affected_rows: u64 },

    /// Change statement `failed_index` failed after `executed` successes.
    /// Indices skip the transaction opener, so a failing `COMMIT` reports
    /// `failed_index == executed ==` the number of changes. The ledger is
    /// untouched. Without a transaction, earlier statements stay applied.
    Failed {
        failed_index: usize,
        executed: usize,
        message: String,
    },
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, CommitOutcome::Failed { .. })
    }
}

/// Editing state of one browsed table.
///
/// States: viewing (not in edit mode), editing, committing. Owned by whoever
/// opened the table; sessions share nothing.
#[derive(Debug, Clone)]
pub struct EditSession {
    table: TableRef,
    kind: DbKind,
    context: ExecutionContext,
    columns: Vec<String>,
    primary_key_columns: Vec<String>,
    is_edit_mode: bool,
    ledger: ChangeLedger,
    is_committing: bool,
    commit_error: Option<String>,
    wrap_in_transaction: bool,
}

impl EditSession {
    pub fn new(
        table: TableRef,
        kind: DbKind,
        context: ExecutionContext,
        columns: Vec<String>,
        primary_key_columns: Vec<String>,
    ) -> Self {
        Self {
            table,
            kind,
            context,
            columns,
            primary_key_columns,
            is_edit_mode: false,
            ledger: ChangeLedger::new(),
            is_committing: false,
            commit_error: None,
            wrap_in_transaction: false,
        }
    }

    /// Session over discovered column metadata; `key == "PRI"` marks the key.
    pub fn from_columns(
        table: TableRef,
        kind: DbKind,
        context: ExecutionContext,
        columns: &[ColumnDetail],
    ) -> Self {
        let names = columns.iter().map(|c| c.name.clone()).collect();
        let primary_key = primary_key_columns(columns);

        if primary_key.is_empty() {
            debug!(
                "[EDIT] {} has no primary key, editing disabled",
                table.qualified_name()
            );
        }

        Self::new(table, kind, context, names, primary_key)
    }

    pub fn with_transaction_wrapping(mut self, enabled: bool) -> Self {
        self.wrap_in_transaction = enabled;
        self
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn kind(&self) -> DbKind {
        self.kind
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn primary_key_columns(&self) -> &[String] {
        &self.primary_key_columns
    }

    pub fn ledger(&self) -> &ChangeLedger {
        &self.ledger
    }

    pub fn pending_changes(&self) -> impl Iterator<Item = &PendingRowChange> {
        self.ledger.iter()
    }

    pub fn summary(&self) -> ChangeSummary {
        self.ledger.summary()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.ledger.is_empty()
    }

    pub fn is_editable(&self) -> bool {
        !self.primary_key_columns.is_empty()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.is_edit_mode
    }

    pub fn is_committing(&self) -> bool {
        self.is_committing
    }

    pub fn commit_error(&self) -> Option<&str> {
        self.commit_error.as_deref()
    }

    pub fn enter_edit_mode(&mut self) -> Result<(), SessionError> {
        if self.is_committing {
            return Err(SessionError::CommitInProgress);
        }
        if !self.is_editable() {
            return Err(SessionError::NotEditable);
        }

        self.is_edit_mode = true;
        Ok(())
    }

    /// Leave edit mode. Pending changes are kept; warning the user is up to
    /// the caller.
    pub fn exit_edit_mode(&mut self) -> Result<(), SessionError> {
        if self.is_committing {
            return Err(SessionError::CommitInProgress);
        }

        if self.has_pending_changes() {
            debug!(
                "[EDIT] Leaving edit mode with {} pending changes",
                self.ledger.len()
            );
        }

        self.is_edit_mode = false;
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<(), SessionError> {
        if self.is_committing {
            return Err(SessionError::CommitInProgress);
        }
        if !self.is_edit_mode {
            return Err(SessionError::NotInEditMode);
        }
        Ok(())
    }

    fn ensure_column(&self, column: &str) -> Result<(), SessionError> {
        if self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(SessionError::UnknownColumn(column.to_string()))
        }
    }

    fn capture_key(&self, row: &NamedRow) -> Result<PrimaryKeyValues, SessionError> {
        PrimaryKeyValues::from_row(&self.primary_key_columns, row).ok_or_else(|| {
            let missing = self
                .primary_key_columns
                .iter()
                .find(|c| !row.contains_key(c.as_str()))
                .cloned()
                .unwrap_or_default();
            SessionError::UnknownColumn(missing)
        })
    }

    /// Edit a cell of an existing row as loaded from the server.
    pub fn apply_cell_edit(
        &mut self,
        row_index: usize,
        row: &NamedRow,
        column: &str,
        new_value: Value,
    ) -> Result<CellEditOutcome, SessionError> {
        self.ensure_mutable()?;
        self.ensure_column(column)?;

        if self.primary_key_columns.iter().any(|c| c == column) {
            return Err(SessionError::PrimaryKeyEdit(column.to_string()));
        }

        let primary_key = self.capture_key(row)?;
        let original_value = row.get(column).cloned().unwrap_or(Value::Null);

        self.ledger
            .record_cell_edit(row_index, &primary_key, column, original_value, new_value)
    }

    /// Add a blank row with every column NULL.
    pub fn insert_row(&mut self, row_index: usize) -> Result<ChangeId, SessionError> {
        self.ensure_mutable()?;

        let template: NamedRow = self
            .columns
            .iter()
            .map(|c| (c.clone(), Value::Null))
            .collect();

        Ok(self.ledger.add_new_row(row_index, template))
    }

    /// Set a cell of a pending insert. Key columns are editable here.
    pub fn update_new_row_cell(
        &mut self,
        id: ChangeId,
        column: &str,
        value: Value,
    ) -> Result<(), SessionError> {
        self.ensure_mutable()?;
        self.ensure_column(column)?;

        if self.ledger.update_new_row_cell(id, column, value) {
            Ok(())
        } else {
            Err(SessionError::ChangeNotFound(id))
        }
    }

    pub fn delete_row(&mut self, row_index: usize, row: &NamedRow) -> Result<ChangeId, SessionError> {
        self.ensure_mutable()?;

        let primary_key = self.capture_key(row)?;
        debug!("[EDIT] Marking {} for deletion", primary_key.identity_hash());

        Ok(self
            .ledger
            .mark_row_for_deletion(row_index, &primary_key, row.clone()))
    }

    /// Drop one pending change: undoes a delete, cancels an insert, or
    /// reverts every edit of an update.
    pub fn revert_change(&mut self, id: ChangeId) -> Result<PendingRowChange, SessionError> {
        self.ensure_mutable()?;
        self.ledger
            .remove_change(id)
            .ok_or(SessionError::ChangeNotFound(id))
    }

    /// Forget every pending change and the last commit error.
    pub fn discard_all(&mut self) -> Result<(), SessionError> {
        if self.is_committing {
            return Err(SessionError::CommitInProgress);
        }

        if self.has_pending_changes() {
            info!("[EDIT] Discarding {} pending changes", self.ledger.len());
        }

        self.ledger.clear();
        self.commit_error = None;
        Ok(())
    }

    /// Value to display for a cell of a loaded row, with pending edits applied.
    pub fn display_value(&self, row: &NamedRow, column: &str) -> Option<Value> {
        let edited = self
            .capture_key(row)
            .ok()
            .and_then(|primary_key| self.ledger.edited_value(&primary_key, column).cloned());

        edited.or_else(|| row.get(column).cloned())
    }

    pub fn is_row_deleted(&self, row: &NamedRow) -> bool {
        self.capture_key(row)
            .is_ok_and(|primary_key| self.ledger.is_row_deleted(&primary_key))
    }

    /// Statements the ledger would commit right now.
    pub fn preview_statements(&self) -> Vec<String> {
        generate_commit_statements(&self.table, self.kind, &self.ledger)
    }

    /// Freeze the ledger into a batch and enter the committing state.
    ///
    /// Returns `Ok(None)` when there is nothing to commit.
    pub fn begin_commit(&mut self) -> Result<Option<CommitBatch>, SessionError> {
        if self.is_committing {
            return Err(SessionError::CommitInProgress);
        }
        if self.ledger.is_empty() {
            return Ok(None);
        }

        self.is_committing = true;
        self.commit_error = None;

        let statements = self.preview_statements();
        let in_transaction = self.wrap_in_transaction && !statements.is_empty();
        let statements = if in_transaction {
            wrap_in_transaction(self.kind, statements)
        } else {
            statements
        };

        info!(
            "[COMMIT] Starting commit of {} changes on {} ({} statements)",
            self.ledger.len(),
            self.table.qualified_name(),
            statements.len()
        );

        Ok(Some(CommitBatch {
            statements,
            context: self.context.clone(),
            in_transaction,
        }))
    }

    /// Leave the committing state with the result of a batch.
    pub fn finish_commit(&mut self, outcome: &CommitOutcome) {
        if !self.is_committing {
            warn!("[COMMIT] finish_commit called without a commit in progress");
            return;
        }

        match outcome {
            CommitOutcome::Committed {
                statements,
                affected_rows,
            } => {
                info!(
                    "[COMMIT] Committed {} statements, {} rows affected",
                    statements, affected_rows
                );
                self.ledger.clear();
                self.commit_error = None;
            }
            CommitOutcome::Failed {
                failed_index,
                message,
                ..
            } => {
                error!(
                    "[COMMIT] Statement {} failed, pending changes kept: {}",
                    failed_index, message
                );
                self.commit_error = Some(message.clone());
            }
            CommitOutcome::NothingToCommit => {}
        }

        self.is_committing = false;
    }

    /// Run the whole commit against `executor`.
    ///
    /// Execution failures never escape: they end up in `commit_error` and in
    /// the returned `CommitOutcome::Failed`.
    pub async fn commit(
        &mut self,
        executor: &dyn QueryExecutor,
    ) -> Result<CommitOutcome, SessionError> {
        let Some(batch) = self.begin_commit()? else {
            return Ok(CommitOutcome::NothingToCommit);
        };

        let outcome = execute_batch(executor, &batch).await;
        self.finish_commit(&outcome);

        Ok(outcome)
    }
}

/// Execute a batch sequentially, stopping at the first failure.
///
/// When the batch is transaction-wrapped a failure is followed by a
/// best-effort ROLLBACK whose own failure is only logged.
pub async fn execute_batch(executor: &dyn QueryExecutor, batch: &CommitBatch) -> CommitOutcome {
    let mut affected_rows = 0;
    let opener = usize::from(batch.in_transaction);

    for (index, request) in batch.requests().into_iter().enumerate() {
        debug!("[COMMIT] Executing: {}", request.sql);

        match executor.execute(&request).await {
            Ok(result) => affected_rows += result.affected_rows,
            Err(e) => {
                if batch.in_transaction && index > 0 {
                    let rollback = QueryRequest::new("ROLLBACK", &batch.context);
                    if let Err(rollback_err) = executor.execute(&rollback).await {
                        warn!("[COMMIT] Rollback failed: {}", rollback_err);
                    }
                }

                let change_index = index.saturating_sub(opener);
                return CommitOutcome::Failed {
                    failed_index: change_index,
                    executed: change_index,
                    message: e.message(),
                };
            }
        }
    }

    CommitOutcome::Committed {
        statements: batch.change_count(),
        affected_rows,
    }
}
