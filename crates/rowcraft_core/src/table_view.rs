use crate::edit_session::{CommitOutcome, EditSession};
use crate::ledger::{CellEditOutcome, ChangeId};
use crate::table_browser::{FilterCondition, OrderByColumn, Pagination, TableBrowseRequest};
use crate::{
    ColumnMeta, DbError, DbKind, EditorConfig, ExecutionContext, NamedRow, QueryExecutor,
    QueryRequest, QueryResult, Row, SchemaSource, SessionError, TableRef, Value, ViewError,
};
use log::{debug, info};

/// A view change that reloads the page and drops in-memory state.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationAction {
    GoToPage(u64),
    NextPage,
    PreviousPage,
    SetFilters(Vec<FilterCondition>),
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// The action ran and the page was reloaded.
    Applied,

    /// Pending changes exist; the action waits for `confirm_navigation`.
    NeedsConfirmation,
}

/// One page of a table plus the edit session over it.
pub struct PagedTableView {
    session: EditSession,
    request: TableBrowseRequest,
    loaded: QueryResult,
    total_rows: u64,
    confirm_discard: bool,
    pending_navigation: Option<NavigationAction>,
}

impl PagedTableView {
    /// Discover the table's columns and load the first page.
    ///
    /// Rows are ordered by the primary key when there is one so pages stay
    /// stable across reloads.
    pub async fn open(
        executor: &dyn QueryExecutor,
        schema_source: &dyn SchemaSource,
        table: TableRef,
        kind: DbKind,
        context: ExecutionContext,
        config: &EditorConfig,
    ) -> Result<Self, ViewError> {
        let database = context.database.clone().unwrap_or_default();
        let schema = table
            .schema
            .clone()
            .or_else(|| context.context.clone())
            .unwrap_or_else(|| database.clone());

        let columns = schema_source
            .get_columns(&context.connection_id, &database, &schema, &table.name)
            .await?;

        info!(
            "[VIEW] Opening {} ({} columns)",
            table.qualified_name(),
            columns.len()
        );

        let session = EditSession::from_columns(table.clone(), kind, context, &columns)
            .with_transaction_wrapping(config.wrap_commit_in_transaction);

        let order_by = session
            .primary_key_columns()
            .iter()
            .map(OrderByColumn::asc)
            .collect();

        let request = TableBrowseRequest::new(table)
            .with_pagination(Pagination::new(config.page_size))
            .with_order_by(order_by);

        let mut view = Self {
            session,
            request,
            loaded: QueryResult::empty(),
            total_rows: 0,
            confirm_discard: config.confirm_discard,
            pending_navigation: None,
        };

        view.reload(executor).await?;
        Ok(view)
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    pub fn request(&self) -> &TableBrowseRequest {
        &self.request
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.loaded.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.loaded.rows
    }

    pub fn row(&self, row_index: usize) -> Option<NamedRow> {
        self.loaded.named_row(row_index)
    }

    pub fn filters(&self) -> &[FilterCondition] {
        &self.request.filters
    }

    pub fn page(&self) -> u64 {
        self.request.pagination.page
    }

    pub fn page_size(&self) -> u32 {
        self.request.pagination.page_size
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn page_count(&self) -> u64 {
        self.request.pagination.page_count(self.total_rows)
    }

    pub fn pending_navigation(&self) -> Option<&NavigationAction> {
        self.pending_navigation.as_ref()
    }

    /// Fetch the current page and the filtered row count.
    pub async fn reload(&mut self, executor: &dyn QueryExecutor) -> Result<(), DbError> {
        let (page, total_rows) = self.fetch(executor, &self.request).await?;
        self.loaded = page;
        self.total_rows = total_rows;

        debug!(
            "[VIEW] Page {} of {} ({} rows total)",
            self.page() + 1,
            self.page_count().max(1),
            self.total_rows
        );

        Ok(())
    }

    async fn fetch(
        &self,
        executor: &dyn QueryExecutor,
        request: &TableBrowseRequest,
    ) -> Result<(QueryResult, u64), DbError> {
        let kind = self.session.kind();
        let context = self.session.context();

        let select_sql = request.build_select_sql(kind);
        debug!("[VIEW] Loading page: {}", select_sql);
        let page = executor
            .execute(&QueryRequest::new(select_sql, context))
            .await?;

        let count_sql = request.build_count_sql(kind);
        let count = executor
            .execute(&QueryRequest::new(count_sql, context))
            .await?;

        Ok((page, count.first_cell_as_count()))
    }

    fn loaded_row(&self, row_index: usize) -> Result<NamedRow, SessionError> {
        self.loaded
            .named_row(row_index)
            .ok_or(SessionError::RowNotLoaded(row_index))
    }

    /// Edit a cell of a loaded row.
    pub fn edit_cell(
        &mut self,
        row_index: usize,
        column: &str,
        value: Value,
    ) -> Result<CellEditOutcome, SessionError> {
        let row = self.loaded_row(row_index)?;
        self.session.apply_cell_edit(row_index, &row, column, value)
    }

    /// Mark a loaded row for deletion.
    pub fn delete_row(&mut self, row_index: usize) -> Result<ChangeId, SessionError> {
        let row = self.loaded_row(row_index)?;
        self.session.delete_row(row_index, &row)
    }

    /// Add a blank row shown after the loaded rows.
    pub fn insert_row(&mut self) -> Result<ChangeId, SessionError> {
        self.session.insert_row(self.loaded.row_count())
    }

    /// Request a navigation.
    ///
    /// With pending changes and confirmation enabled the action is parked
    /// until `confirm_navigation` or `cancel_navigation`.
    pub async fn navigate(
        &mut self,
        executor: &dyn QueryExecutor,
        action: NavigationAction,
    ) -> Result<NavigationDecision, ViewError> {
        if self.session.is_committing() {
            return Err(SessionError::NavigationBlocked.into());
        }

        if self.session.has_pending_changes() && self.confirm_discard {
            debug!("[VIEW] Deferring {:?} behind confirmation", action);
            self.pending_navigation = Some(action);
            return Ok(NavigationDecision::NeedsConfirmation);
        }

        self.apply_navigation(executor, &action).await?;
        Ok(NavigationDecision::Applied)
    }

    /// Discard pending changes and run the parked action.
    ///
    /// Returns false when no action was waiting. If the page fails to load
    /// the action stays parked and the changes are kept.
    pub async fn confirm_navigation(
        &mut self,
        executor: &dyn QueryExecutor,
    ) -> Result<bool, ViewError> {
        if self.session.is_committing() {
            return Err(SessionError::NavigationBlocked.into());
        }

        let Some(action) = self.pending_navigation.clone() else {
            return Ok(false);
        };

        self.apply_navigation(executor, &action).await?;
        self.pending_navigation = None;
        Ok(true)
    }

    /// Drop the parked action and keep pending changes.
    pub fn cancel_navigation(&mut self) -> Option<NavigationAction> {
        self.pending_navigation.take()
    }

    /// Load the page the action points at, then discard pending changes and
    /// switch to it. A failed load leaves the view and the ledger as they were.
    async fn apply_navigation(
        &mut self,
        executor: &dyn QueryExecutor,
        action: &NavigationAction,
    ) -> Result<(), ViewError> {
        let mut request = self.request.clone();
        let pagination = request.pagination;
        let last_page = self.page_count().saturating_sub(1);

        match action {
            NavigationAction::GoToPage(page) => {
                request.pagination = pagination.with_page((*page).min(last_page));
            }
            NavigationAction::NextPage => {
                if pagination.has_next_page(self.total_rows) {
                    request.pagination = pagination.with_page(pagination.page + 1);
                }
            }
            NavigationAction::PreviousPage => {
                request.pagination = pagination.with_page(pagination.page.saturating_sub(1));
            }
            NavigationAction::SetFilters(filters) => {
                request.filters = filters.clone();
                request.pagination = pagination.with_page(0);
            }
            NavigationAction::Refresh => {}
        }

        let (page, total_rows) = self.fetch(executor, &request).await?;

        self.session.discard_all()?;
        self.request = request;
        self.loaded = page;
        self.total_rows = total_rows;

        debug!(
            "[VIEW] Moved to page {} of {} ({} rows total)",
            self.page() + 1,
            self.page_count().max(1),
            self.total_rows
        );

        Ok(())
    }

    /// Commit pending changes, then reload so the page shows server state.
    pub async fn commit(&mut self, executor: &dyn QueryExecutor) -> Result<CommitOutcome, ViewError> {
        let outcome = self.session.commit(executor).await?;

        if let CommitOutcome::Committed { .. } = outcome {
            self.reload(executor).await?;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnDetail;
    use crate::table_browser::FilterOperator;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves a fixed page and count; records every statement.
    struct PageExecutor {
        total: i64,
        executed: Mutex<Vec<String>>,
    }

    impl PageExecutor {
        fn new(total: i64) -> Self {
            Self {
                total,
                executed: Mutex::new(Vec::new()),
            }
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }

        fn last_select(&self) -> Option<String> {
            self.executed()
                .into_iter()
                .rev()
                .find(|sql| sql.starts_with("SELECT *"))
        }
    }

    #[async_trait]
    impl QueryExecutor for PageExecutor {
        async fn execute(&self, request: &QueryRequest) -> Result<QueryResult, DbError> {
            self.executed.lock().unwrap().push(request.sql.clone());

            if request.sql.starts_with("SELECT COUNT(*)") {
                return Ok(QueryResult::table(
                    vec![ColumnMeta {
                        name: "count".to_string(),
                        type_name: "int8".to_string(),
                        nullable: false,
                    }],
                    vec![vec![Value::Int(self.total)]],
                    Duration::ZERO,
                ));
            }

            if request.sql.starts_with("SELECT") {
                return Ok(QueryResult::table(
                    vec![
                        ColumnMeta {
                            name: "id".to_string(),
                            type_name: "int4".to_string(),
                            nullable: false,
                        },
                        ColumnMeta {
                            name: "name".to_string(),
                            type_name: "text".to_string(),
                            nullable: true,
                        },
                    ],
                    vec![
                        vec![Value::Int(1), Value::text("Ann")],
                        vec![Value::Int(2), Value::text("Bob")],
                    ],
                    Duration::ZERO,
                ));
            }

            Ok(QueryResult::affected(1, Duration::ZERO))
        }
    }

    struct UsersSchema;

    #[async_trait]
    impl SchemaSource for UsersSchema {
        async fn get_columns(
            &self,
            _connection_id: &str,
            _database: &str,
            _schema: &str,
            _table: &str,
        ) -> Result<Vec<crate::ColumnDetail>, DbError> {
            Ok(vec![
                ColumnDetail::new("id", "int4", false).primary(),
                ColumnDetail::new("name", "text", true),
            ])
        }
    }

    async fn open_view(executor: &PageExecutor) -> PagedTableView {
        PagedTableView::open(
            executor,
            &UsersSchema,
            TableRef::with_schema("public", "users"),
            DbKind::Postgres,
            ExecutionContext::new("conn").with_database("app"),
            &EditorConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn open_loads_first_page_ordered_by_key() {
        let executor = PageExecutor::new(250);
        let view = open_view(&executor).await;

        assert_eq!(
            executor.executed(),
            vec![
                "SELECT * FROM \"public\".\"users\" ORDER BY \"id\" ASC LIMIT 100 OFFSET 0",
                "SELECT COUNT(*) FROM \"public\".\"users\"",
            ]
        );
        assert_eq!(view.total_rows(), 250);
        assert_eq!(view.page_count(), 3);
        assert_eq!(view.rows().len(), 2);
        assert!(view.session().is_editable());
    }

    #[tokio::test]
    async fn navigation_without_changes_applies_immediately() {
        let executor = PageExecutor::new(250);
        let mut view = open_view(&executor).await;

        let decision = view
            .navigate(&executor, NavigationAction::GoToPage(9))
            .await
            .unwrap();

        assert_eq!(decision, NavigationDecision::Applied);
        assert_eq!(view.page(), 2);
        assert!(executor.last_select().unwrap().ends_with("LIMIT 100 OFFSET 200"));
    }

    #[tokio::test]
    async fn navigation_with_changes_waits_for_confirmation() {
        let executor = PageExecutor::new(250);
        let mut view = open_view(&executor).await;
        view.session_mut().enter_edit_mode().unwrap();
        view.edit_cell(0, "name", Value::text("Anna")).unwrap();

        let decision = view
            .navigate(&executor, NavigationAction::NextPage)
            .await
            .unwrap();
        assert_eq!(decision, NavigationDecision::NeedsConfirmation);
        assert_eq!(view.page(), 0);
        assert!(view.session().has_pending_changes());

        assert_eq!(view.cancel_navigation(), Some(NavigationAction::NextPage));
        assert!(!view.confirm_navigation(&executor).await.unwrap());
        assert!(view.session().has_pending_changes());

        view.navigate(
            &executor,
            NavigationAction::SetFilters(vec![FilterCondition::new(
                "name",
                FilterOperator::Like,
                "A%",
            )]),
        )
        .await
        .unwrap();
        assert!(view.confirm_navigation(&executor).await.unwrap());

        assert!(!view.session().has_pending_changes());
        assert_eq!(view.filters().len(), 1);
        assert_eq!(
            executor.executed().last().map(String::as_str),
            Some("SELECT COUNT(*) FROM \"public\".\"users\" WHERE \"name\" LIKE 'A%'")
        );
    }

    #[tokio::test]
    async fn edits_target_loaded_rows_only() {
        let executor = PageExecutor::new(2);
        let mut view = open_view(&executor).await;
        view.session_mut().enter_edit_mode().unwrap();

        assert_eq!(
            view.edit_cell(5, "name", Value::text("x")),
            Err(SessionError::RowNotLoaded(5))
        );

        view.delete_row(1).unwrap();
        assert_eq!(
            view.session().preview_statements(),
            vec!["DELETE FROM \"public\".\"users\" WHERE \"id\" = 2"]
        );
    }

    #[tokio::test]
    async fn successful_commit_reloads_page() {
        let executor = PageExecutor::new(2);
        let mut view = open_view(&executor).await;
        view.session_mut().enter_edit_mode().unwrap();
        view.edit_cell(1, "name", Value::text("Bobby")).unwrap();

        let before = executor.executed().len();
        let outcome = view.commit(&executor).await.unwrap();

        assert!(matches!(outcome, CommitOutcome::Committed { statements: 1, .. }));
        let after = executor.executed();
        assert_eq!(after.len(), before + 3);
        assert_eq!(
            after[before],
            "UPDATE \"public\".\"users\" SET \"name\" = 'Bobby' WHERE \"id\" = 2"
        );
        assert!(after[before + 1].starts_with("SELECT * FROM"));
    }
}
