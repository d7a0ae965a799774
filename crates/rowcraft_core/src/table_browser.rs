use crate::sql_dialect::SqlDialect;
use crate::{DbKind, Value};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Rows per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid identifier regex"));

/// Whether a user-supplied name may be interpolated as a column identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Sort direction for ORDER BY clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Column with sort direction for ORDER BY clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByColumn {
    pub name: String,
    pub direction: SortDirection,
}

impl OrderByColumn {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Page-based pagination. Pages are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 0,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
        }
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        self.page * self.page_size as u64
    }

    /// `ceil(total_rows / page_size)`.
    pub fn page_count(&self, total_rows: u64) -> u64 {
        total_rows.div_ceil(self.page_size as u64)
    }

    pub fn is_first_page(&self) -> bool {
        self.page == 0
    }

    pub fn has_next_page(&self, total_rows: u64) -> bool {
        self.page + 1 < self.page_count(total_rows)
    }

    pub fn with_page(&self, page: u64) -> Self {
        Self {
            page,
            page_size: self.page_size,
        }
    }
}

/// Reference to a table (schema or database + name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// PostgreSQL schema, or MySQL database.
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    pub fn from_qualified(qualified_name: &str) -> Self {
        if let Some((schema, table)) = qualified_name.split_once('.') {
            Self::with_schema(schema, table)
        } else {
            Self::new(qualified_name)
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.name),
            None => self.name.clone(),
        }
    }

    /// Quoted, qualified reference in the given dialect.
    pub fn quoted(&self, dialect: &dyn SqlDialect) -> String {
        dialect.qualified_table(self.schema.as_deref(), &self.name)
    }

    pub fn quoted_for_kind(&self, kind: DbKind) -> String {
        self.quoted(kind.dialect())
    }
}

/// Comparison applied by a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::NotEq => "!=",
            FilterOperator::Lt => "<",
            FilterOperator::LtEq => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::GtEq => ">=",
            FilterOperator::Like => "LIKE",
            FilterOperator::NotLike => "NOT LIKE",
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
        }
    }

    pub fn takes_value(&self) -> bool {
        !matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }
}

/// A user-entered `column <op> value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::IsNull, Value::Null)
    }

    fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        let column = dialect.quote_identifier(&self.column);

        if self.operator.takes_value() {
            format!(
                "{} {} {}",
                column,
                self.operator.sql(),
                dialect.value_to_literal(&self.value)
            )
        } else {
            format!("{} {}", column, self.operator.sql())
        }
    }
}

/// Conjunction of the valid filters, or None when no filter survives.
///
/// Conditions naming an invalid column identifier are dropped.
pub fn build_filter_clause(dialect: &dyn SqlDialect, filters: &[FilterCondition]) -> Option<String> {
    let conditions: Vec<String> = filters
        .iter()
        .filter(|filter| {
            let valid = is_valid_identifier(&filter.column);
            if !valid {
                warn!("[FILTER] Dropping filter on invalid column name {:?}", filter.column);
            }
            valid
        })
        .map(|filter| filter.to_sql(dialect))
        .collect();

    if conditions.is_empty() {
        None
    } else {
        Some(conditions.join(" AND "))
    }
}

/// State for table browsing with pagination.
#[derive(Debug, Clone)]
pub struct TableBrowseRequest {
    pub table: TableRef,
    pub pagination: Pagination,
    pub order_by: Vec<OrderByColumn>,
    pub filters: Vec<FilterCondition>,
}

impl TableBrowseRequest {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            pagination: Pagination::default(),
            order_by: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_order_by(mut self, columns: Vec<OrderByColumn>) -> Self {
        self.order_by = columns;
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterCondition>) -> Self {
        self.filters = filters;
        self
    }

    /// Page query: `SELECT * ... [WHERE ...] [ORDER BY ...] LIMIT n OFFSET m`.
    ///
    /// Without ORDER BY columns rows may shift between pages.
    pub fn build_select_sql(&self, kind: DbKind) -> String {
        let dialect = kind.dialect();
        let mut sql = format!("SELECT * FROM {}", self.table.quoted(dialect));

        if let Some(where_clause) = build_filter_clause(dialect, &self.filters) {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let quoted_cols: Vec<String> = self
                .order_by
                .iter()
                .map(|col| {
                    let dir = match col.direction {
                        SortDirection::Ascending => "ASC",
                        SortDirection::Descending => "DESC",
                    };
                    format!("{} {}", dialect.quote_identifier(&col.name), dir)
                })
                .collect();
            sql.push_str(&quoted_cols.join(", "));
        }

        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            self.pagination.limit(),
            self.pagination.offset()
        ));

        sql
    }

    /// Row count query using the same filter as the page query.
    pub fn build_count_sql(&self, kind: DbKind) -> String {
        let dialect = kind.dialect();
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table.quoted(dialect));

        if let Some(where_clause) = build_filter_clause(dialect, &self.filters) {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_pages() {
        let p = Pagination::new(100);
        assert!(p.is_first_page());
        assert_eq!(p.offset(), 0);

        let p3 = p.with_page(2);
        assert_eq!(p3.offset(), 200);
        assert_eq!(p.page_count(0), 0);
        assert_eq!(p.page_count(100), 1);
        assert_eq!(p.page_count(101), 2);
        assert!(p.has_next_page(101));
        assert!(!p.with_page(1).has_next_page(101));
    }

    #[test]
    fn zero_page_size_falls_back_to_default() {
        assert_eq!(Pagination::new(0).page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_table_ref() {
        let t = TableRef::from_qualified("public.users");
        assert_eq!(t.schema, Some("public".to_string()));
        assert_eq!(t.name, "users");
        assert_eq!(t.quoted_for_kind(DbKind::Postgres), "\"public\".\"users\"");
        assert_eq!(t.quoted_for_kind(DbKind::MySQL), "`public`.`users`");

        let t2 = TableRef::new("simple");
        assert_eq!(t2.qualified_name(), "simple");
    }

    #[test]
    fn identifier_validation() {
        assert!(is_valid_identifier("user_id"));
        assert!(is_valid_identifier("$col"));
        assert!(is_valid_identifier("_x9"));
        assert!(!is_valid_identifier("9lives"));
        assert!(!is_valid_identifier("name; DROP TABLE users"));
        assert!(!is_valid_identifier("a b"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_build_sql() {
        let req = TableBrowseRequest::new(TableRef::from_qualified("public.users"))
            .with_pagination(Pagination::new(50).with_page(2))
            .with_order_by(vec![OrderByColumn::asc("id")]);

        assert_eq!(
            req.build_select_sql(DbKind::Postgres),
            "SELECT * FROM \"public\".\"users\" ORDER BY \"id\" ASC LIMIT 50 OFFSET 100"
        );
    }

    #[test]
    fn test_build_sql_with_filters() {
        let req = TableBrowseRequest::new(TableRef::with_schema("shop", "orders"))
            .with_filters(vec![
                FilterCondition::new("status", FilterOperator::Eq, "active"),
                FilterCondition::is_null("deleted_at"),
            ])
            .with_order_by(vec![OrderByColumn::desc("created_at")]);

        assert_eq!(
            req.build_select_sql(DbKind::MySQL),
            "SELECT * FROM `shop`.`orders` WHERE `status` = 'active' AND `deleted_at` IS NULL \
             ORDER BY `created_at` DESC LIMIT 100 OFFSET 0"
        );
        assert_eq!(
            req.build_count_sql(DbKind::MySQL),
            "SELECT COUNT(*) FROM `shop`.`orders` WHERE `status` = 'active' AND `deleted_at` IS NULL"
        );
    }

    #[test]
    fn invalid_filter_columns_are_dropped() {
        let req = TableBrowseRequest::new(TableRef::new("orders")).with_filters(vec![
            FilterCondition::new("id = 1 OR 1", FilterOperator::Eq, 1),
            FilterCondition::new("total", FilterOperator::Gt, 10),
        ]);

        assert_eq!(
            req.build_count_sql(DbKind::Postgres),
            "SELECT COUNT(*) FROM \"orders\" WHERE \"total\" > 10"
        );

        let only_invalid = TableBrowseRequest::new(TableRef::new("orders"))
            .with_filters(vec![FilterCondition::is_null("bad name")]);
        assert_eq!(
            only_invalid.build_count_sql(DbKind::Postgres),
            "SELECT COUNT(*) FROM \"orders\""
        );
    }
}
