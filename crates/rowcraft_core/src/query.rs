use crate::{ExecutionContext, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for executing a SQL statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    /// The SQL statement to execute.
    pub sql: String,

    pub connection_id: String,

    /// Target database (`USE` target on MySQL, pool selector on PostgreSQL).
    pub database: Option<String>,

    /// Schema/search path on PostgreSQL, database on MySQL.
    pub context: Option<String>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>, ctx: &ExecutionContext) -> Self {
        Self {
            sql: sql.into(),
            connection_id: ctx.connection_id.clone(),
            database: ctx.database.clone(),
            context: ctx.context.clone(),
        }
    }
}

/// A single row of query results, positional by column.
pub type Row = Vec<Value>;

/// A row keyed by column name, in column order.
pub type NamedRow = IndexMap<String, Value>;

/// Metadata for a result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name as returned by the database.
    pub name: String,

    /// Database-specific type name (e.g., "varchar", "int4").
    pub type_name: String,

    /// Whether the column allows NULL values.
    pub nullable: bool,
}

/// Result of executing a SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,

    /// Row data, where each row contains values matching `columns` order.
    pub rows: Vec<Row>,

    /// Rows touched by INSERT/UPDATE/DELETE; zero for SELECT.
    pub affected_rows: u64,

    /// Wall-clock time taken to execute the statement.
    pub execution_time: Duration,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            execution_time: Duration::ZERO,
        }
    }

    pub fn table(columns: Vec<ColumnMeta>, rows: Vec<Row>, execution_time: Duration) -> Self {
        Self {
            columns,
            rows,
            affected_rows: 0,
            execution_time,
        }
    }

    pub fn affected(affected_rows: u64, execution_time: Duration) -> Self {
        Self {
            affected_rows,
            execution_time,
            ..Self::empty()
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Row at `index` keyed by column name. Missing trailing cells read as NULL.
    pub fn named_row(&self, index: usize) -> Option<NamedRow> {
        let row = self.rows.get(index)?;

        Some(
            self.columns
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let value = row.get(idx).cloned().unwrap_or(Value::Null);
                    (col.name.clone(), value)
                })
                .collect(),
        )
    }

    /// Interpret the first cell as a row count (`SELECT COUNT(*)`).
    ///
    /// Falls back to zero when the cell is missing or not numeric.
    pub fn first_cell_as_count(&self) -> u64 {
        match self.rows.first().and_then(|row| row.first()) {
            Some(Value::Int(n)) => (*n).max(0) as u64,
            Some(Value::Decimal(s)) | Some(Value::Text(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}
