use rowcraft_core::{ColumnDetail, ColumnMeta, QueryResult, Row, Value};
use std::time::Duration;

pub fn table_result(columns: Vec<ColumnMeta>, rows: Vec<Row>) -> QueryResult {
    QueryResult::table(columns, rows, Duration::ZERO)
}

/// Single-cell result as returned by `SELECT COUNT(*)`.
pub fn count_result(count: i64) -> QueryResult {
    table_result(
        vec![column("count", "bigint", false)],
        vec![vec![Value::Int(count)]],
    )
}

pub fn column(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> ColumnMeta {
    ColumnMeta {
        name: name.into(),
        type_name: type_name.into(),
        nullable,
    }
}

/// Row from a JSON array, the shape rows arrive in over the query boundary.
pub fn row_from_json(cells: serde_json::Value) -> Row {
    match cells {
        serde_json::Value::Array(values) => values.iter().map(Value::from_json).collect(),
        other => vec![Value::from_json(&other)],
    }
}

/// `users(id PK, name, email)`.
pub fn users_columns() -> Vec<ColumnDetail> {
    vec![
        ColumnDetail::new("id", "int", false).primary(),
        ColumnDetail::new("name", "varchar(255)", true),
        ColumnDetail::new("email", "varchar(255)", true),
    ]
}

pub fn users_result_columns() -> Vec<ColumnMeta> {
    vec![
        column("id", "int4", false),
        column("name", "varchar", true),
        column("email", "varchar", true),
    ]
}

/// A page of `users` rows built from `(id, name)` pairs; emails are derived.
pub fn users_page(users: &[(i64, &str)]) -> QueryResult {
    let rows = users
        .iter()
        .map(|(id, name)| {
            row_from_json(serde_json::json!([
                id,
                name,
                format!("{}@example.com", name.to_lowercase())
            ]))
        })
        .collect();

    table_result(users_result_columns(), rows)
}

/// `audit_log(line)`, a table with no primary key.
pub fn keyless_columns() -> Vec<ColumnDetail> {
    vec![ColumnDetail::new("line", "text", true)]
}
