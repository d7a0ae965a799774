use crate::ledger::{ChangeKind, ChangeLedger, PendingRowChange};
use crate::sql_query_builder::SqlQueryBuilder;
use crate::{DbKind, TableRef};

/// Translate a ledger into the ordered statements of one commit.
///
/// Order is fixed: every DELETE, then every UPDATE, then every INSERT, each
/// group in ledger order. Deletes free key slots that later statements may
/// reuse, updates only touch rows that still exist, and inserts land last.
/// Entries that cannot produce a statement (an update without edits, a
/// delete without key, an insert without columns) are skipped.
pub fn generate_commit_statements(
    table: &TableRef,
    kind: DbKind,
    ledger: &ChangeLedger,
) -> Vec<String> {
    let builder = SqlQueryBuilder::new(kind.dialect());

    let deletes = ledger.iter().filter(|c| c.is_delete());
    let updates = ledger.iter().filter(|c| c.is_update());
    let inserts = ledger.iter().filter(|c| c.is_insert());

    deletes
        .chain(updates)
        .chain(inserts)
        .filter_map(|change| build_statement(&builder, table, change))
        .collect()
}

/// Wrap statements in an explicit transaction for executors that pin one
/// connection across calls.
pub fn wrap_in_transaction(kind: DbKind, statements: Vec<String>) -> Vec<String> {
    if statements.is_empty() {
        return statements;
    }

    let mut wrapped = Vec::with_capacity(statements.len() + 2);
    wrapped.push(kind.dialect().begin_transaction().to_string());
    wrapped.extend(statements);
    wrapped.push("COMMIT".to_string());
    wrapped
}

fn build_statement(
    builder: &SqlQueryBuilder<'_>,
    table: &TableRef,
    change: &PendingRowChange,
) -> Option<String> {
    match &change.kind {
        ChangeKind::Delete { .. } => builder.build_delete(table, &change.primary_key),
        ChangeKind::Update { edits } => builder.build_update(table, &change.primary_key, edits),
        ChangeKind::Insert { new_row } => builder.build_insert(table, new_row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NamedRow, PrimaryKeyValues, Value};

    fn pk(id: i64) -> PrimaryKeyValues {
        PrimaryKeyValues::new().with("id", id)
    }

    fn insert_row(name: &str) -> NamedRow {
        let mut row = NamedRow::new();
        row.insert("id".to_string(), Value::Null);
        row.insert("name".to_string(), Value::text(name));
        row
    }

    fn original(id: i64) -> NamedRow {
        let mut row = NamedRow::new();
        row.insert("id".to_string(), Value::Int(id));
        row.insert("name".to_string(), Value::text("old"));
        row
    }

    #[test]
    fn statements_are_ordered_delete_update_insert() {
        let mut ledger = ChangeLedger::new();
        ledger.add_new_row(0, insert_row("X"));
        ledger.mark_row_for_deletion(1, &pk(1), original(1));
        ledger
            .record_cell_edit(2, &pk(2), "name", Value::text("A"), Value::text("B"))
            .unwrap();

        let table = TableRef::with_schema("public", "users");
        let statements = generate_commit_statements(&table, DbKind::Postgres, &ledger);

        assert_eq!(
            statements,
            vec![
                "DELETE FROM \"public\".\"users\" WHERE \"id\" = 1".to_string(),
                "UPDATE \"public\".\"users\" SET \"name\" = 'B' WHERE \"id\" = 2".to_string(),
                "INSERT INTO \"public\".\"users\" (\"id\", \"name\") VALUES (NULL, 'X')"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn groups_keep_ledger_order() {
        let mut ledger = ChangeLedger::new();
        ledger.add_new_row(0, insert_row("first"));
        ledger.mark_row_for_deletion(0, &pk(9), original(9));
        ledger.add_new_row(0, insert_row("second"));
        ledger.mark_row_for_deletion(0, &pk(3), original(3));

        let table = TableRef::with_schema("shop", "users");
        let statements = generate_commit_statements(&table, DbKind::MySQL, &ledger);

        assert_eq!(
            statements,
            vec![
                "DELETE FROM `shop`.`users` WHERE `id` = 9".to_string(),
                "DELETE FROM `shop`.`users` WHERE `id` = 3".to_string(),
                "INSERT INTO `shop`.`users` (`id`, `name`) VALUES (NULL, 'first')".to_string(),
                "INSERT INTO `shop`.`users` (`id`, `name`) VALUES (NULL, 'second')".to_string(),
            ]
        );
    }

    #[test]
    fn empty_ledger_generates_nothing() {
        let statements =
            generate_commit_statements(&TableRef::new("t"), DbKind::MySQL, &ChangeLedger::new());
        assert!(statements.is_empty());
        assert!(wrap_in_transaction(DbKind::MySQL, statements).is_empty());
    }

    #[test]
    fn transaction_wrapper_uses_dialect_begin() {
        let wrapped = wrap_in_transaction(DbKind::MariaDB, vec!["DELETE FROM `t`".to_string()]);
        assert_eq!(
            wrapped,
            vec!["START TRANSACTION", "DELETE FROM `t`", "COMMIT"]
        );

        let wrapped = wrap_in_transaction(DbKind::Postgres, vec!["DELETE FROM \"t\"".to_string()]);
        assert_eq!(wrapped.first().map(String::as_str), Some("BEGIN"));
    }
}
