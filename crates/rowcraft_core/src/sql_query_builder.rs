use crate::ledger::CellEdit;
use crate::sql_dialect::SqlDialect;
use crate::{NamedRow, PrimaryKeyValues, TableRef};

/// Builds row-level DML statements using a specific dialect.
pub struct SqlQueryBuilder<'a> {
    dialect: &'a dyn SqlDialect,
}

impl<'a> SqlQueryBuilder<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &'a dyn SqlDialect {
        self.dialect
    }

    /// Build UPDATE statement from cell edits.
    ///
    /// Returns SQL like: `UPDATE "table" SET "col1" = val1, "col2" = val2 WHERE "pk" = pkval`.
    /// Returns None when there is nothing to set or no key to target.
    pub fn build_update(
        &self,
        table: &TableRef,
        primary_key: &PrimaryKeyValues,
        edits: &[CellEdit],
    ) -> Option<String> {
        if edits.is_empty() {
            return None;
        }

        let where_clause = self.build_where_clause(primary_key)?;
        let set_clause = self.build_set_clause(edits);

        Some(format!(
            "UPDATE {} SET {} WHERE {}",
            table.quoted(self.dialect),
            set_clause,
            where_clause
        ))
    }

    /// Build INSERT statement from a full candidate row.
    ///
    /// Returns SQL like: `INSERT INTO "table" ("col1", "col2") VALUES (val1, val2)`.
    pub fn build_insert(&self, table: &TableRef, row: &NamedRow) -> Option<String> {
        if row.is_empty() {
            return None;
        }

        let columns: Vec<String> = row
            .keys()
            .map(|c| self.dialect.quote_identifier(c))
            .collect();

        let values: Vec<String> = row
            .values()
            .map(|v| self.dialect.value_to_literal(v))
            .collect();

        Some(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.quoted(self.dialect),
            columns.join(", "),
            values.join(", ")
        ))
    }

    /// Build DELETE statement for the row with the given key.
    ///
    /// Returns SQL like: `DELETE FROM "table" WHERE "pk" = pkval`.
    pub fn build_delete(&self, table: &TableRef, primary_key: &PrimaryKeyValues) -> Option<String> {
        let where_clause = self.build_where_clause(primary_key)?;

        Some(format!(
            "DELETE FROM {} WHERE {}",
            table.quoted(self.dialect),
            where_clause
        ))
    }

    /// Build WHERE clause from primary key values.
    ///
    /// Returns `"col1" = val1 AND "col2" IS NULL` for composite keys.
    /// Returns None for an empty key so no statement can target every row.
    pub fn build_where_clause(&self, primary_key: &PrimaryKeyValues) -> Option<String> {
        if primary_key.is_empty() {
            return None;
        }

        let conditions: Vec<String> = primary_key
            .iter()
            .map(|(col, val)| {
                let col_quoted = self.dialect.quote_identifier(col);
                if val.is_null() {
                    format!("{} IS NULL", col_quoted)
                } else {
                    format!("{} = {}", col_quoted, self.dialect.value_to_literal(val))
                }
            })
            .collect();

        Some(conditions.join(" AND "))
    }

    /// Build SET clause for UPDATE.
    ///
    /// Returns `"col1" = val1, "col2" = val2`.
    fn build_set_clause(&self, edits: &[CellEdit]) -> String {
        edits
            .iter()
            .map(|edit| {
                format!(
                    "{} = {}",
                    self.dialect.quote_identifier(&edit.column),
                    self.dialect.value_to_literal(&edit.new_value)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use crate::sql_dialect::{MYSQL_DIALECT, POSTGRES_DIALECT};

    fn edit(column: &str, original: Value, new: Value) -> CellEdit {
        CellEdit {
            column: column.to_string(),
            original_value: original,
            new_value: new,
        }
    }

    #[test]
    fn update_sets_only_edited_columns() {
        let builder = SqlQueryBuilder::new(&POSTGRES_DIALECT);
        let table = TableRef::with_schema("public", "users");
        let pk = PrimaryKeyValues::new().with("id", 2);

        let sql = builder
            .build_update(
                &table,
                &pk,
                &[
                    edit("name", Value::text("A"), Value::text("B")),
                    edit("active", Value::Bool(false), Value::Bool(true)),
                ],
            )
            .unwrap();

        assert_eq!(
            sql,
            "UPDATE \"public\".\"users\" SET \"name\" = 'B', \"active\" = TRUE WHERE \"id\" = 2"
        );
    }

    #[test]
    fn update_without_edits_is_skipped() {
        let builder = SqlQueryBuilder::new(&POSTGRES_DIALECT);
        let table = TableRef::new("users");
        let pk = PrimaryKeyValues::new().with("id", 2);

        assert!(builder.build_update(&table, &pk, &[]).is_none());
    }

    #[test]
    fn where_clause_uses_is_null_for_null_keys() {
        let builder = SqlQueryBuilder::new(&MYSQL_DIALECT);
        let pk = PrimaryKeyValues::new()
            .with("tenant", 7)
            .with("code", Value::Null);

        assert_eq!(
            builder.build_where_clause(&pk).unwrap(),
            "`tenant` = 7 AND `code` IS NULL"
        );
    }

    #[test]
    fn empty_key_never_builds_delete() {
        let builder = SqlQueryBuilder::new(&MYSQL_DIALECT);
        let table = TableRef::with_schema("shop", "orders");

        assert!(builder.build_delete(&table, &PrimaryKeyValues::new()).is_none());
    }

    #[test]
    fn insert_lists_every_column_in_row_order() {
        let builder = SqlQueryBuilder::new(&MYSQL_DIALECT);
        let table = TableRef::with_schema("shop", "orders");
        let mut row = NamedRow::new();
        row.insert("id".to_string(), Value::Null);
        row.insert("note".to_string(), Value::text("it's"));

        assert_eq!(
            builder.build_insert(&table, &row).unwrap(),
            "INSERT INTO `shop`.`orders` (`id`, `note`) VALUES (NULL, 'it''s')"
        );
        assert!(builder.build_insert(&table, &NamedRow::new()).is_none());
    }
}
