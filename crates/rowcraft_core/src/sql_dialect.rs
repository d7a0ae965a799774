use crate::Value;

/// Database-specific SQL syntax (quoting, escaping, literals).
pub trait SqlDialect: Send + Sync {
    /// Quote an identifier (table/column name).
    ///
    /// - PostgreSQL: `"name"` (double quotes)
    /// - MySQL: `` `name` `` (backticks)
    fn quote_identifier(&self, name: &str) -> String;

    /// Build a qualified table reference.
    ///
    /// - PostgreSQL: `"schema"."table"`
    /// - MySQL: `` `database`.`table` ``
    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!(
                "{}.{}",
                self.quote_identifier(s),
                self.quote_identifier(table)
            ),
            None => self.quote_identifier(table),
        }
    }

    /// Escape a string for use inside a single-quoted literal.
    ///
    /// Only single quotes are doubled. Backslashes pass through unchanged.
    fn escape_string(&self, s: &str) -> String {
        s.replace('\'', "''")
    }

    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", self.escape_string(s))
    }

    /// Boolean literal. Both dialects use `TRUE`/`FALSE` in every context.
    fn bool_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    fn float_literal(&self, value: f64) -> String;

    fn bytes_literal(&self, bytes: &[u8]) -> String;

    /// Statement that opens an explicit transaction.
    fn begin_transaction(&self) -> &'static str;

    /// Convert a Value to a SQL literal string.
    fn value_to_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.bool_literal(*b).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => self.float_literal(*f),
            Value::Decimal(s) => s.clone(),
            Value::Text(s) | Value::Json(s) => self.quote_string(s),
            Value::Bytes(b) => self.bytes_literal(b),
            Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
        }
    }
}

/// Escape an identifier by doubling the quote character.
fn escape_identifier(name: &str, quote_char: char) -> String {
    let quote_str = quote_char.to_string();
    let escaped = format!("{}{}", quote_char, quote_char);
    name.replace(&quote_str, &escaped)
}

/// MySQL/MariaDB dialect (backtick identifiers).
pub struct MysqlDialect;

impl SqlDialect for MysqlDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", escape_identifier(name, '`'))
    }

    fn float_literal(&self, value: f64) -> String {
        if value.is_nan() || value.is_infinite() {
            // MySQL doesn't have NaN/Infinity, store as NULL
            "NULL".to_string()
        } else {
            value.to_string()
        }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex::encode(bytes))
    }

    fn begin_transaction(&self) -> &'static str {
        "START TRANSACTION"
    }
}

/// PostgreSQL dialect (double-quoted identifiers).
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", escape_identifier(name, '"'))
    }

    fn float_literal(&self, value: f64) -> String {
        if value.is_nan() {
            "'NaN'".to_string()
        } else if value.is_infinite() {
            if value > 0.0 {
                "'Infinity'".to_string()
            } else {
                "'-Infinity'".to_string()
            }
        } else {
            value.to_string()
        }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex::encode(bytes))
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN"
    }
}

pub static MYSQL_DIALECT: MysqlDialect = MysqlDialect;
pub static POSTGRES_DIALECT: PostgresDialect = PostgresDialect;
