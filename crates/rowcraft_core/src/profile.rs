use crate::sql_dialect::{MYSQL_DIALECT, POSTGRES_DIALECT, SqlDialect};
use serde::{Deserialize, Serialize};

/// Database engine behind a browsed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbKind {
    #[serde(alias = "postgresql")]
    Postgres,
    MySQL,
    MariaDB,
}

impl DbKind {
    pub fn is_mysql_family(&self) -> bool {
        matches!(self, DbKind::MySQL | DbKind::MariaDB)
    }

    /// Quoting/escaping strategy for this engine.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        if self.is_mysql_family() {
            &MYSQL_DIALECT
        } else {
            &POSTGRES_DIALECT
        }
    }
}
