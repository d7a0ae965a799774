use serde::{Deserialize, Serialize};

/// Column metadata as reported by schema discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDetail {
    pub name: String,

    /// Full data type specification (e.g. "varchar(255)").
    pub data_type: String,

    pub nullable: bool,

    /// Key type: "PRI" (primary), "UNI" (unique), "MUL" (index).
    pub key: Option<String>,

    /// Default value expression, if any.
    #[serde(default)]
    pub default_value: Option<String>,

    /// Extra attributes such as "auto_increment".
    #[serde(default)]
    pub extra: Option<String>,
}

impl ColumnDetail {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            key: None,
            default_value: None,
            extra: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.key = Some("PRI".to_string());
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.key.as_deref() == Some("PRI")
    }
}

/// Names of the primary key columns, in table column order.
pub fn primary_key_columns(columns: &[ColumnDetail]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| c.is_primary_key())
        .map(|c| c.name.clone())
        .collect()
}
