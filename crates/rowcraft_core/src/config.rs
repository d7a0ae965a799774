use crate::DbError;
use crate::table_browser::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

/// User preferences for table editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Rows per page in table views.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Ask before navigation discards pending changes.
    #[serde(default = "default_true")]
    pub confirm_discard: bool,

    /// Send commit batches between BEGIN/COMMIT. Only safe when the executor
    /// runs every statement on the same connection.
    #[serde(default)]
    pub wrap_commit_in_transaction: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            confirm_discard: true,
            wrap_commit_in_transaction: false,
        }
    }
}

impl EditorConfig {
    fn normalized(mut self) -> Self {
        if self.page_size == 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }
}

pub struct EditorConfigStore {
    path: PathBuf,
}

impl EditorConfigStore {
    pub fn new() -> Result<Self, DbError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            DbError::IoError(std::io::Error::other("Could not find config directory"))
        })?;

        let app_dir = config_dir.join("rowcraft");
        fs::create_dir_all(&app_dir).map_err(DbError::IoError)?;

        Ok(Self {
            path: app_dir.join("editor.json"),
        })
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<EditorConfig, DbError> {
        if !self.path.exists() {
            return Ok(EditorConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(DbError::IoError)?;
        let config: EditorConfig =
            serde_json::from_str(&content).map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        Ok(config.normalized())
    }

    pub fn save(&self, config: &EditorConfig) -> Result<(), DbError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        fs::write(&self.path, content).map_err(DbError::IoError)?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("rowcraft_editor_{}.json", Uuid::new_v4()))
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"page_size": 25}"#).unwrap();

        assert_eq!(config.page_size, 25);
        assert!(config.confirm_discard);
        assert!(!config.wrap_commit_in_transaction);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let store = EditorConfigStore::from_path(temp_path());
        assert_eq!(store.load().unwrap(), EditorConfig::default());
    }

    #[test]
    fn zero_page_size_is_normalized() {
        let path = temp_path();
        fs::write(&path, r#"{"page_size": 0}"#).unwrap();

        let config = EditorConfigStore::from_path(&path).load().unwrap();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_json_is_reported() {
        let path = temp_path();
        fs::write(&path, "{ not json").unwrap();

        let err = EditorConfigStore::from_path(&path).load().unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));

        let _ = fs::remove_file(&path);
    }
}
