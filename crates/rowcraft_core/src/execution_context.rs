use serde::{Deserialize, Serialize};

/// Where statements of a browsed table run (connection, database, schema).
///
/// - MySQL: `database` is the `USE` target.
/// - PostgreSQL: `database` selects the pool, `context` sets the search path.
///
/// Every statement of a commit batch carries the same context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub connection_id: String,
    pub database: Option<String>,
    pub context: Option<String>,
}

impl ExecutionContext {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            ..Default::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
