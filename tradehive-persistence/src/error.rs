use thiserror::Error;

/// All errors generated in the `tradehive-persistence` module.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("agent group name '{0}' already exists")]
    DuplicateGroupName(String),

    #[error("trade order_id '{0}' already exists")]
    DuplicateOrderId(String),

    #[error("agent group {0} not found")]
    GroupNotFound(i64),

    #[error("agent {0} not found")]
    AgentNotFound(i64),

    #[error("agent group {0} still owns agents and cannot be deleted")]
    GroupNotEmpty(i64),

    #[error("invalid strategy configuration: {0}")]
    Validation(String),

    #[error("failed to (de)serialise strategy configuration: {0}")]
    ConfigSerde(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}
