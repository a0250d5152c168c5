use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlReplError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("A query is already in flight; submission rejected")]
    Busy,
}

impl From<deadpool_postgres::ConfigError> for SqlReplError {
    fn from(err: deadpool_postgres::ConfigError) -> Self {
        SqlReplError::ConfigError(err.to_string())
    }
}
