use crate::error::SqlReplError;
use deadpool_postgres::Config as PgConfig;

/// Validate discrete connection settings and turn them into a driver config
///
/// # Errors
/// Returns `SqlReplError::ConfigError` if dbname, host, port or user is missing
/// or the settings can't be converted.
pub fn pg_config_from_parts(pg_config: &PgConfig) -> Result<tokio_postgres::Config, SqlReplError> {
    // Validate all required config fields are present
    if pg_config.dbname.is_none() {
        return Err(SqlReplError::ConfigError("dbname is required".to_string()));
    }

    if pg_config.host.is_none() {
        return Err(SqlReplError::ConfigError("host is required".to_string()));
    }
    if pg_config.port.is_none() {
        return Err(SqlReplError::ConfigError("port is required".to_string()));
    }
    if pg_config.user.is_none() {
        return Err(SqlReplError::ConfigError("user is required".to_string()));
    }
    // password may be absent: trust and peer auth don't ask for one

    Ok(pg_config.get_pg_config()?)
}

/// Parse a `postgres://` URL or a `key=value` connection string
///
/// # Errors
/// Returns `SqlReplError::ConfigError` if the string doesn't parse.
pub fn pg_config_from_url(url: &str) -> Result<tokio_postgres::Config, SqlReplError> {
    url.parse::<tokio_postgres::Config>()
        .map_err(|e| SqlReplError::ConfigError(format!("invalid connection string: {e}")))
}
