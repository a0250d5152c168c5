use super::super::SHARED_RUNTIME;
use postgresql_embedded::PostgreSQL;

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    pub database_url: String,
    /// Driver configuration pointing at the test database
    pub config: tokio_postgres::Config,
}

/// Set up an embedded `PostgreSQL` instance with database `db_name` for testing.
///
/// # Errors
/// Returns an error if the embedded server cannot be set up or started, if the
/// database can't be created, or if the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    db_name: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();

        // Setup PostgreSQL binaries (bundled, so no download conflicts)
        postgresql.setup().await?;

        // Start the PostgreSQL instance
        postgresql.start().await?;

        let settings = postgresql.settings();
        let port = settings.port;
        let host = settings.host.clone();
        let user = settings.username.clone();
        let password = settings.password.clone();

        postgresql.create_database(db_name).await?;

        let database_url = format!("postgres://{user}:{password}@{host}:{port}/{db_name}");
        let config: tokio_postgres::Config = database_url.parse()?;

        // Quick connection test
        let (client, connection) = config.connect(tokio_postgres::NoTls).await?;
        let driver = tokio::spawn(connection);
        client.simple_query("SELECT 1").await?;
        drop(client);
        let _ = driver.await;

        Ok(EmbeddedPostgres {
            postgresql,
            port,
            database_url,
            config,
        })
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
