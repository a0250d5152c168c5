// PostgreSQL module - the tokio-postgres side of the query connection
//
// - config: Connection settings validation
// - connection: Client wrapper, connection driver and out-of-band events
// - query: Simple-query replies to results

pub mod config;
pub mod connection;
pub mod query;

pub use config::{pg_config_from_parts, pg_config_from_url};
pub use connection::PgConnection;
pub use query::build_query_result;
