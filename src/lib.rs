//! Transcript core for a PostgreSQL REPL.
//!
//! Each submitted query becomes a numbered *question* block followed by
//! exactly one *outcome* block: a result table, a server notice/error
//! rendered with all of its diagnostic fields, or a client error for
//! failures below the database-message layer. Notices the server pushes on
//! its own are appended as they arrive.
//!
//! ```rust,no_run
//! use sql_repl::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlReplError> {
//! let config = pg_config_from_url("postgres://postgres@localhost/postgres")?;
//! let session = Session::connect(&config, SubmitPolicy::Reject).await?;
//! session.submit("SELECT 1").await?;
//! for block in session.transcript().snapshot() {
//!     println!("{}", render_block(&block));
//! }
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod connection;
pub mod diagnostic;
pub mod error;
pub mod postgres;
pub mod prelude;
pub mod render;
pub mod results;
pub mod runner;
pub mod session;
pub mod statement;
#[cfg(feature = "test-utils")]
pub mod test_utils;
pub mod transcript;

pub use error::SqlReplError;
pub use session::Session;
pub use transcript::Transcript;
