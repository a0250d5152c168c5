//! Convenient imports for common functionality.
//!
//! This module re-exports the types most front-ends need to open a session,
//! submit queries and render the transcript.

pub use crate::block::{Block, BlockBody, TextSubtype};
pub use crate::connection::{QueryConnection, QueryOutcome, ServerEvent};
pub use crate::diagnostic::{
    ClientFailure, Diagnostic, DiagnosticSource, MessageKind, Position, ServerMessage, Severity,
    classify,
};
pub use crate::error::SqlReplError;
pub use crate::postgres::{PgConnection, pg_config_from_parts, pg_config_from_url};
pub use crate::render::{render_block, render_body, render_header};
pub use crate::results::{Field, QueryResult, ResultRow};
pub use crate::runner::{QueryRunner, RunnerState, SubmitPolicy};
pub use crate::session::Session;
pub use crate::transcript::Transcript;
