use async_trait::async_trait;

use crate::block::BlockBody;
use crate::diagnostic::{ClientFailure, Diagnostic, DiagnosticSource, ServerMessage, classify};
use crate::results::QueryResult;

/// The settled result of one query, classified where the driver call is made
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Success(QueryResult),
    Server(ServerMessage),
    Client(ClientFailure),
}

impl QueryOutcome {
    /// Classify a driver error into the matching failure outcome
    pub fn from_error<E: DiagnosticSource + ?Sized>(err: &E) -> Self {
        classify(err).into()
    }

    /// The block this outcome settles a submission with
    #[must_use]
    pub fn into_block_body(self) -> BlockBody {
        match self {
            QueryOutcome::Success(result) => BlockBody::ResultTable { result },
            QueryOutcome::Server(msg) => BlockBody::server_message(&msg),
            QueryOutcome::Client(error) => BlockBody::ClientError { error },
        }
    }
}

impl From<Diagnostic> for QueryOutcome {
    fn from(diagnostic: Diagnostic) -> Self {
        match diagnostic {
            Diagnostic::Server(msg) => QueryOutcome::Server(msg),
            Diagnostic::Client(failure) => QueryOutcome::Client(failure),
        }
    }
}

/// Something pushed by the server outside of any query
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Notice(ServerMessage),
    Error(Diagnostic),
}

/// A single established database connection
///
/// Implementations never return `Err`: every failure is folded into the
/// outcome.
#[async_trait]
pub trait QueryConnection: Send {
    /// Run `sql` verbatim and wait for it to settle
    async fn run(&mut self, sql: &str) -> QueryOutcome;
}
