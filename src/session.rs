use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::block::{Block, BlockBody, TextSubtype};
use crate::connection::{QueryConnection, ServerEvent};
use crate::diagnostic::Diagnostic;
use crate::error::SqlReplError;
use crate::postgres::PgConnection;
use crate::runner::{QueryRunner, RunnerState, SubmitPolicy};
use crate::transcript::Transcript;

/// One connection, its transcript, the runner and the event pump
pub struct Session<C = PgConnection> {
    runner: QueryRunner<C>,
    pump: JoinHandle<()>,
}

impl Session<PgConnection> {
    /// Connect to PostgreSQL and start recording
    ///
    /// # Errors
    /// Returns `SqlReplError::PostgresError` if the connection fails.
    pub async fn connect(
        config: &tokio_postgres::Config,
        policy: SubmitPolicy,
    ) -> Result<Self, SqlReplError> {
        let (conn, events) = PgConnection::connect(config).await?;
        tracing::info!(?policy, "connected");
        Ok(Self::new(conn, events, policy))
    }
}

impl<C: QueryConnection> Session<C> {
    /// Wire an established connection and its event channel to a fresh transcript
    ///
    /// Must be called inside a tokio runtime: the event pump is spawned here.
    pub fn new(conn: C, events: mpsc::UnboundedReceiver<ServerEvent>, policy: SubmitPolicy) -> Self {
        let transcript = Arc::new(Transcript::new());
        let pump = spawn_event_pump(Arc::clone(&transcript), events);
        Self {
            runner: QueryRunner::new(conn, transcript, policy),
            pump,
        }
    }

    /// See [`QueryRunner::submit`]
    ///
    /// # Errors
    /// Returns `SqlReplError::Busy` when the submission policy rejects it.
    pub async fn submit(&self, text: &str) -> Result<Block, SqlReplError> {
        self.runner.submit(text).await
    }

    #[must_use]
    pub fn transcript(&self) -> &Arc<Transcript> {
        self.runner.transcript()
    }

    #[must_use]
    pub fn runner(&self) -> &QueryRunner<C> {
        &self.runner
    }

    #[must_use]
    pub fn state(&self) -> RunnerState {
        self.runner.state()
    }

    /// Fails once the connection's event stream has ended
    ///
    /// The driver closes the stream when the connection goes away, after
    /// forwarding whatever error ended it.
    ///
    /// # Errors
    /// Returns `SqlReplError::ConnectionError` when the connection is gone.
    pub fn ensure_open(&self) -> Result<(), SqlReplError> {
        if self.pump.is_finished() {
            return Err(SqlReplError::ConnectionError(
                "the connection to the server was lost".to_string(),
            ));
        }
        Ok(())
    }
}

impl<C> Drop for Session<C> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Append every out-of-band event to `transcript` until the channel closes
pub fn spawn_event_pump(
    transcript: Arc<Transcript>,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            record_event(&transcript, event);
        }
    })
}

/// Append one out-of-band event
///
/// Notices are stored as their JSON serialization rather than the rendered
/// diagnostic text.
pub fn record_event(transcript: &Transcript, event: ServerEvent) -> Block {
    let body = match event {
        ServerEvent::Notice(msg) => BlockBody::TextReply {
            subtype: TextSubtype::Notice,
            value: serde_json::to_string(&msg).unwrap_or_else(|_| msg.render()),
        },
        ServerEvent::Error(Diagnostic::Server(msg)) => BlockBody::TextReply {
            subtype: TextSubtype::Error,
            value: msg.render(),
        },
        ServerEvent::Error(Diagnostic::Client(error)) => BlockBody::ClientError { error },
    };
    transcript.append(body)
}
