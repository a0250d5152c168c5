use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc;
use tokio_postgres::tls::NoTlsStream;
use tokio_postgres::{AsyncMessage, Client, Connection, NoTls, Socket};

use super::query::build_query_result;
use crate::connection::{QueryConnection, QueryOutcome, ServerEvent};
use crate::diagnostic::{MessageKind, ServerMessage, classify};
use crate::error::SqlReplError;

/// SQLSTATE the server uses for plain notices
const SUCCESSFUL_COMPLETION: &str = "00000";

/// One `tokio-postgres` client plus the task driving its socket
pub struct PgConnection {
    client: Client,
}

impl PgConnection {
    /// Connect and spawn the connection driver
    ///
    /// Notices, `NOTIFY` payloads and the error that ends the connection are
    /// sent on the returned channel; it closes when the connection does.
    ///
    /// # Errors
    /// Returns `SqlReplError::PostgresError` if the connection can't be established.
    pub async fn connect(
        config: &tokio_postgres::Config,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>), SqlReplError> {
        let (client, connection) = config.connect(NoTls).await?;
        let (events, rx) = mpsc::unbounded_channel();
        tokio::spawn(drive_connection(connection, events));
        Ok((Self { client }, rx))
    }
}

#[async_trait]
impl QueryConnection for PgConnection {
    async fn run(&mut self, sql: &str) -> QueryOutcome {
        match self.client.simple_query(sql).await {
            Ok(messages) => QueryOutcome::Success(build_query_result(sql, &messages)),
            Err(err) => QueryOutcome::from_error(&err),
        }
    }
}

async fn drive_connection(
    mut connection: Connection<Socket, NoTlsStream>,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let mut messages = stream::poll_fn(move |cx| connection.poll_message(cx));
    while let Some(message) = messages.next().await {
        let event = match message {
            Ok(AsyncMessage::Notice(notice)) => {
                ServerEvent::Notice(ServerMessage::from_db_error(&notice, MessageKind::Notice))
            }
            Ok(AsyncMessage::Notification(notification)) => {
                ServerEvent::Notice(notification_message(
                notification.channel(),
                notification.payload(),
                notification.process_id(),
            ))
            }
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!("postgres connection error: {err}");
                // the connection is finished after an error
                let _ = events.send(ServerEvent::Error(classify(&err)));
                break;
            }
        };
        if events.send(event).is_err() {
            tracing::debug!("event receiver dropped; notices are no longer forwarded");
        }
    }
    tracing::debug!("postgres connection closed");
}

/// `LISTEN`/`NOTIFY` deliveries, worded the way psql prints them
fn notification_message(channel: &str, payload: &str, pid: i32) -> ServerMessage {
    let text = if payload.is_empty() {
        format!("Asynchronous notification \"{channel}\" received from server process with PID {pid}.")
    } else {
        format!(
            "Asynchronous notification \"{channel}\" with payload \"{payload}\" received from server process with PID {pid}."
        )
    };
    ServerMessage::new(MessageKind::Notice, SUCCESSFUL_COMPLETION, text)
}
