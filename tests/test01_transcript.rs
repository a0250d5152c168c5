use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sql_repl::prelude::*;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Errors shaped like a driver's: server-reported or not
#[derive(Debug)]
enum FakeDriverError {
    Db(ServerMessage),
    Io(&'static str),
}

impl fmt::Display for FakeDriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FakeDriverError::Db(_) => f.write_str("db error"),
            FakeDriverError::Io(msg) => f.write_str(msg),
        }
    }
}

impl DiagnosticSource for FakeDriverError {
    fn server_message(&self) -> Option<ServerMessage> {
        match self {
            FakeDriverError::Db(msg) => Some(msg.clone()),
            FakeDriverError::Io(_) => None,
        }
    }
}

/// Plays back canned outcomes, yielding a few times to mimic a round-trip
struct ScriptedConnection {
    outcomes: VecDeque<QueryOutcome>,
    seen: Arc<Mutex<Vec<String>>>,
    yields: usize,
}

impl ScriptedConnection {
    fn new(outcomes: Vec<QueryOutcome>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let conn = Self {
            outcomes: outcomes.into(),
            seen: Arc::clone(&seen),
            yields: 3,
        };
        (conn, seen)
    }
}

#[async_trait]
impl QueryConnection for ScriptedConnection {
    async fn run(&mut self, sql: &str) -> QueryOutcome {
        self.seen.lock().unwrap().push(sql.to_string());
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        self.outcomes
            .pop_front()
            .unwrap_or_else(|| QueryOutcome::Client(ClientFailure::new("script exhausted")))
    }
}

fn one_row_one_column() -> QueryOutcome {
    let mut result = QueryResult::new("SELECT");
    result.set_fields(vec!["?column?".to_string()]);
    result.add_row_values(vec![Some("1".to_string())]);
    result.set_row_count(1);
    QueryOutcome::Success(result)
}

fn missing_table_error() -> FakeDriverError {
    FakeDriverError::Db(ServerMessage {
        severity: Some(Severity::Error),
        severity_localized: Some("ERROR".to_string()),
        position: Some(Position::Original(15)),
        file: Some("parse_relation.c".to_string()),
        line: Some(1392),
        routine: Some("parserOpenTable".to_string()),
        ..ServerMessage::new(
            MessageKind::Error,
            "42P01",
            "relation \"missing_table\" does not exist",
        )
    })
}

fn runner(outcomes: Vec<QueryOutcome>, policy: SubmitPolicy) -> QueryRunner<ScriptedConnection> {
    let (conn, _) = ScriptedConnection::new(outcomes);
    QueryRunner::new(conn, Arc::new(Transcript::new()), policy)
}

#[test]
fn test01_select_one_appends_question_and_result() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let runner = runner(vec![one_row_one_column()], SubmitPolicy::Reject);
        assert_eq!(runner.state(), RunnerState::Idle);

        let outcome = runner.submit("SELECT 1").await?;
        assert_eq!(outcome.id, 1);
        assert_eq!(runner.state(), RunnerState::Settled);

        let blocks = runner.transcript().snapshot();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].body, BlockBody::question("SELECT 1"));
        match &blocks[1].body {
            BlockBody::ResultTable { result } => {
                assert_eq!(result.row_count, 1);
                assert_eq!(result.rows[0].get("?column?"), Some(Some("1")));
            }
            other => panic!("expected a result table, got {other:?}"),
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn test01_server_error_becomes_error_text_with_fields() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let failure = QueryOutcome::from_error(&missing_table_error());
        let runner = runner(vec![failure], SubmitPolicy::Reject);

        runner.submit("SELECT * FROM missing_table").await?;

        let blocks = runner.transcript().snapshot();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].body, BlockBody::question("SELECT * FROM missing_table"));
        match &blocks[1].body {
            BlockBody::TextReply { subtype, value } => {
                assert_eq!(*subtype, TextSubtype::Error);
                assert!(value.starts_with("ERROR:  42P01: relation \"missing_table\" does not exist"));
                assert!(value.contains("POSITION:  15"));
                assert!(value.contains("LOCATION:  parserOpenTable, parse_relation.c:1392"));
            }
            other => panic!("expected an error reply, got {other:?}"),
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn test01_plain_failure_becomes_client_error() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let failure = QueryOutcome::from_error(&FakeDriverError::Io("connection closed"));
        let runner = runner(vec![failure], SubmitPolicy::Reject);

        runner.submit("SELECT 1").await?;

        let blocks = runner.transcript().snapshot();
        assert_eq!(blocks.len(), 2);
        match &blocks[1].body {
            BlockBody::ClientError { error } => assert_eq!(error.message, "connection closed"),
            other => panic!("expected a client error, got {other:?}"),
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn test01_empty_text_is_forwarded_verbatim() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (conn, seen) = ScriptedConnection::new(vec![]);
        let runner = QueryRunner::new(conn, Arc::new(Transcript::new()), SubmitPolicy::Reject);

        let outcome = runner.submit("").await?;
        assert_eq!(seen.lock().unwrap().as_slice(), &[String::new()]);
        assert!(outcome.body.is_outcome());
        assert_eq!(runner.transcript().len(), 2);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn test01_ids_are_contiguous_and_pairs_alternate() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let outcomes = vec![
            one_row_one_column(),
            QueryOutcome::from_error(&missing_table_error()),
            QueryOutcome::from_error(&FakeDriverError::Io("broken pipe")),
            one_row_one_column(),
        ];
        let runner = runner(outcomes, SubmitPolicy::Reject);
        let texts = ["SELECT 1", "SELECT * FROM missing_table", "SELECT 2", "SELECT 3"];
        for text in texts {
            runner.submit(text).await?;
        }

        let blocks = runner.transcript().snapshot();
        let ids: Vec<u64> = blocks.iter().map(|b| b.id).collect();
        assert_eq!(ids, (0..8).collect::<Vec<u64>>());
        for (pair, text) in blocks.chunks(2).zip(texts) {
            assert_eq!(pair[0].body, BlockBody::question(text));
            assert!(pair[1].body.is_outcome());
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn test01_reject_policy_refuses_overlap() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let runner = runner(
            vec![one_row_one_column(), one_row_one_column()],
            SubmitPolicy::Reject,
        );

        let (first, second) = tokio::join!(runner.submit("SELECT 1"), runner.submit("SELECT 2"));
        assert!(first.is_ok());
        assert!(matches!(second, Err(SqlReplError::Busy)));

        let blocks = runner.transcript().snapshot();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].body, BlockBody::question("SELECT 1"));

        // the runner accepts work again once settled
        runner.submit("SELECT 2").await?;
        assert_eq!(runner.transcript().len(), 4);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn test01_queue_policy_runs_in_order_with_depth_one() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let runner = runner(
            vec![one_row_one_column(), QueryOutcome::from_error(&missing_table_error())],
            SubmitPolicy::Queue,
        );

        let (first, second, third) = tokio::join!(
            runner.submit("SELECT 1"),
            runner.submit("SELECT * FROM missing_table"),
            runner.submit("SELECT 3"),
        );
        assert_eq!(first?.id, 1);
        assert_eq!(second?.id, 3);
        assert!(matches!(third, Err(SqlReplError::Busy)));

        let blocks = runner.transcript().snapshot();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].body, BlockBody::question("SELECT 1"));
        assert!(matches!(blocks[1].body, BlockBody::ResultTable { .. }));
        assert_eq!(blocks[2].body, BlockBody::question("SELECT * FROM missing_table"));
        assert!(matches!(
            blocks[3].body,
            BlockBody::TextReply { subtype: TextSubtype::Error, .. }
        ));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn test01_idle_notice_is_recorded_without_touching_state() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (conn, _) = ScriptedConnection::new(vec![one_row_one_column()]);
        let (events, rx) = mpsc::unbounded_channel();
        let session = Session::new(conn, rx, SubmitPolicy::Reject);
        let mut appended = session.transcript().subscribe();

        let notice = ServerMessage {
            severity: Some(Severity::Notice),
            ..ServerMessage::new(MessageKind::Notice, "00000", "table \"t\" does not exist, skipping")
        };
        events.send(ServerEvent::Notice(notice))?;

        let block = appended.recv().await?;
        assert_eq!(block.id, 0);
        match &block.body {
            BlockBody::TextReply { subtype, value } => {
                assert_eq!(*subtype, TextSubtype::Notice);
                let fields: serde_json::Value = serde_json::from_str(value)?;
                assert_eq!(fields["kind"], "notice");
                assert_eq!(fields["message"], "table \"t\" does not exist, skipping");
            }
            other => panic!("expected a notice, got {other:?}"),
        }
        assert_eq!(session.state(), RunnerState::Idle);
        assert!(session.ensure_open().is_ok());

        // a later query still gets its own question/outcome pair
        session.submit("SELECT 1").await?;
        let ids: Vec<u64> = session.transcript().snapshot().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(session.state(), RunnerState::Settled);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

#[test]
fn test01_async_connection_errors_are_classified() -> TestResult {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (conn, _) = ScriptedConnection::new(vec![]);
        let (events, rx) = mpsc::unbounded_channel();
        let session = Session::new(conn, rx, SubmitPolicy::Reject);
        let mut appended = session.transcript().subscribe();

        let fatal = ServerMessage {
            severity: Some(Severity::Fatal),
            ..ServerMessage::new(
                MessageKind::Error,
                "57P01",
                "terminating connection due to administrator command",
            )
        };
        events.send(ServerEvent::Error(Diagnostic::Server(fatal)))?;
        events.send(ServerEvent::Error(Diagnostic::Client(ClientFailure::new(
            "connection closed",
        ))))?;
        drop(events);

        let first = appended.recv().await?;
        assert!(matches!(
            &first.body,
            BlockBody::TextReply { subtype: TextSubtype::Error, value }
                if value.starts_with("FATAL:  57P01: terminating connection")
        ));
        let second = appended.recv().await?;
        assert!(matches!(second.body, BlockBody::ClientError { .. }));

        // the channel closing means the connection is gone
        let mut closed = false;
        for _ in 0..100 {
            if let Err(err) = session.ensure_open() {
                assert!(matches!(err, SqlReplError::ConnectionError(_)));
                closed = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(closed);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
