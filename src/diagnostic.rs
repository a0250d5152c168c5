//! Classification of query failures into server messages and client failures.
//!
//! A failure is a *server message* when the database produced it: it then
//! carries the PostgreSQL diagnostic fields (severity, SQLSTATE, detail,
//! hint, ...). Anything else (I/O errors, a closed connection, a response the
//! driver could not parse) is a *client failure* and only has a message and a
//! trace.
//!
//! # Severity and localization
//!
//! The `S` severity field is translated by the server according to its
//! `lc_messages` setting, so `"ERROR"` may arrive as `"FEHLER"` or `"ERREUR"`.
//! Servers since 9.6 also send the untranslated `V` field, which
//! `tokio-postgres` exposes as [`DbError::parsed_severity`]. The non-localized
//! value is preferred everywhere; the localized string is only a fallback and
//! cannot be relied on to name a severity.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use tokio_postgres::error::{DbError, ErrorPosition};

/// The discriminator carried by a server message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Notice,
    Error,
}

/// Non-localized severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Panic,
    Fatal,
    Error,
    Warning,
    Notice,
    Debug,
    Info,
    Log,
}

impl Severity {
    /// Parse an untranslated severity name, ignoring case
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let sev = match s.to_ascii_uppercase().as_str() {
            "PANIC" => Severity::Panic,
            "FATAL" => Severity::Fatal,
            "ERROR" => Severity::Error,
            "WARNING" => Severity::Warning,
            "NOTICE" => Severity::Notice,
            "DEBUG" => Severity::Debug,
            "INFO" => Severity::Info,
            "LOG" => Severity::Log,
            _ => return None,
        };
        Some(sev)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Panic => "PANIC",
            Severity::Fatal => "FATAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Notice => "NOTICE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Log => "LOG",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the query text the server located the problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// 1-based character offset into the submitted text
    Original(u32),
    /// Offset into an internally generated query
    Internal { position: u32, query: String },
}

/// A notice or error reported by the database server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub kind: MessageKind,
    /// Untranslated severity (`V`), absent on servers older than 9.6
    pub severity: Option<Severity>,
    /// Severity as sent in `S`, possibly translated
    pub severity_localized: Option<String>,
    /// SQLSTATE code
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub position: Option<Position>,
    #[serde(rename = "where")]
    pub context: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub datatype: Option<String>,
    pub constraint: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub routine: Option<String>,
}

impl ServerMessage {
    /// A message with only the mandatory fields set
    #[must_use]
    pub fn new(kind: MessageKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: None,
            severity_localized: None,
            code: code.into(),
            message: message.into(),
            detail: None,
            hint: None,
            position: None,
            context: None,
            schema: None,
            table: None,
            column: None,
            datatype: None,
            constraint: None,
            file: None,
            line: None,
            routine: None,
        }
    }

    /// Copy every diagnostic field out of a driver error
    #[must_use]
    pub fn from_db_error(db: &DbError, kind: MessageKind) -> Self {
        let position = db.position().map(|pos| match pos {
            ErrorPosition::Original(p) => Position::Original(*p),
            ErrorPosition::Internal { position, query } => Position::Internal {
                position: *position,
                query: query.clone(),
            },
        });
        let localized = db.severity();

        Self {
            kind,
            // Debug names of the driver's enum match the wire names up to case
            severity: db
                .parsed_severity()
                .and_then(|sev| Severity::parse(&format!("{sev:?}"))),
            severity_localized: (!localized.is_empty()).then(|| localized.to_string()),
            code: db.code().code().to_string(),
            message: db.message().to_string(),
            detail: db.detail().map(str::to_string),
            hint: db.hint().map(str::to_string),
            position,
            context: db.where_().map(str::to_string),
            schema: db.schema().map(str::to_string),
            table: db.table().map(str::to_string),
            column: db.column().map(str::to_string),
            datatype: db.datatype().map(str::to_string),
            constraint: db.constraint().map(str::to_string),
            file: db.file().map(str::to_string),
            line: db.line(),
            routine: db.routine().map(str::to_string),
        }
    }

    /// Whether this carries enough to count as server-reported
    ///
    /// Notices always do. Errors need a severity field, non-localized or not.
    #[must_use]
    pub fn is_server_reported(&self) -> bool {
        match self.kind {
            MessageKind::Notice => true,
            MessageKind::Error => {
                self.severity.is_some()
                    || self
                        .severity_localized
                        .as_deref()
                        .is_some_and(|s| !s.trim().is_empty())
            }
        }
    }

    /// Label for the first line: the untranslated severity when known
    #[must_use]
    pub fn severity_label(&self) -> &str {
        if let Some(sev) = self.severity {
            return sev.as_str();
        }
        match self.severity_localized.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => match self.kind {
                MessageKind::Notice => "NOTICE",
                MessageKind::Error => "ERROR",
            },
        }
    }

    /// Multi-line rendering of every field that is present
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("{}:  ", self.severity_label());
        if !self.code.is_empty() {
            out.push_str(&self.code);
            out.push_str(": ");
        }
        out.push_str(&self.message);

        let mut line = |label: &str, value: &str| {
            out.push('\n');
            out.push_str(label);
            out.push_str(":  ");
            out.push_str(value);
        };

        if let Some(detail) = &self.detail {
            line("DETAIL", detail);
        }
        if let Some(hint) = &self.hint {
            line("HINT", hint);
        }
        match &self.position {
            Some(Position::Original(p)) => line("POSITION", &p.to_string()),
            Some(Position::Internal { position, query }) => {
                line("INTERNAL POSITION", &position.to_string());
                line("QUERY", query);
            }
            None => {}
        }
        if let Some(context) = &self.context {
            line("CONTEXT", context);
        }
        if let Some(schema) = &self.schema {
            line("SCHEMA NAME", schema);
        }
        if let Some(table) = &self.table {
            line("TABLE NAME", table);
        }
        if let Some(column) = &self.column {
            line("COLUMN NAME", column);
        }
        if let Some(datatype) = &self.datatype {
            line("DATATYPE NAME", datatype);
        }
        if let Some(constraint) = &self.constraint {
            line("CONSTRAINT NAME", constraint);
        }
        if let Some(location) = self.location() {
            line("LOCATION", &location);
        }
        out
    }

    fn location(&self) -> Option<String> {
        let file = match (&self.file, self.line) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            (Some(file), None) => Some(file.clone()),
            (None, _) => None,
        };
        match (&self.routine, file) {
            (Some(routine), Some(file)) => Some(format!("{routine}, {file}")),
            (Some(routine), None) => Some(routine.clone()),
            (None, file) => file,
        }
    }
}

/// A failure that did not come from the database server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFailure {
    pub message: String,
    /// The `source()` chain, one cause per line
    pub trace: Option<String>,
}

impl ClientFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }
}

impl fmt::Display for ClientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The verdict of [`classify`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Diagnostic {
    Server(ServerMessage),
    Client(ClientFailure),
}

/// Anything that can be classified
pub trait DiagnosticSource: fmt::Display {
    /// The server's diagnostic fields, when the server produced this value
    fn server_message(&self) -> Option<ServerMessage>;

    /// A trace for the client-failure case
    fn trace(&self) -> Option<String> {
        None
    }
}

impl DiagnosticSource for tokio_postgres::Error {
    fn server_message(&self) -> Option<ServerMessage> {
        self.as_db_error()
            .map(|db| ServerMessage::from_db_error(db, MessageKind::Error))
    }

    fn trace(&self) -> Option<String> {
        source_chain(self)
    }
}

/// Decide whether `err` is a server message or a client failure
///
/// Pure: the same value always classifies the same way.
pub fn classify<E: DiagnosticSource + ?Sized>(err: &E) -> Diagnostic {
    match err.server_message() {
        Some(msg) if msg.is_server_reported() => Diagnostic::Server(msg),
        _ => Diagnostic::Client(ClientFailure {
            message: err.to_string(),
            trace: err.trace(),
        }),
    }
}

fn source_chain<E: StdError + ?Sized>(err: &E) -> Option<String> {
    let mut causes = Vec::new();
    let mut next = err.source();
    while let Some(cause) = next {
        causes.push(format!("caused by: {cause}"));
        next = cause.source();
    }
    (!causes.is_empty()).then(|| causes.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        text: &'static str,
        server: Option<ServerMessage>,
    }

    impl fmt::Display for Fake {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.text)
        }
    }

    impl DiagnosticSource for Fake {
        fn server_message(&self) -> Option<ServerMessage> {
            self.server.clone()
        }

        fn trace(&self) -> Option<String> {
            Some("at fake".to_string())
        }
    }

    fn missing_table() -> ServerMessage {
        ServerMessage {
            severity: Some(Severity::Error),
            severity_localized: Some("FEHLER".to_string()),
            position: Some(Position::Original(15)),
            file: Some("parse_relation.c".to_string()),
            line: Some(1392),
            routine: Some("parserOpenTable".to_string()),
            ..ServerMessage::new(
                MessageKind::Error,
                "42P01",
                "relation \"missing_table\" does not exist",
            )
        }
    }

    #[test]
    fn error_with_severity_is_server_message() {
        let err = Fake {
            text: "db error",
            server: Some(missing_table()),
        };
        assert!(matches!(classify(&err), Diagnostic::Server(m) if m.code == "42P01"));
    }

    #[test]
    fn error_without_any_severity_is_client_failure() {
        let err = Fake {
            text: "malformed reply",
            server: Some(ServerMessage::new(MessageKind::Error, "XX000", "boom")),
        };
        assert_eq!(
            classify(&err),
            Diagnostic::Client(ClientFailure {
                message: "malformed reply".to_string(),
                trace: Some("at fake".to_string()),
            })
        );
    }

    #[test]
    fn notice_without_severity_is_still_server_message() {
        let err = Fake {
            text: "notice",
            server: Some(ServerMessage::new(MessageKind::Notice, "00000", "hello")),
        };
        assert!(matches!(classify(&err), Diagnostic::Server(m) if m.kind == MessageKind::Notice));
    }

    #[test]
    fn localized_severity_alone_counts() {
        let msg = ServerMessage {
            severity_localized: Some("ERREUR".to_string()),
            ..ServerMessage::new(MessageKind::Error, "42601", "erreur de syntaxe")
        };
        assert!(msg.is_server_reported());
        assert_eq!(msg.severity_label(), "ERREUR");
    }

    #[test]
    fn classification_is_idempotent() {
        let err = Fake {
            text: "db error",
            server: Some(missing_table()),
        };
        assert_eq!(classify(&err), classify(&err));

        let plain = Fake {
            text: "connection refused",
            server: None,
        };
        assert_eq!(classify(&plain), classify(&plain));
    }

    #[test]
    fn render_prefers_untranslated_severity_and_lists_fields() {
        let rendered = missing_table().render();
        assert_eq!(
            rendered,
            "ERROR:  42P01: relation \"missing_table\" does not exist\n\
             POSITION:  15\n\
             LOCATION:  parserOpenTable, parse_relation.c:1392"
        );
    }

    #[test]
    fn render_internal_position_includes_query() {
        let msg = ServerMessage {
            severity: Some(Severity::Error),
            detail: Some("d".to_string()),
            hint: Some("h".to_string()),
            position: Some(Position::Internal {
                position: 3,
                query: "SELECT x".to_string(),
            }),
            context: Some("PL/pgSQL function f() line 3".to_string()),
            table: Some("t".to_string()),
            constraint: Some("t_pkey".to_string()),
            ..ServerMessage::new(MessageKind::Error, "23505", "duplicate key")
        };
        let rendered = msg.render();
        assert!(rendered.contains("\nDETAIL:  d"));
        assert!(rendered.contains("\nHINT:  h"));
        assert!(rendered.contains("\nINTERNAL POSITION:  3\nQUERY:  SELECT x"));
        assert!(rendered.contains("\nCONTEXT:  PL/pgSQL function f() line 3"));
        assert!(rendered.contains("\nTABLE NAME:  t"));
        assert!(rendered.contains("\nCONSTRAINT NAME:  t_pkey"));
    }

    #[test]
    fn severity_parse_ignores_case() {
        assert_eq!(Severity::parse("warning"), Some(Severity::Warning));
        assert_eq!(Severity::parse("Panic"), Some(Severity::Panic));
        assert_eq!(Severity::parse("FEHLER"), None);
    }

    #[derive(Debug)]
    struct Wrapped(std::io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("error communicating with the server")
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn client_trace_lists_the_cause_chain() {
        let err = Wrapped(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert_eq!(source_chain(&err), Some("caused by: reset by peer".to_string()));
        assert_eq!(source_chain(&err.0), None);
    }
}
