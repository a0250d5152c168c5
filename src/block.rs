use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnostic::{ClientFailure, MessageKind, ServerMessage};
use crate::results::QueryResult;

/// Subtype of a text reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSubtype {
    Notice,
    Error,
}

impl From<MessageKind> for TextSubtype {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Notice => TextSubtype::Notice,
            MessageKind::Error => TextSubtype::Error,
        }
    }
}

/// One entry of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    pub when: DateTime<Utc>,
    #[serde(flatten)]
    pub body: BlockBody,
}

/// What a block holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockBody {
    /// The submitted query text, verbatim
    Question { value: String },
    /// A rendered server notice or error
    TextReply { subtype: TextSubtype, value: String },
    /// A successful query outcome
    ResultTable { result: QueryResult },
    /// A failure below the database-message layer
    ClientError { error: ClientFailure },
    /// A tag this version doesn't know; rendered as a placeholder
    #[serde(other)]
    Unknown,
}

impl BlockBody {
    #[must_use]
    pub fn question(value: impl Into<String>) -> Self {
        BlockBody::Question {
            value: value.into(),
        }
    }

    /// A text reply holding the full diagnostic rendering of `msg`
    #[must_use]
    pub fn server_message(msg: &ServerMessage) -> Self {
        BlockBody::TextReply {
            subtype: msg.kind.into(),
            value: msg.render(),
        }
    }

    /// Tag name as it appears in serialized blocks
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            BlockBody::Question { .. } => "question",
            BlockBody::TextReply { .. } => "text_reply",
            BlockBody::ResultTable { .. } => "result_table",
            BlockBody::ClientError { .. } => "client_error",
            BlockBody::Unknown => "unknown",
        }
    }

    /// Whether this settles a submission
    #[must_use]
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            BlockBody::TextReply { .. } | BlockBody::ResultTable { .. } | BlockBody::ClientError { .. }
        )
    }
}
