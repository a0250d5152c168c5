//! Lightweight SQL text scanning.
//!
//! Splits submitted text into statements at top-level semicolons and pulls
//! out each statement's command keyword. Semicolons inside quoted strings,
//! quoted identifiers, comments and dollar-quoted bodies are skipped by a
//! small state machine; this is not a parser and will not validate anything.

mod scanner;

use scanner::{State, at, dollar_delimiter, opens_escape_string};

#[derive(Debug, Default)]
struct Scan<'a> {
    statements: Vec<&'a str>,
    /// Last significant character outside comments was a `;`
    terminated: bool,
    state_closed: bool,
}

fn scan(sql: &str) -> Scan<'_> {
    let mut scan = Scan::default();
    let mut state = State::Normal;
    let mut start = 0;
    let mut has_content = false;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                _ if at(bytes, idx, b"--") => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if at(bytes, idx, b"/*") => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b';' => {
                    if has_content {
                        scan.statements.push(sql[start..idx].trim());
                    }
                    start = idx + 1;
                    has_content = false;
                    scan.terminated = true;
                }
                _ if b.is_ascii_whitespace() => {}
                _ => {
                    match b {
                        b'\'' if opens_escape_string(bytes, idx) => state = State::EscapeQuoted,
                        b'\'' => state = State::SingleQuoted,
                        b'"' => state = State::DoubleQuoted,
                        b'$' => {
                            if let Some(delimiter) = dollar_delimiter(bytes, idx) {
                                idx += delimiter.len() - 1;
                                state = State::DollarQuoted(delimiter.to_string());
                            }
                        }
                        _ => {}
                    }
                    has_content = true;
                    scan.terminated = false;
                }
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // doubled quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::EscapeQuoted => match b {
                b'\\' => idx += 1,
                b'\'' if bytes.get(idx + 1) == Some(&b'\'') => idx += 1,
                b'\'' => state = State::Normal,
                _ => {}
            },
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if at(bytes, idx, b"/*") {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if at(bytes, idx, b"*/") {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref delimiter) => {
                if at(bytes, idx, delimiter.as_bytes()) {
                    idx += delimiter.len() - 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    if has_content {
        scan.statements.push(sql[start..].trim());
    }
    scan.state_closed = state.is_closed();
    scan
}

/// The non-empty statements in `sql`, trimmed, without their terminators
#[must_use]
pub fn split_statements(sql: &str) -> Vec<&str> {
    scan(sql).statements
}

/// Whether `input` ends with a top-level `;`
///
/// Trailing whitespace and comments are ignored; an unterminated string,
/// identifier, block comment or dollar quote means more input is needed.
#[must_use]
pub fn is_complete(input: &str) -> bool {
    let scan = scan(input);
    scan.state_closed && scan.terminated
}

/// Upper-cased leading keyword of `statement`, after comments and parentheses
///
/// Returns an empty string when there is no keyword (empty input).
#[must_use]
pub fn command_keyword(statement: &str) -> String {
    let bytes = statement.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if at(bytes, idx, b"--") {
            while idx < bytes.len() && bytes[idx] != b'\n' {
                idx += 1;
            }
        } else if at(bytes, idx, b"/*") {
            let mut depth = 0u32;
            while idx < bytes.len() {
                if at(bytes, idx, b"/*") {
                    depth += 1;
                    idx += 2;
                } else if at(bytes, idx, b"*/") {
                    depth -= 1;
                    idx += 2;
                    if depth == 0 {
                        break;
                    }
                } else {
                    idx += 1;
                }
            }
        } else if bytes[idx].is_ascii_whitespace() || bytes[idx] == b'(' {
            idx += 1;
        } else {
            break;
        }
    }

    let end = bytes[idx.min(bytes.len())..]
        .iter()
        .position(|b| !b.is_ascii_alphabetic())
        .map_or(bytes.len(), |len| idx + len);
    statement[idx.min(end)..end].to_ascii_uppercase()
}
