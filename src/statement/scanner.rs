#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    /// `E'...'`: a backslash escapes the byte after it
    EscapeQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    /// Holds the whole `$tag$` delimiter
    DollarQuoted(String),
}

impl State {
    /// Whether text ending in this state can be sent as-is
    pub(super) fn is_closed(&self) -> bool {
        matches!(self, State::Normal | State::LineComment)
    }
}

/// Whether `pattern` occurs at `idx`
pub(super) fn at(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    bytes.get(idx..).is_some_and(|rest| rest.starts_with(pattern))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn follows_ident(bytes: &[u8], idx: usize) -> bool {
    idx > 0 && is_ident_byte(bytes[idx - 1])
}

/// Whether the quote at `idx` opens an escape string constant
///
/// `E'..'` and `e'..'` count; `typE'..'` is a typed literal and doesn't.
pub(super) fn opens_escape_string(bytes: &[u8], idx: usize) -> bool {
    idx > 0 && matches!(bytes[idx - 1], b'E' | b'e') && !follows_ident(bytes, idx - 1)
}

/// The `$tag$` delimiter opening at `start`, if there is one
///
/// Tags can't start with a digit, so `$1` stays a parameter reference, and a
/// `$` inside an identifier (`a$b`) opens nothing.
pub(super) fn dollar_delimiter(bytes: &[u8], start: usize) -> Option<&str> {
    if follows_ident(bytes, start) {
        return None;
    }
    let rest = bytes.get(start + 1..)?;
    if rest.first().is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let len = rest
        .iter()
        .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_')
        .count();
    if rest.get(len) != Some(&b'$') {
        return None;
    }
    std::str::from_utf8(&bytes[start..start + len + 2]).ok()
}
