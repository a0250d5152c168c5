use sql_repl::statement::is_complete;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MetaCommand {
    Quit,
    Json,
    Help,
    Unknown(String),
}

impl MetaCommand {
    fn parse(line: &str) -> Self {
        match line.split_whitespace().next().unwrap_or_default() {
            "\\q" | "\\quit" => MetaCommand::Quit,
            "\\json" => MetaCommand::Json,
            "\\?" | "\\help" => MetaCommand::Help,
            other => MetaCommand::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    /// Text to submit, verbatim
    Statement(String),
    Meta(MetaCommand),
}

/// Collects lines until they form a statement ending in `;`
#[derive(Debug, Default)]
pub(crate) struct StatementBuffer {
    text: String,
}

impl StatementBuffer {
    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Feed one line; returns something to act on once the input is complete
    pub(crate) fn push_line(&mut self, line: &str) -> Option<Input> {
        if self.text.is_empty() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed.starts_with('\\') {
                return Some(Input::Meta(MetaCommand::parse(trimmed)));
            }
        } else {
            self.text.push('\n');
        }
        self.text.push_str(line);

        if is_complete(&self.text) {
            Some(Input::Statement(std::mem::take(&mut self.text)))
        } else {
            None
        }
    }

    /// Whatever is left when input ends
    pub(crate) fn finish(&mut self) -> Option<Input> {
        let rest = std::mem::take(&mut self.text);
        (!rest.trim().is_empty()).then_some(Input::Statement(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_statement_completes() {
        let mut buf = StatementBuffer::default();
        assert_eq!(
            buf.push_line("SELECT 1;"),
            Some(Input::Statement("SELECT 1;".to_string()))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn multi_line_statement_waits_for_semicolon() {
        let mut buf = StatementBuffer::default();
        assert_eq!(buf.push_line("SELECT *"), None);
        assert_eq!(buf.push_line("FROM t -- ;"), None);
        assert_eq!(buf.push_line("WHERE a = 'x;'"), None);
        assert_eq!(
            buf.push_line("  ;"),
            Some(Input::Statement(
                "SELECT *\nFROM t -- ;\nWHERE a = 'x;'\n  ;".to_string()
            ))
        );
    }

    #[test]
    fn meta_commands_only_at_statement_start() {
        let mut buf = StatementBuffer::default();
        assert_eq!(buf.push_line("  \\q"), Some(Input::Meta(MetaCommand::Quit)));
        assert_eq!(buf.push_line("\\dt"), Some(Input::Meta(MetaCommand::Unknown("\\dt".to_string()))));
        assert_eq!(buf.push_line("SELECT"), None);
        assert_eq!(buf.push_line("\\json"), None);
        assert!(!buf.is_empty());
    }

    #[test]
    fn leftover_text_is_flushed_at_end() {
        let mut buf = StatementBuffer::default();
        assert_eq!(buf.push_line("SELECT 2"), None);
        assert_eq!(buf.finish(), Some(Input::Statement("SELECT 2".to_string())));
        assert_eq!(buf.finish(), None);
    }
}
