use tokio_postgres::SimpleQueryMessage;

use crate::results::QueryResult;
use crate::statement::{command_keyword, split_statements};

/// Build the result of the last statement from a simple-query reply
///
/// The simple query protocol answers every statement with an optional row
/// description, its rows and a `CommandComplete`. The wire tag text isn't
/// exposed by the driver, so the command keyword comes from the statement
/// text at the same position.
#[must_use]
pub fn build_query_result(sql: &str, messages: &[SimpleQueryMessage]) -> QueryResult {
    let statements = split_statements(sql);
    let keyword = |index: usize| {
        statements
            .get(index)
            .map(|stmt| command_keyword(stmt))
            .unwrap_or_default()
    };

    let mut index = 0;
    let mut current = QueryResult::new(keyword(index));
    let mut completed: Option<QueryResult> = None;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                current.set_fields(columns.iter().map(|c| c.name().to_string()).collect());
            }
            SimpleQueryMessage::Row(row) => {
                if !current.has_fields() {
                    current.set_fields(row.columns().iter().map(|c| c.name().to_string()).collect());
                }
                let cells = (0..row.len())
                    .map(|idx| row.get(idx).map(str::to_string))
                    .collect();
                current.add_row_values(cells);
            }
            SimpleQueryMessage::CommandComplete(count) => {
                current.set_row_count(*count);
                index += 1;
                completed = Some(std::mem::replace(&mut current, QueryResult::new(keyword(index))));
            }
            _ => {}
        }
    }

    completed.unwrap_or(current)
}
