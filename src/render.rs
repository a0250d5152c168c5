//! Plain-text presentation of blocks.

use crate::block::{Block, BlockBody, TextSubtype};
use crate::results::QueryResult;

/// Shown for blocks this version can't interpret
pub const UNKNOWN_PLACEHOLDER: &str = "(unrecognized block)";

/// Shown when the server ran no statement at all (blank or comment-only text)
pub const EMPTY_QUERY: &str = "(empty query)";

/// `[id] hh:mm:ss label`
#[must_use]
pub fn render_header(block: &Block) -> String {
    let label = match &block.body {
        BlockBody::Question { .. } => "query",
        BlockBody::TextReply {
            subtype: TextSubtype::Notice,
            ..
        } => "notice",
        BlockBody::TextReply {
            subtype: TextSubtype::Error,
            ..
        } => "error",
        BlockBody::ResultTable { .. } => "result",
        BlockBody::ClientError { .. } => "client error",
        BlockBody::Unknown => "unknown",
    };
    format!("[{}] {} {label}", block.id, block.when.format("%H:%M:%S"))
}

#[must_use]
pub fn render_body(body: &BlockBody) -> String {
    match body {
        BlockBody::Question { value } => value.clone(),
        BlockBody::TextReply { value, .. } => value.clone(),
        BlockBody::ResultTable { result } => render_result(result),
        BlockBody::ClientError { error } => match &error.trace {
            Some(trace) => format!("{}\n{trace}", error.message),
            None => error.message.clone(),
        },
        BlockBody::Unknown => UNKNOWN_PLACEHOLDER.to_string(),
    }
}

/// Header line and body separated by a newline
#[must_use]
pub fn render_block(block: &Block) -> String {
    format!("{}\n{}", render_header(block), render_body(&block.body))
}

/// A table for row-returning statements, the command tag otherwise
#[must_use]
pub fn render_result(result: &QueryResult) -> String {
    if !result.has_fields() {
        if result.command.is_empty() {
            return EMPTY_QUERY.to_string();
        }
        return format!("{} {}", result.command, result.row_count).trim().to_string();
    }

    let names = result.field_names();

    // Calculate column widths
    let mut widths: Vec<usize> = names.iter().map(|n| n.chars().count()).collect();
    for row in &result.rows {
        for (i, width) in widths.iter_mut().enumerate() {
            let len = row.get_by_index(i).map_or(0, |v| cell(v).chars().count());
            *width = (*width).max(len);
        }
    }

    let mut lines = Vec::with_capacity(result.rows.len() + 3);

    let header: Vec<String> = names.iter().zip(&widths).map(|(n, w)| pad(n, *w)).collect();
    lines.push(header.join(" │ ").trim_end().to_string());
    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    lines.push(sep.join("─┼─"));

    for row in &result.rows {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| pad(&row.get_by_index(i).map(cell).unwrap_or_default(), *w))
            .collect();
        lines.push(cells.join(" │ ").trim_end().to_string());
    }

    let rows = result.rows.len();
    lines.push(format!("({rows} {})", if rows == 1 { "row" } else { "rows" }));
    lines.join("\n")
}

fn cell(value: Option<&str>) -> String {
    value.unwrap_or("NULL").to_string()
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:width$}")
}
