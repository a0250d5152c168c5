use colored::Colorize;
use sql_repl::prelude::{Block, BlockBody, TextSubtype, render_body, render_header};

use crate::args::OutputFormat;

pub(crate) fn print_block(block: &Block, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string(block) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(id = block.id, "failed to serialize block: {err}"),
        },
        OutputFormat::Table => {
            let text = render_header(block);
            let header = text.as_str();
            let header = match &block.body {
                BlockBody::Question { .. } => header.cyan().bold(),
                BlockBody::TextReply {
                    subtype: TextSubtype::Notice,
                    ..
                } => header.yellow(),
                BlockBody::TextReply {
                    subtype: TextSubtype::Error,
                    ..
                } => header.red().bold(),
                BlockBody::ResultTable { .. } => header.green(),
                BlockBody::ClientError { .. } => header.magenta().bold(),
                BlockBody::Unknown => header.dimmed(),
            };
            println!("{header}");
            println!("{}", render_body(&block.body));
            println!();
        }
    }
}

pub(crate) fn print_help() {
    println!("{}", "Statements end with ';'. Meta commands:".white().bold());
    println!("  {}  quit", "\\q".cyan());
    println!("  {}  print the transcript as JSON", "\\json".cyan());
    println!("  {}  this help", "\\?".cyan());
}
