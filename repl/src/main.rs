mod args;
mod input;
mod logging;
mod output;

use std::io::{IsTerminal, Write};

use clap::Parser;
use colored::Colorize;
use sql_repl::prelude::{Block, Session, SqlReplError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::Level;

use crate::args::{Args, OutputFormat, ReplConfig};
use crate::input::{Input, MetaCommand, StatementBuffer};
use crate::logging::LogWriter;
use crate::output::{print_block, print_help};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let config = ReplConfig::from_args(args);
    let writer = LogWriter::new(config.log.clone()).unwrap_or_else(|err| {
        eprintln!("failed to open log file: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_max_level(if config.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let config_json = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());
    tracing::debug!("config: {}", config_json);

    if let Err(err) = run(&config).await {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(config: &ReplConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pg_config = config.pg_config()?;
    let session = Session::connect(&pg_config, config.policy()).await?;
    let mut appended = session.transcript().subscribe();
    let interactive = std::io::stdin().is_terminal();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer = StatementBuffer::default();
    prompt(&buffer, interactive);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(input) = buffer.push_line(&line) else {
                    prompt(&buffer, interactive);
                    continue;
                };
                match input {
                    Input::Statement(sql) => submit(&session, &sql).await,
                    Input::Meta(MetaCommand::Quit) => break,
                    Input::Meta(MetaCommand::Json) => println!("{}", session.transcript().to_json()?),
                    Input::Meta(MetaCommand::Help) => print_help(),
                    Input::Meta(MetaCommand::Unknown(cmd)) => {
                        eprintln!("{} {cmd} (try \\?)", "unknown command:".yellow());
                    }
                }
                drain(&mut appended, config.format);
                session.ensure_open()?;
                prompt(&buffer, interactive);
            }
            block = appended.recv() => match block {
                Ok(block) => {
                    // out-of-band notice while waiting for input
                    print_block(&block, config.format);
                    session.ensure_open()?;
                    prompt(&buffer, interactive);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("renderer fell behind; {missed} blocks not shown");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    if let Some(Input::Statement(sql)) = buffer.finish() {
        submit(&session, &sql).await;
        drain(&mut appended, config.format);
    }
    Ok(())
}

async fn submit(session: &Session, sql: &str) {
    match session.submit(sql).await {
        Ok(_) => {}
        Err(SqlReplError::Busy) => eprintln!("{}", "busy: a query is still running".yellow()),
        Err(err) => eprintln!("{} {err}", "error:".red().bold()),
    }
}

/// Print every block appended since the last drain
fn drain(appended: &mut broadcast::Receiver<Block>, format: OutputFormat) {
    loop {
        match appended.try_recv() {
            Ok(block) => print_block(&block, format),
            Err(TryRecvError::Lagged(missed)) => {
                tracing::warn!("renderer fell behind; {missed} blocks not shown");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn prompt(buffer: &StatementBuffer, interactive: bool) {
    if !interactive {
        return;
    }
    print!("{}", if buffer.is_empty() { "sql> " } else { "...> " });
    let _ = std::io::stdout().flush();
}
