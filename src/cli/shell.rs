//! Interactive loop that accepts the same commands as the binary.

use super::ui;
use crate::{App, AppCommand};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(no_binary_name = true, name = "valuta", disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: AppCommand,
}

#[derive(Debug, PartialEq)]
enum ShellInput {
    Empty,
    Exit,
    Command(AppCommand),
    /// Help text or a usage error from the parser.
    Message(String),
}

fn parse_line(line: &str) -> ShellInput {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => ShellInput::Empty,
        ["exit"] | ["quit"] => ShellInput::Exit,
        _ => match ShellLine::try_parse_from(words) {
            Ok(ShellLine {
                command: AppCommand::Setup | AppCommand::Shell,
            }) => ShellInput::Message("This command is not available inside the shell".to_string()),
            Ok(parsed) => ShellInput::Command(parsed.command),
            Err(e) => ShellInput::Message(e.render().to_string()),
        },
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush().context("Failed to flush stdout")
}

/// Reads commands from `input` until `exit` or end of input.
pub async fn run<R: AsyncBufRead + Unpin>(app: &App, input: R) -> Result<()> {
    println!("{}", ui::style_text("valuta shell", ui::StyleType::Title));
    println!(
        "{}",
        ui::style_text("Type 'help' for commands, 'exit' to quit", ui::StyleType::Subtle)
    );

    let mut lines = input.lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            println!();
            break;
        };

        match parse_line(&line) {
            ShellInput::Empty => {}
            ShellInput::Exit => break,
            ShellInput::Message(text) => println!("{}", text.trim_end()),
            ShellInput::Command(cmd) => {
                debug!("Shell command: {cmd:?}");
                if let Err(e) = app.dispatch(cmd).await {
                    println!("{}", ui::error_line(&e));
                }
            }
        }
    }

    println!("Bye!");
    Ok(())
}
