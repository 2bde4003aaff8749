//! Command-line surface: one-shot subcommands and the stdin REPL.

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::assistant::Assistant;

#[derive(Debug, Parser)]
#[command(name = "jarvis", version, about = "A personal productivity assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Answer a single command and exit.
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Print the daily snapshot and exit.
    Snapshot,
}

/// What a REPL line asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput<'a> {
    Quit,
    Snapshot,
    Clear,
    Skip,
    Command(&'a str),
}

pub fn parse_repl_line(line: &str) -> ReplInput<'_> {
    match line.trim() {
        "" => ReplInput::Skip,
        "/quit" | "/exit" => ReplInput::Quit,
        "/snapshot" => ReplInput::Snapshot,
        "/clear" => ReplInput::Clear,
        command => ReplInput::Command(command),
    }
}

/// Read commands line by line until EOF or `/quit`, writing each reply.
pub async fn run_repl<R, W>(assistant: &mut Assistant, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let reply = match parse_repl_line(&line) {
            ReplInput::Quit => break,
            ReplInput::Skip => {
                eprint!("> ");
                continue;
            }
            ReplInput::Clear => {
                assistant.clear_history();
                "History cleared.".to_string()
            }
            ReplInput::Snapshot => assistant.get_snapshot().await,
            ReplInput::Command(command) => assistant.process_command(command).await,
        };
        output
            .write_all(format!("Jarvis: {}\n\n", reply).as_bytes())
            .await?;
        output.flush().await?;
        eprint!("> ");
    }
    Ok(())
}

/// REPL over the process's stdin and stdout.
pub async fn run_stdin_repl(assistant: &mut Assistant) -> std::io::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_repl(assistant, stdin, tokio::io::stdout()).await
}
