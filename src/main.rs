use anyhow::Context;
use clap::Parser;

use jarvis::cli::{self, Cli, Command};
use jarvis::Assistant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let mut assistant = Assistant::from_env().context("failed to start Jarvis")?;

    match args.command {
        Some(Command::Ask { text }) => {
            println!("{}", assistant.process_command(&text.join(" ")).await);
        }
        Some(Command::Snapshot) => {
            println!("{}", assistant.get_snapshot().await);
        }
        None => {
            eprintln!("Jarvis v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("   Model: {}", assistant.model_name());
            eprintln!("   Type a command and press Enter. /snapshot for the daily brief, /quit to exit.\n");
            cli::run_stdin_repl(&mut assistant)
                .await
                .context("error reading commands")?;
        }
    }
    Ok(())
}
