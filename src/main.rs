use anyhow::Result;
use clap::{Parser, Subcommand};
use lectern::app;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lectern", about = "Zoom recording transcription and study-question pipeline")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Print the version
    Version,
    /// Print the config file location
    ConfigPath,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("Lectern {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::ConfigPath) => {
            println!("{}", lectern::global::config_file()?.display());
            return Ok(());
        }
        None => {}
    }

    app::run_service().await
}
