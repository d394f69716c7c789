use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use js8emu::core::{config, DEFAULT_CONFIG_PATH};
use js8emu::{Result, Server};

#[derive(Parser)]
#[command(
    name = "js8emu",
    about = "JS8Call service interface emulator for client/server development",
    version
)]
struct Cli {
    /// Path to the INI configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    verbose: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { cli.log_level };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("js8emu: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("js8emu: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load(&cli.config)?;

    if cli.dry_run {
        info!("configuration OK ({} interfaces)", config.interfaces.len());
        return Ok(());
    }

    let server = Server::bind(config).await?;
    info!("JS8Emu running.");
    server.run().await
}
