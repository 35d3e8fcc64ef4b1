// Taskpal
// Main entry point for the taskpal binary

use clap::Parser;
use taskpal_engine::cli::{Cli, Command};
use taskpal_engine::config::Config;
use taskpal_engine::handlers::{
    handle_chat, handle_doctor, handle_history, handle_serve, handle_sessions, handle_tasks,
    OutputFormat,
};
use taskpal_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over config; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!("Taskpal v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { port } => {
            tracing::info!("Starting server...");
            handle_serve(&config, port).await
        }

        Command::Chat { session, message } => {
            handle_chat(&config, &session, &message, format).await
        }

        Command::Tasks { session } => handle_tasks(&config, &session, format).await,

        Command::History { session } => handle_history(&config, &session, format).await,

        Command::Sessions => handle_sessions(&config, format).await,

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
