//! tgstream - Stream Telegram media over HTTP
//!
//! Usage:
//!   tgstream serve                         - Sign in and start the HTTP server
//!   tgstream token <chat_id> <message_id>  - Print the stream path for a message
//!   tgstream decode <token>                - Show which message a token points at

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tgstream::{
    config::Config,
    server::{self, AppState},
    telegram::TelegramBackend,
    token,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tgstream")]
#[command(version)]
#[command(about = "Stream Telegram media over HTTP with byte range support")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "~/.config/tgstream/config.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in as the bot and serve /stream/{token}
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the stream path for a message
    Token {
        /// Chat ID (channels use the -100 prefix)
        #[arg(allow_hyphen_values = true)]
        chat_id: i64,

        /// Message ID
        message_id: i32,
    },

    /// Decode a stream token
    Decode {
        /// Token from a stream URL
        token: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = expand_tilde(&cli.config);

    if let Err(e) = run_command(cli.command, &config_path) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_command(command: Commands, config_path: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Serve { port } => cmd_serve(config_path, port),
        Commands::Token {
            chat_id,
            message_id,
        } => {
            println!("Token: {}", token::encode(chat_id, message_id));
            println!("Path:  {}", token::stream_path(chat_id, message_id));
            Ok(())
        }
        Commands::Decode { token } => cmd_decode(&token),
    }
}

fn cmd_serve(config_path: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load_or_env(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    runtime.block_on(async {
        let backend = TelegramBackend::connect(config.telegram.clone())
            .await
            .context("Failed to connect to Telegram")?;
        backend
            .ensure_bot_session()
            .await
            .context("Failed to sign in as bot")?;
        info!("Home data center is DC {}", backend.home_dc());

        let pool = Arc::new(backend.sender_pool());
        let backend = Arc::new(backend);
        let state = AppState::new(backend.clone(), pool, config.stream.clone());

        let served = server::serve(&config.server, state).await;
        backend.disconnect();
        served?;
        Ok::<_, anyhow::Error>(())
    })
}

fn cmd_decode(value: &str) -> anyhow::Result<()> {
    let message = token::decode(value)?;

    println!("Chat ID:    {}", message.chat_id);
    println!("Message ID: {}", message.message_id);
    println!("Path:       {}", token::stream_path(message.chat_id, message.message_id));

    Ok(())
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
