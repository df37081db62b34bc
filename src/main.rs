mod config;
mod server;

use std::{
    fs,
    io::{self, BufReader},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use ftail::Ftail;
use log::info;

use config::{Config, config_path, load_config};
use deckgen_mcp::{BackendClient, catalog};
use server::Server;

/// Presentation tools for AI assistants, served over stdio.
#[derive(Debug, Parser)]
#[command(name = "deckgen", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/deckgen/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the presentation backend.
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// File to write logs to.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Serve tool calls on stdin/stdout (default).
    Serve,
    /// Print the tool catalog as JSON and exit.
    Tools,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Tools => print_tools(),
        Command::Serve => run_server(&config),
    }
}

/// Defaults, then the config file, then the environment, then CLI flags.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(config_path);
    let mut config = load_config(&path)?.with_env(|key| std::env::var(key).ok());

    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(file) = &cli.log_file {
        config.log_file = file.clone();
    }
    Ok(config)
}

fn init_logging(config: &Config) -> Result<()> {
    if let Some(parent) = config.log_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    // Logs go to a file: stdout carries the protocol.
    Ftail::new()
        .single_file(&config.log_file, true, config.level_filter()?)
        .init()
        .map_err(|e| anyhow!("initializing logger: {e:?}"))
}

fn run_server(config: &Config) -> Result<()> {
    init_logging(config)?;

    let backend = BackendClient::new(config.backend()).context("building backend client")?;
    info!(
        "deckgen {} serving on stdio, backend={} timeout={}s",
        env!("CARGO_PKG_VERSION"),
        backend.base_url(),
        config.timeout_secs
    );

    let server = Arc::new(Server::new(catalog(), Box::new(backend)));
    server::serve(server, BufReader::new(io::stdin()), &mut io::stdout())
}

fn print_tools() -> Result<()> {
    let tools: Vec<_> = catalog().defs().iter().map(|d| d.listing()).collect();
    let json = serde_json::to_string_pretty(&tools).context("serializing tool catalog")?;
    println!("{json}");
    Ok(())
}
