use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::database::connection::DbConnection;

pub(crate) mod archive;
pub(crate) mod auth;
pub(crate) mod catalog;
pub(crate) mod config;
pub(crate) mod database;
pub(crate) mod error;
pub(crate) mod github;
pub(crate) mod models;
pub(crate) mod server;
pub(crate) mod storage;

#[cfg(test)]
mod tests;

#[derive(Debug, Parser)]
#[command(version, about = "Marketplace backend for shareable pipeline tasks")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Create the database schema
    InitDb,
    /// Drop every table and type owned by the server
    DropDb,
}

async fn connect_configured(config: &AppConfig) -> anyhow::Result<DbConnection> {
    let database = config
        .database
        .as_ref()
        .context("`database` section is required for schema management")?;
    Ok(DbConnection::connect(database).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::from_yaml_file(&cli.config)?;
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::run_all(&config).await?,
        Command::InitDb => connect_configured(&config).await?.init_schema().await?,
        Command::DropDb => connect_configured(&config).await?.drop_schema().await?,
    }

    Ok(())
}
