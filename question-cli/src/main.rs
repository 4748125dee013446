use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use question_store::config::Config;
use question_store::database::create_pool;
use question_store::observability::init_tracing;
use question_store::repository::PgQuestionsStore;

mod commands;

use commands::Command;

/// questions - inspect and manage stored questions
#[derive(Parser)]
#[command(name = "questions")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the standard search locations)
    #[arg(short, long, global = true, value_name = "PATH", env = "QUESTION_STORE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config)?;

    let database = config
        .database
        .as_ref()
        .context("No database configured. Set database.url or QUESTION_STORE_DATABASE__URL.")?;
    let pool = create_pool(database).await?;
    let store = PgQuestionsStore::from_config(pool, database);

    let output = commands::execute(&store, &config.pagination, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}
