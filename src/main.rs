use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use pitboard::config::AppConfig;
use pitboard::provision;
use pitboard::server;
use pitboard::trello::{BoardService, TrelloClient};

#[derive(Parser)]
#[command(name = "pitboard")]
#[command(version, about = "Pit help-request form that files submissions as Trello cards")]
struct Cli {
    /// Path to the config file
    #[arg(long, default_value = "config/pitboard.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (the default when no subcommand is given)
    Serve,
    /// Create any missing taxonomy labels on every configured board
    VerifyLabels,
    /// Delete ALL labels on a board (or on every configured board).
    /// Destructive: removes operator-created labels too.
    NukeLabels {
        /// Short board id to target; omitted means every configured board
        #[arg(long)]
        board: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pitboard=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => server::start_server(config).await,
        Commands::VerifyLabels => verify_labels(config).await,
        Commands::NukeLabels { board, yes } => nuke_labels(config, board, yes).await,
    }
}

async fn verify_labels(config: AppConfig) -> Result<()> {
    let service = trello_service(&config)?;
    let summary = provision::verify_labels(&config, service.as_ref()).await;
    println!(
        "Checked {} board(s): {} label(s) created, {} failure(s).",
        summary.boards_checked,
        style(summary.labels_created).green(),
        if summary.failures > 0 {
            style(summary.failures).red()
        } else {
            style(summary.failures).green()
        }
    );
    Ok(())
}

async fn nuke_labels(config: AppConfig, board: Option<String>, yes: bool) -> Result<()> {
    let target = match &board {
        Some(id) => format!("board {}", id),
        None => "ALL configured boards".to_string(),
    };
    if !yes {
        println!(
            "{}",
            style(format!(
                "This will delete every label on {}, including any you created \
                 yourself. There is no undo.",
                target
            ))
            .yellow()
        );
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Delete all labels?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Nothing deleted.");
            return Ok(());
        }
    }

    let service = trello_service(&config)?;
    let deleted = match board {
        Some(id) => provision::delete_all_labels_on_board(&id, service.as_ref()).await,
        None => provision::delete_all_labels_on_all_boards(&config, service.as_ref()).await,
    };
    println!("Deleted {} label(s) on {}.", style(deleted).red(), target);
    println!("Run `pitboard verify-labels` to recreate the taxonomy.");
    Ok(())
}

fn trello_service(config: &AppConfig) -> Result<Arc<dyn BoardService>> {
    let client =
        TrelloClient::new(config.trello.clone()).context("Failed to build Trello client")?;
    Ok(Arc::new(client))
}
