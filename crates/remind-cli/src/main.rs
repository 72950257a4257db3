//! remind CLI - manage reminders on the primary device
//!
//! Every change is written locally first, then queued for the watch and TV.

mod cli;
mod commands;
mod error;


use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use remind_core::config::SyncSettings;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::clear_pending::run_clear_pending;
use crate::commands::common::{load_settings, resolve_config_path, resolve_db_path};
use crate::commands::complete::run_complete;
use crate::commands::completions::run_completions;
use crate::commands::daemon::run_daemon;
use crate::commands::delete::run_delete;
use crate::commands::discover::run_discover;
use crate::commands::edit::{run_edit, ReminderEdit};
use crate::commands::flush::{run_flush, run_snapshot};
use crate::commands::list::run_list;
use crate::commands::pending::run_pending;
use crate::commands::status::run_status;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

async fn run() -> Result<(), CliError> {
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("remind=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path, env_lookup)?;
    let settings = settings_for(cli.config)?;

    match command {
        Commands::Add {
            title,
            description,
            at,
            due,
        } => {
            run_add(
                &title,
                description,
                at.as_deref(),
                due.as_deref(),
                &db_path,
                &settings,
            )
            .await?;
        }
        Commands::Edit {
            id,
            title,
            description,
            at,
            due,
            clear_at,
            clear_due,
        } => {
            let edit = ReminderEdit {
                title,
                description,
                at,
                due,
                clear_at,
                clear_due,
            };
            run_edit(&id, &edit, &db_path, &settings).await?;
        }
        Commands::Complete { id, undo } => run_complete(&id, undo, &db_path, &settings).await?,
        Commands::Delete { id } => run_delete(&id, &db_path, &settings).await?,
        Commands::List { active, json } => run_list(active, json, &db_path).await?,
        Commands::Pending { json } => run_pending(json, &db_path).await?,
        Commands::Flush => run_flush(&db_path, &settings).await?,
        Commands::Snapshot => run_snapshot(&db_path, &settings).await?,
        Commands::Status { json } => run_status(json, &db_path, &settings).await?,
        Commands::Discover => run_discover(&settings).await?,
        Commands::ClearPending => run_clear_pending(&db_path).await?,
        Commands::Daemon => run_daemon(&db_path, &settings).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn settings_for(cli_config: Option<PathBuf>) -> Result<SyncSettings, CliError> {
    let config_path = resolve_config_path(cli_config, env_lookup)?;
    let settings = load_settings(&config_path, env_lookup)?;
    if !settings.role.is_primary() {
        tracing::warn!(
            role = settings.role.as_str(),
            "Configured role is not primary; snapshots and inbound relays are disabled"
        );
    }
    Ok(settings)
}
