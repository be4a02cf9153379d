//! Sprig CLI - offline-first wellness companion for the terminal
//!
//! All commands work without a network connection; `sprig sync` reconciles
//! local data with the configured backend when one is available.

mod cli;
mod commands;
mod error;
mod session;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{CabinetCommands, Cli, Commands, ProfileCommands, ProgramCommands};
use crate::commands::log::LogArgs;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; used for SPRIG_BACKEND_URL / SPRIG_ANON_KEY
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let db_path = cli.db_path;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth_cmd::run_login(&email, &password).await
        }
        Commands::Logout => commands::auth_cmd::run_logout(),
        Commands::Status => commands::auth_cmd::run_status(db_path),
        Commands::Sync { force } => commands::sync_cmd::run_sync(force, db_path).await,
        Commands::Push => commands::sync_cmd::run_push(db_path).await,
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                constitution,
                goals,
                symptoms,
            } => commands::profile::run_set(&constitution, goals, symptoms, db_path).await,
            ProfileCommands::Show { json } => commands::profile::run_show(json, db_path),
        },
        Commands::Log {
            mood,
            energy,
            symptoms,
            notes,
            date,
        } => commands::log::run_log(
            LogArgs {
                mood,
                energy,
                symptoms,
                notes,
                date,
            },
            db_path,
        ),
        Commands::Checkin => commands::log::run_checkin(db_path),
        Commands::Cabinet { command } => match command {
            CabinetCommands::Add { ingredient } => commands::cabinet::run_add(&ingredient, db_path),
            CabinetCommands::Use { ingredient } => commands::cabinet::run_use(&ingredient, db_path),
            CabinetCommands::Staple { ingredient, off } => {
                commands::cabinet::run_staple(&ingredient, off, db_path)
            }
            CabinetCommands::List { json } => commands::cabinet::run_list(json, db_path),
        },
        Commands::Program { command } => match command {
            ProgramCommands::Enroll { program, start } => {
                commands::program::run_enroll(&program, start.as_deref(), db_path)
            }
            ProgramCommands::Advance { program } => {
                commands::program::run_advance(&program, db_path)
            }
            ProgramCommands::Complete { program } => {
                commands::program::run_complete(&program, db_path)
            }
            ProgramCommands::List { json } => commands::program::run_list(json, db_path),
        },
    }
}
