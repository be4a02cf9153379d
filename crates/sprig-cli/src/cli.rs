use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sprig")]
#[command(about = "Offline-first wellness companion for the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in to the sync backend
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show session and sync status
    Status,
    /// Reconcile local data with the backend
    Sync {
        /// Skip the debounce and run immediately
        #[arg(long)]
        force: bool,
    },
    /// Push local changes immediately (same as `sync --force`)
    Push,
    /// Manage the wellness profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Record today's wellness log
    Log {
        /// Reported mood (e.g. "calm", "foggy")
        #[arg(long)]
        mood: Option<String>,
        /// Energy level, 1-5
        #[arg(long)]
        energy: Option<i32>,
        /// Symptom for the day (repeatable)
        #[arg(long = "symptom", value_name = "NAME")]
        symptoms: Vec<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// UTC date to log for (YYYY-MM-DD, default today)
        #[arg(long, value_name = "DATE")]
        date: Option<String>,
    },
    /// Record a habit check-in for today
    Checkin,
    /// Manage the herbal cabinet
    Cabinet {
        #[command(subcommand)]
        command: CabinetCommands,
    },
    /// Manage program enrollments
    Program {
        #[command(subcommand)]
        command: ProgramCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Set the profile from quiz results
    Set {
        /// Constitution classification (e.g. "vata")
        #[arg(long)]
        constitution: String,
        /// Wellness goal (repeatable)
        #[arg(long = "goal", value_name = "NAME")]
        goals: Vec<String>,
        /// Reported symptom (repeatable)
        #[arg(long = "symptom", value_name = "NAME")]
        symptoms: Vec<String>,
    },
    /// Show the current profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum CabinetCommands {
    /// Add an ingredient to the cabinet
    Add {
        /// Ingredient identifier (e.g. "ashwagandha")
        ingredient: String,
    },
    /// Record that an ingredient was just used
    Use {
        /// Ingredient identifier
        ingredient: String,
    },
    /// Mark or unmark an ingredient as a staple
    Staple {
        /// Ingredient identifier
        ingredient: String,
        /// Remove the staple mark instead
        #[arg(long)]
        off: bool,
    },
    /// List the cabinet
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ProgramCommands {
    /// Enroll in a wellness program
    Enroll {
        /// Program identifier (e.g. "21-day-reset")
        program: String,
        /// Start date (YYYY-MM-DD, default today)
        #[arg(long, value_name = "DATE")]
        start: Option<String>,
    },
    /// Advance a program to its next day
    Advance {
        /// Program identifier
        program: String,
    },
    /// Mark a program as completed
    Complete {
        /// Program identifier
        program: String,
    },
    /// List enrollments
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
