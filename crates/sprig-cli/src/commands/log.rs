use std::path::PathBuf;

use sprig_core::db::{DailyLogStore, ProgressStore};
use sprig_core::models::{DailyLog, ProgressRecord};

use crate::commands::common::{current_owner, open_database, parse_cli_date, today};
use crate::error::CliError;
use crate::session::FileSessionStore;

pub struct LogArgs {
    pub mood: Option<String>,
    pub energy: Option<i32>,
    pub symptoms: Vec<String>,
    pub notes: Option<String>,
    pub date: Option<String>,
}

pub fn run_log(args: LogArgs, db_path: Option<PathBuf>) -> Result<(), CliError> {
    if let Some(energy) = args.energy {
        if !(1..=5).contains(&energy) {
            return Err(CliError::InvalidInput(
                "energy must be between 1 and 5".to_string(),
            ));
        }
    }

    let log_date = match args.date.as_deref() {
        Some(text) => parse_cli_date(text)?,
        None => today(),
    };

    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let store = DailyLogStore::new(db.connection());

    let mut log = store
        .get_by_date(&owner, log_date)?
        .unwrap_or_else(|| DailyLog::new(owner, log_date));
    log.record(args.mood, args.energy, args.symptoms, args.notes);
    store.save_all(std::slice::from_ref(&log))?;

    println!("Logged {}", log.date_key());
    Ok(())
}

pub fn run_checkin(db_path: Option<PathBuf>) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let store = ProgressStore::new(db.connection());

    let mut progress = store
        .get(&owner)?
        .unwrap_or_else(|| ProgressRecord::new(owner));
    progress.record_check_in(today());
    store.upsert(&progress)?;

    println!(
        "Checked in. Current streak: {} day(s), longest: {}",
        progress.current_streak, progress.longest_streak
    );
    Ok(())
}
