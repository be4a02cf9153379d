use std::path::PathBuf;

use sprig_core::db::EnrollmentStore;
use sprig_core::models::ProgramEnrollment;

use crate::commands::common::{current_owner, open_database, parse_cli_date, today};
use crate::error::CliError;
use crate::session::FileSessionStore;

pub fn run_enroll(
    program: &str,
    start: Option<&str>,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let started_on = match start {
        Some(text) => parse_cli_date(text)?,
        None => today(),
    };

    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let store = EnrollmentStore::new(db.connection());

    if store.get(&owner, program)?.is_some() {
        println!("Already enrolled in '{program}'");
        return Ok(());
    }

    let enrollment = ProgramEnrollment::new(owner, program, started_on);
    store.save_all(std::slice::from_ref(&enrollment))?;
    println!("Enrolled in '{program}' starting {started_on}");
    Ok(())
}

pub fn run_advance(program: &str, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let store = EnrollmentStore::new(db.connection());

    let mut enrollment = store
        .get(&owner, program)?
        .ok_or(CliError::NothingRecorded("enrollment"))?;
    enrollment.advance_day();
    store.save_all(std::slice::from_ref(&enrollment))?;
    println!("'{program}' advanced to day {}", enrollment.current_day);
    Ok(())
}

pub fn run_complete(program: &str, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let store = EnrollmentStore::new(db.connection());

    let mut enrollment = store
        .get(&owner, program)?
        .ok_or(CliError::NothingRecorded("enrollment"))?;
    enrollment.complete();
    store.save_all(std::slice::from_ref(&enrollment))?;
    println!("'{program}' completed");
    Ok(())
}

pub fn run_list(json: bool, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let enrollments = EnrollmentStore::new(db.connection()).list(&owner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&enrollments)?);
        return Ok(());
    }

    if enrollments.is_empty() {
        println!("No program enrollments yet.");
        return Ok(());
    }

    for enrollment in &enrollments {
        let state = if enrollment.completed {
            "completed".to_string()
        } else {
            format!("day {}", enrollment.current_day)
        };
        println!(
            "{} - {state} (started {})",
            enrollment.program, enrollment.started_on
        );
    }
    Ok(())
}
