use std::path::PathBuf;

use sprig_core::db::ProfileStore;
use sprig_core::models::Profile;

use crate::commands::common::{current_owner, open_database};
use crate::error::CliError;
use crate::session::FileSessionStore;

pub async fn run_set(
    constitution: &str,
    goals: Vec<String>,
    symptoms: Vec<String>,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    {
        let db = open_database(db_path.clone())?;
        let owner = current_owner(&FileSessionStore::default_location()?)?;
        let store = ProfileStore::new(db.connection());

        let profile = match store.get(&owner)? {
            Some(mut existing) => {
                existing.set_assessment(constitution, goals, symptoms);
                existing
            }
            None => {
                let mut profile = Profile::new(owner, constitution);
                profile.set_assessment(constitution, goals, symptoms);
                profile
            }
        };
        store.upsert(&profile)?;
        println!("Profile saved: {}", profile.constitution);
    }

    // A finished assessment is worth pushing right away.
    crate::commands::sync_cmd::try_push_after_write(db_path).await;
    Ok(())
}

pub fn run_show(json: bool, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let owner = current_owner(&FileSessionStore::default_location()?)?;
    let profile = ProfileStore::new(db.connection())
        .get(&owner)?
        .ok_or(CliError::NothingRecorded("profile"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("Constitution: {}", profile.constitution);
    println!(
        "Goals:        {}",
        if profile.goals.is_empty() {
            "(none)".to_string()
        } else {
            profile.goals.join(", ")
        }
    );
    println!(
        "Symptoms:     {}",
        if profile.symptoms.is_empty() {
            "(none)".to_string()
        } else {
            profile.symptoms.join(", ")
        }
    );
    Ok(())
}
