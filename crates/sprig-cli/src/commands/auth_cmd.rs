use std::path::PathBuf;

use sprig_core::auth::{AuthClient, SessionPersistence};
use sprig_core::config::BackendConfig;
use sprig_core::db::SyncMetaStore;
use sprig_core::sync::timestamp::parse_timestamp;

use crate::commands::common::open_database;
use crate::error::CliError;
use crate::session::FileSessionStore;

pub async fn run_login(email: &str, password: &str) -> Result<(), CliError> {
    let config = BackendConfig::from_env()
        .map_err(|error| CliError::Config(error.to_string()))?
        .ok_or(CliError::SyncNotConfigured)?;
    let client = AuthClient::new(&config).map_err(|error| CliError::Auth(error.to_string()))?;

    let session = client
        .sign_in(email, password)
        .await
        .map_err(|error| CliError::Auth(error.to_string()))?;

    let store = FileSessionStore::default_location()?;
    store
        .save_session(&session)
        .map_err(|error| CliError::Auth(error.to_string()))?;

    let email_label = session.user.email.as_deref().unwrap_or("(no email)");
    println!("Signed in as {email_label}");
    Ok(())
}

pub fn run_logout() -> Result<(), CliError> {
    let store = FileSessionStore::default_location()?;
    store
        .clear_session()
        .map_err(|error| CliError::Auth(error.to_string()))?;
    println!("Signed out");
    Ok(())
}

pub fn run_status(db_path: Option<PathBuf>) -> Result<(), CliError> {
    let store = FileSessionStore::default_location()?;
    let session = store
        .load_session()
        .map_err(|error| CliError::Auth(error.to_string()))?;

    match &session {
        Some(session) => {
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            let freshness = if session.is_expired() {
                "token expired; will refresh on next sync"
            } else {
                "token valid"
            };
            println!("Signed in as {email_label} ({freshness})");
        }
        None => println!("Not signed in"),
    }

    match BackendConfig::from_env().map_err(|error| CliError::Config(error.to_string()))? {
        Some(config) => println!("Backend: {}", config.base_url),
        None => println!("Backend: not configured (local-only mode)"),
    }

    let db = open_database(db_path)?;
    let last_started = SyncMetaStore::new(db.connection())
        .get(SyncMetaStore::LAST_SYNC_STARTED_AT)?
        .as_deref()
        .map(parse_timestamp);
    match last_started {
        Some(stamp) => println!("Last sync started: {stamp}"),
        None => println!("Last sync started: never"),
    }

    Ok(())
}
