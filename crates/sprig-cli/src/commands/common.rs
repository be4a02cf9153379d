//! Shared plumbing for command handlers.

use std::path::PathBuf;

use chrono::NaiveDate;
use sprig_core::auth::SessionPersistence;
use sprig_core::db::Database;
use sprig_core::models::parse_date_key;
use sprig_core::OwnerId;

use crate::error::CliError;
use crate::session::FileSessionStore;

const DB_FILE: &str = "sprig.db";

/// Owner used for records created before the first sign-in. Such records
/// stay local; they are re-owned nowhere and never synced.
const LOCAL_OWNER: &str = "local";

pub fn resolve_db_path(flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let base = dirs::data_dir().ok_or_else(|| {
        CliError::Config("could not determine a data directory; pass --db-path".to_string())
    })?;
    Ok(base.join("sprig").join(DB_FILE))
}

pub fn open_database(flag: Option<PathBuf>) -> Result<Database, CliError> {
    Ok(Database::open(resolve_db_path(flag)?)?)
}

/// The owner local writes are attributed to.
///
/// Uses the stored session even when its access token has expired; the
/// owner identity does not change across refreshes.
pub fn current_owner(store: &FileSessionStore) -> Result<OwnerId, CliError> {
    let session = store
        .load_session()
        .map_err(|error| CliError::Auth(error.to_string()))?;
    Ok(session.map_or_else(|| OwnerId::new(LOCAL_OWNER), |session| session.owner()))
}

pub fn parse_cli_date(text: &str) -> Result<NaiveDate, CliError> {
    parse_date_key(text)
        .map_err(|_| CliError::InvalidInput(format!("'{text}' is not a YYYY-MM-DD date")))
}

pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_date() {
        assert_eq!(
            parse_cli_date("2024-03-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert!(parse_cli_date("03/05/2024").is_err());
    }

    #[test]
    fn test_db_path_flag_wins() {
        let path = resolve_db_path(Some(PathBuf::from("/tmp/custom.db"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.db"));
    }
}
