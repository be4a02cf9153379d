use std::path::PathBuf;
use std::sync::Arc;

use sprig_core::auth::AuthClient;
use sprig_core::config::BackendConfig;
use sprig_core::sync::rest::RestTransport;
use sprig_core::{SkipReason, SyncCoordinator, SyncRun};
use tokio::sync::Mutex;
use tracing::debug;

use crate::commands::common::open_database;
use crate::error::CliError;
use crate::session::FileSessionStore;

pub async fn run_sync(force: bool, db_path: Option<PathBuf>) -> Result<(), CliError> {
    let coordinator = build_coordinator(db_path).await?;
    let run = if force {
        coordinator.push_now().await?
    } else {
        coordinator.sync().await?
    };
    report(&run);
    Ok(())
}

/// `sprig push`: run immediately, for "I just changed something" moments.
pub async fn run_push(db_path: Option<PathBuf>) -> Result<(), CliError> {
    let coordinator = build_coordinator(db_path).await?;
    let run = coordinator.push_now().await?;
    report(&run);
    Ok(())
}

/// Best-effort push after a significant local write.
///
/// Quiet by design: a machine without backend config or a session is in
/// local-only mode, and a transport hiccup here is not an error the write
/// should surface. The next explicit sync picks the change up.
pub async fn try_push_after_write(db_path: Option<PathBuf>) {
    match run_push(db_path).await {
        Ok(()) => {}
        Err(CliError::SyncNotConfigured | CliError::NotSignedIn) => {
            debug!("skipping post-write push: sync not available");
        }
        Err(error) => {
            debug!(%error, "post-write push failed; will retry on next sync");
        }
    }
}

async fn build_coordinator(
    db_path: Option<PathBuf>,
) -> Result<SyncCoordinator<RestTransport>, CliError> {
    let config = BackendConfig::from_env()
        .map_err(|error| CliError::Config(error.to_string()))?
        .ok_or(CliError::SyncNotConfigured)?;

    let store = FileSessionStore::default_location()?;
    let client = AuthClient::new(&config).map_err(|error| CliError::Auth(error.to_string()))?;
    let session = client
        .restore_session(&store)
        .await
        .map_err(|error| CliError::Auth(error.to_string()))?
        .ok_or(CliError::NotSignedIn)?;

    let db = Arc::new(Mutex::new(open_database(db_path)?));
    let transport = RestTransport::new(config, session.access_token.clone())?;
    let coordinator = SyncCoordinator::new(db, transport).await?;
    coordinator.set_session(session.owner()).await;
    Ok(coordinator)
}

fn report(run: &SyncRun) {
    match run {
        SyncRun::Completed(report) if report.is_clean() => {
            println!("Sync completed");
        }
        SyncRun::Completed(report) => {
            println!(
                "Sync completed with {} failed collection(s):",
                report.failures.len()
            );
            for failure in &report.failures {
                println!("  {}: {}", failure.collection, failure.message);
            }
        }
        SyncRun::Skipped(SkipReason::Debounced) => {
            println!("Sync skipped: a pass ran recently (use --force to run anyway)");
        }
        SyncRun::Skipped(SkipReason::AlreadyRunning) => {
            println!("Sync skipped: a pass is already running");
        }
        SyncRun::Skipped(SkipReason::NotAuthenticated) => {
            println!("Sync skipped: not signed in");
        }
    }
}
