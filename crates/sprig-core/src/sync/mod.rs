//! Offline-first synchronization engine.
//!
//! Clients write to the local store without restriction and call
//! [`SyncCoordinator::sync`] at opportune moments (app foregrounded, after
//! a burst of edits, on a timer). A pass reconciles each collection with
//! the backend using last-write-wins on per-record timestamps; when the
//! two sides already agree, a pass moves no data at all.
//!
//! The coordinator serializes passes (a second caller is turned away, not
//! queued) and debounces them; [`SyncCoordinator::push_now`] skips the
//! debounce for moments where freshness matters, such as right before the
//! app is backgrounded.

pub mod rest;
pub mod timestamp;
pub mod transport;

mod collections;
mod strategy;

pub use collections::{CollectionFailure, SYNC_WINDOW_DAYS};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::db::{Database, SyncMetaStore};
use crate::error::Result;
use crate::models::OwnerId;
use crate::sync::timestamp::{format_timestamp, now_utc, parse_timestamp};
use crate::sync::transport::RemoteTransport;

/// Minimum gap between undebounced passes, in seconds.
pub const MIN_SYNC_INTERVAL_SECS: i64 = 30;

/// Outcome of a sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRun {
    /// A pass ran to the end. It may still carry per-collection failures.
    Completed(SyncReport),
    /// No pass ran; the reason says why. Never an error.
    Skipped(SkipReason),
}

/// Why a sync request did not start a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No session; nothing to sync against.
    NotAuthenticated,
    /// Another pass is already in flight.
    AlreadyRunning,
    /// The previous pass started too recently.
    Debounced,
}

/// What a completed pass did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Collections that failed this pass, in run order.
    pub failures: Vec<CollectionFailure>,
}

impl SyncReport {
    /// Whether every collection reconciled without error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Coordinator state surfaced to clients (status screens, CLI output).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// When the most recent pass started, if any. Survives restarts.
    pub last_started_at: Option<DateTime<Utc>>,
    /// First failure of the most recent completed pass, if any.
    pub last_error: Option<String>,
    /// Whether a pass is currently in flight.
    pub in_flight: bool,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    last_started_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Drives sync passes against one backend transport.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
pub struct SyncCoordinator<T: RemoteTransport> {
    db: Arc<Mutex<Database>>,
    transport: T,
    session: RwLock<Option<OwnerId>>,
    in_flight: AtomicBool,
    state: Mutex<CoordinatorState>,
}

impl<T: RemoteTransport> SyncCoordinator<T> {
    /// Build a coordinator over an opened database and a transport.
    ///
    /// The start stamp of the last pass is restored from the store, so the
    /// debounce spans process restarts.
    pub async fn new(db: Arc<Mutex<Database>>, transport: T) -> Result<Self> {
        let last_started_at = {
            let guard = db.lock().await;
            SyncMetaStore::new(guard.connection())
                .get(SyncMetaStore::LAST_SYNC_STARTED_AT)?
                .as_deref()
                .map(parse_timestamp)
        };

        Ok(Self {
            db,
            transport,
            session: RwLock::new(None),
            in_flight: AtomicBool::new(false),
            state: Mutex::new(CoordinatorState {
                last_started_at,
                last_error: None,
            }),
        })
    }

    /// Attach the authenticated owner; passes run on their behalf.
    pub async fn set_session(&self, owner: OwnerId) {
        *self.session.write().await = Some(owner);
    }

    /// Detach the session. Subsequent sync requests are skipped.
    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    /// Run a debounced sync pass.
    pub async fn sync(&self) -> Result<SyncRun> {
        self.run(false).await
    }

    /// Run a sync pass immediately, skipping the debounce.
    ///
    /// Still subject to the session and in-flight gates.
    pub async fn push_now(&self) -> Result<SyncRun> {
        self.run(true).await
    }

    /// Current coordinator state, for status surfaces.
    pub async fn status(&self) -> SyncStatus {
        let state = self.state.lock().await;
        SyncStatus {
            last_started_at: state.last_started_at,
            last_error: state.last_error.clone(),
            in_flight: self.in_flight.load(Ordering::SeqCst),
        }
    }

    async fn run(&self, force: bool) -> Result<SyncRun> {
        let Some(owner) = self.session.read().await.clone() else {
            debug!("sync requested without a session");
            return Ok(SyncRun::Skipped(SkipReason::NotAuthenticated));
        };

        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("sync requested while a pass is in flight");
            return Ok(SyncRun::Skipped(SkipReason::AlreadyRunning));
        }
        let _guard = FlightGuard(&self.in_flight);

        let started_at = now_utc();
        {
            let mut state = self.state.lock().await;
            if !force {
                if let Some(last) = state.last_started_at {
                    if started_at - last < Duration::seconds(MIN_SYNC_INTERVAL_SECS) {
                        debug!("sync debounced");
                        return Ok(SyncRun::Skipped(SkipReason::Debounced));
                    }
                }
            }
            state.last_started_at = Some(started_at);
        }
        {
            let db = self.db.lock().await;
            SyncMetaStore::new(db.connection()).set(
                SyncMetaStore::LAST_SYNC_STARTED_AT,
                &format_timestamp(started_at),
            )?;
        }

        let failures = collections::run_all(&self.db, &self.transport, &owner).await;

        let first_failure = failures
            .first()
            .map(|failure| format!("{}: {}", failure.collection, failure.message));
        {
            let mut state = self.state.lock().await;
            state.last_error = first_failure;
        }

        if failures.is_empty() {
            info!("sync pass completed");
        } else {
            warn!(failed = failures.len(), "sync pass completed with failures");
        }

        Ok(SyncRun::Completed(SyncReport { failures }))
    }
}

/// Clears the in-flight flag when a pass ends, however it ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::transport::mock::MockTransport;
    use super::*;
    use crate::db::{CabinetStore, ProfileStore};
    use crate::models::{CabinetItem, Profile};

    fn owner() -> OwnerId {
        OwnerId::new("user-1")
    }

    fn database() -> Arc<Mutex<Database>> {
        Arc::new(Mutex::new(Database::open_in_memory().unwrap()))
    }

    async fn coordinator(db: Arc<Mutex<Database>>) -> SyncCoordinator<MockTransport> {
        let coordinator = SyncCoordinator::new(db, MockTransport::new()).await.unwrap();
        coordinator.set_session(owner()).await;
        coordinator
    }

    #[tokio::test]
    async fn test_sync_without_session_is_skipped() {
        let coordinator = SyncCoordinator::new(database(), MockTransport::new())
            .await
            .unwrap();

        let run = coordinator.sync().await.unwrap();
        assert_eq!(run, SyncRun::Skipped(SkipReason::NotAuthenticated));

        // No pass means no recorded start.
        assert_eq!(coordinator.status().await.last_started_at, None);
    }

    #[tokio::test]
    async fn test_second_immediate_sync_is_debounced() {
        let coordinator = coordinator(database()).await;

        let first = coordinator.sync().await.unwrap();
        assert!(matches!(first, SyncRun::Completed(_)));

        let second = coordinator.sync().await.unwrap();
        assert_eq!(second, SyncRun::Skipped(SkipReason::Debounced));
    }

    #[tokio::test]
    async fn test_push_now_skips_the_debounce() {
        let coordinator = coordinator(database()).await;

        coordinator.sync().await.unwrap();
        let run = coordinator.push_now().await.unwrap();
        assert!(matches!(run, SyncRun::Completed(_)));
    }

    #[tokio::test]
    async fn test_debounce_survives_restart() {
        let db = database();

        let first = coordinator(Arc::clone(&db)).await;
        first.sync().await.unwrap();

        // A fresh coordinator over the same store restores the stamp.
        let second = coordinator(db).await;
        let run = second.sync().await.unwrap();
        assert_eq!(run, SyncRun::Skipped(SkipReason::Debounced));
    }

    #[tokio::test]
    async fn test_repeated_pass_moves_no_data() {
        let db = database();
        {
            let guard = db.lock().await;
            ProfileStore::new(guard.connection())
                .upsert(&Profile::new(owner(), "vata"))
                .unwrap();
            CabinetStore::new(guard.connection())
                .save_all(&[CabinetItem::new(owner(), "tulsi")])
                .unwrap();
        }
        let coordinator = coordinator(db).await;

        coordinator.push_now().await.unwrap();
        let writes_after_first = coordinator.transport.write_count();
        assert_eq!(writes_after_first, 2);

        let run = coordinator.push_now().await.unwrap();
        assert!(matches!(run, SyncRun::Completed(ref report) if report.is_clean()));
        assert_eq!(coordinator.transport.write_count(), writes_after_first);
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported_not_fatal() {
        let db = database();
        {
            let guard = db.lock().await;
            ProfileStore::new(guard.connection())
                .upsert(&Profile::new(owner(), "vata"))
                .unwrap();
        }
        let coordinator = coordinator(db).await;
        coordinator.transport.fail_collection("progress_records");

        let run = coordinator.push_now().await.unwrap();
        let SyncRun::Completed(report) = run else {
            panic!("expected a completed pass");
        };
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].collection, "progress_records");

        // Healthy collections synced; the failure is surfaced in status.
        assert_eq!(coordinator.transport.rows("profiles").len(), 1);
        let status = coordinator.status().await;
        assert!(status
            .last_error
            .as_deref()
            .is_some_and(|error| error.starts_with("progress_records:")));
    }

    #[tokio::test]
    async fn test_clean_pass_clears_last_error() {
        let coordinator = coordinator(database()).await;
        coordinator.transport.fail_collection("profiles");

        coordinator.push_now().await.unwrap();
        assert!(coordinator.status().await.last_error.is_some());

        coordinator.transport.heal_collection("profiles");
        coordinator.push_now().await.unwrap();
        assert_eq!(coordinator.status().await.last_error, None);
    }
}
