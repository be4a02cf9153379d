//! Per-collection sync runners.
//!
//! Each runner reads one collection from both sides, asks the planner who
//! wins, pushes the remote writes, and commits the local writes in one
//! transaction. Runners never hold the database lock across a transport
//! call. `run_all` drives the five collections in a fixed order and
//! isolates failures: one collection failing leaves the others untouched.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::db::{
    CabinetStore, DailyLogStore, Database, EnrollmentStore, ProfileStore, ProgressStore,
};
use crate::error::Result;
use crate::models::{
    format_date_key, CabinetItem, DailyLog, OwnerId, Profile, ProgramEnrollment, ProgressRecord,
    RecordId,
};
use crate::sync::strategy::{
    plan_keyed, plan_singleton, KeyedPlan, KeyedSyncEntity, SingletonPlan, SyncEntity,
};
use crate::sync::transport::{Filter, RemoteTransport};

/// Trailing window of daily logs exchanged per pass, in days.
pub const SYNC_WINDOW_DAYS: i64 = 30;

/// Wire field carrying the owner identity.
const OWNER_FIELD: &str = "user_id";

/// One collection's failure within an otherwise completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFailure {
    pub collection: &'static str,
    pub message: String,
}

impl SyncEntity for Profile {
    const COLLECTION: &'static str = "profiles";

    fn record_id(&self) -> RecordId {
        self.id
    }

    fn conflict_stamp(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_wire(&self) -> Result<Value> {
        Profile::to_wire(self)
    }

    fn from_wire(row: &Value) -> Result<Self> {
        Profile::from_wire(row)
    }

    fn absorb_remote(&mut self, remote: &Self) {
        Profile::absorb_remote(self, remote);
    }
}

impl SyncEntity for ProgressRecord {
    const COLLECTION: &'static str = "progress_records";

    fn record_id(&self) -> RecordId {
        self.id
    }

    fn conflict_stamp(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_wire(&self) -> Result<Value> {
        ProgressRecord::to_wire(self)
    }

    fn from_wire(row: &Value) -> Result<Self> {
        ProgressRecord::from_wire(row)
    }

    fn absorb_remote(&mut self, remote: &Self) {
        ProgressRecord::absorb_remote(self, remote);
    }
}

impl SyncEntity for DailyLog {
    const COLLECTION: &'static str = "daily_logs";

    fn record_id(&self) -> RecordId {
        self.id
    }

    fn conflict_stamp(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_wire(&self) -> Result<Value> {
        DailyLog::to_wire(self)
    }

    fn from_wire(row: &Value) -> Result<Self> {
        DailyLog::from_wire(row)
    }

    fn absorb_remote(&mut self, remote: &Self) {
        DailyLog::absorb_remote(self, remote);
    }
}

impl KeyedSyncEntity for DailyLog {
    fn natural_key(&self) -> String {
        self.date_key()
    }
}

impl SyncEntity for CabinetItem {
    const COLLECTION: &'static str = "cabinet_items";

    fn record_id(&self) -> RecordId {
        self.id
    }

    // Recency of use, not of edit. Entity-specific product decision.
    fn conflict_stamp(&self) -> DateTime<Utc> {
        self.usage_stamp()
    }

    fn to_wire(&self) -> Result<Value> {
        CabinetItem::to_wire(self)
    }

    fn from_wire(row: &Value) -> Result<Self> {
        CabinetItem::from_wire(row)
    }

    fn absorb_remote(&mut self, remote: &Self) {
        CabinetItem::absorb_remote(self, remote);
    }
}

impl KeyedSyncEntity for CabinetItem {
    fn natural_key(&self) -> String {
        self.ingredient.clone()
    }
}

impl SyncEntity for ProgramEnrollment {
    const COLLECTION: &'static str = "program_enrollments";

    fn record_id(&self) -> RecordId {
        self.id
    }

    fn conflict_stamp(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn to_wire(&self) -> Result<Value> {
        ProgramEnrollment::to_wire(self)
    }

    fn from_wire(row: &Value) -> Result<Self> {
        ProgramEnrollment::from_wire(row)
    }

    fn absorb_remote(&mut self, remote: &Self) {
        ProgramEnrollment::absorb_remote(self, remote);
    }
}

impl KeyedSyncEntity for ProgramEnrollment {
    fn natural_key(&self) -> String {
        self.program.clone()
    }
}

/// Read a singleton collection's remote row, if any.
///
/// The backend is expected to hold at most one row per owner; should
/// duplicates exist anyway, the one with the newest conflict stamp wins.
async fn fetch_remote_singleton<E: SyncEntity, T: RemoteTransport>(
    transport: &T,
    owner: &OwnerId,
) -> Result<Option<E>> {
    let rows = transport
        .select(E::COLLECTION, &[Filter::eq(OWNER_FIELD, owner.as_str())])
        .await?;

    let mut newest: Option<E> = None;
    for row in &rows {
        let record = E::from_wire(row)?;
        newest = match newest {
            Some(current) if current.conflict_stamp() >= record.conflict_stamp() => Some(current),
            _ => Some(record),
        };
    }
    Ok(newest)
}

/// Read a keyed collection's remote rows.
async fn fetch_remote_keyed<E: SyncEntity, T: RemoteTransport>(
    transport: &T,
    filters: &[Filter],
) -> Result<Vec<E>> {
    let rows = transport.select(E::COLLECTION, filters).await?;
    rows.iter().map(E::from_wire).collect()
}

/// Execute a singleton plan's remote half; returns the local write, if any.
async fn push_singleton<E: SyncEntity, T: RemoteTransport>(
    transport: &T,
    plan: SingletonPlan<E>,
) -> Result<Option<E>> {
    match plan {
        SingletonPlan::Noop => Ok(None),
        SingletonPlan::PushInsert(record) => {
            transport.insert(E::COLLECTION, &record.to_wire()?).await?;
            Ok(None)
        }
        SingletonPlan::PushUpdate { remote_id, record } => {
            transport
                .update(E::COLLECTION, &remote_id.as_str(), &record.to_wire()?)
                .await?;
            Ok(None)
        }
        SingletonPlan::PullWrite(record) => Ok(Some(record)),
    }
}

/// Execute a keyed plan's remote half; returns the local writes.
async fn push_keyed<E: SyncEntity, T: RemoteTransport>(
    transport: &T,
    plan: KeyedPlan<E>,
) -> Result<Vec<E>> {
    for record in &plan.push_inserts {
        transport.insert(E::COLLECTION, &record.to_wire()?).await?;
    }
    for (remote_id, record) in &plan.push_updates {
        transport
            .update(E::COLLECTION, &remote_id.as_str(), &record.to_wire()?)
            .await?;
    }
    Ok(plan.local_writes)
}

async fn sync_profile<T: RemoteTransport>(
    db: &Mutex<Database>,
    transport: &T,
    owner: &OwnerId,
) -> Result<()> {
    let local = {
        let db = db.lock().await;
        ProfileStore::new(db.connection()).get(owner)?
    };
    let remote = fetch_remote_singleton::<Profile, _>(transport, owner).await?;

    let plan = plan_singleton(local, remote);
    if let Some(record) = push_singleton(transport, plan).await? {
        let db = db.lock().await;
        ProfileStore::new(db.connection()).upsert(&record)?;
    }
    Ok(())
}

async fn sync_progress<T: RemoteTransport>(
    db: &Mutex<Database>,
    transport: &T,
    owner: &OwnerId,
) -> Result<()> {
    let local = {
        let db = db.lock().await;
        ProgressStore::new(db.connection()).get(owner)?
    };
    let remote = fetch_remote_singleton::<ProgressRecord, _>(transport, owner).await?;

    let plan = plan_singleton(local, remote);
    if let Some(record) = push_singleton(transport, plan).await? {
        let db = db.lock().await;
        ProgressStore::new(db.connection()).upsert(&record)?;
    }
    Ok(())
}

async fn sync_daily_logs<T: RemoteTransport>(
    db: &Mutex<Database>,
    transport: &T,
    owner: &OwnerId,
) -> Result<()> {
    let window_start = Utc::now().date_naive() - Duration::days(SYNC_WINDOW_DAYS);

    let locals = {
        let db = db.lock().await;
        DailyLogStore::new(db.connection()).list_since(owner, window_start)?
    };
    let remotes = fetch_remote_keyed::<DailyLog, _>(
        transport,
        &[
            Filter::eq(OWNER_FIELD, owner.as_str()),
            Filter::gte("log_date", format_date_key(window_start)),
        ],
    )
    .await?;

    let writes = push_keyed(transport, plan_keyed(locals, remotes)).await?;
    if !writes.is_empty() {
        let db = db.lock().await;
        DailyLogStore::new(db.connection()).save_all(&writes)?;
    }
    Ok(())
}

async fn sync_cabinet<T: RemoteTransport>(
    db: &Mutex<Database>,
    transport: &T,
    owner: &OwnerId,
) -> Result<()> {
    let locals = {
        let db = db.lock().await;
        CabinetStore::new(db.connection()).list(owner)?
    };
    let remotes = fetch_remote_keyed::<CabinetItem, _>(
        transport,
        &[Filter::eq(OWNER_FIELD, owner.as_str())],
    )
    .await?;

    let writes = push_keyed(transport, plan_keyed(locals, remotes)).await?;
    if !writes.is_empty() {
        let db = db.lock().await;
        CabinetStore::new(db.connection()).save_all(&writes)?;
    }
    Ok(())
}

async fn sync_enrollments<T: RemoteTransport>(
    db: &Mutex<Database>,
    transport: &T,
    owner: &OwnerId,
) -> Result<()> {
    let locals = {
        let db = db.lock().await;
        EnrollmentStore::new(db.connection()).list(owner)?
    };
    let remotes = fetch_remote_keyed::<ProgramEnrollment, _>(
        transport,
        &[Filter::eq(OWNER_FIELD, owner.as_str())],
    )
    .await?;

    let writes = push_keyed(transport, plan_keyed(locals, remotes)).await?;
    if !writes.is_empty() {
        let db = db.lock().await;
        EnrollmentStore::new(db.connection()).save_all(&writes)?;
    }
    Ok(())
}

/// Reconcile all five collections in a fixed order.
///
/// A failing collection is recorded and skipped; the rest still run. The
/// returned failures preserve the run order, so the first entry is the
/// earliest failure of the pass.
pub async fn run_all<T: RemoteTransport>(
    db: &Mutex<Database>,
    transport: &T,
    owner: &OwnerId,
) -> Vec<CollectionFailure> {
    let mut failures = Vec::new();

    macro_rules! run {
        ($entity:ty, $runner:expr) => {{
            let collection = <$entity as SyncEntity>::COLLECTION;
            match $runner.await {
                Ok(()) => debug!(collection, "collection in sync"),
                Err(error) => {
                    warn!(collection, %error, "collection sync failed");
                    failures.push(CollectionFailure {
                        collection,
                        message: error.to_string(),
                    });
                }
            }
        }};
    }

    run!(Profile, sync_profile(db, transport, owner));
    run!(DailyLog, sync_daily_logs(db, transport, owner));
    run!(ProgressRecord, sync_progress(db, transport, owner));
    run!(CabinetItem, sync_cabinet(db, transport, owner));
    run!(ProgramEnrollment, sync_enrollments(db, transport, owner));

    failures
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sync::transport::mock::MockTransport;

    fn owner() -> OwnerId {
        OwnerId::new("user-1")
    }

    fn database() -> Mutex<Database> {
        Mutex::new(Database::open_in_memory().unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_profile_local_only_is_pushed() {
        let db = database();
        let transport = MockTransport::new();

        let profile = Profile::new(owner(), "vata");
        {
            let guard = db.lock().await;
            ProfileStore::new(guard.connection()).upsert(&profile).unwrap();
        }

        sync_profile(&db, &transport, &owner()).await.unwrap();

        let rows = transport.rows("profiles");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_id"], "user-1");
    }

    #[tokio::test]
    async fn test_profile_newer_remote_is_pulled() {
        let db = database();
        let transport = MockTransport::new();

        let local = Profile::new(owner(), "vata");
        let mut remote = local.clone();
        remote.set_goals(vec!["sleep".to_string()]);
        remote.updated_at = local.updated_at + Duration::seconds(10);

        {
            let guard = db.lock().await;
            ProfileStore::new(guard.connection()).upsert(&local).unwrap();
        }
        transport.seed("profiles", remote.to_wire().unwrap());

        sync_profile(&db, &transport, &owner()).await.unwrap();

        let guard = db.lock().await;
        let stored = ProfileStore::new(guard.connection())
            .get(&owner())
            .unwrap()
            .unwrap();
        assert_eq!(stored.goals, vec!["sleep".to_string()]);
        assert_eq!(stored.updated_at, remote.updated_at);
        // Pull writes nothing to the backend
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test]
    async fn test_profile_sync_is_idempotent() {
        let db = database();
        let transport = MockTransport::new();

        let profile = Profile::new(owner(), "pitta");
        {
            let guard = db.lock().await;
            ProfileStore::new(guard.connection()).upsert(&profile).unwrap();
        }

        sync_profile(&db, &transport, &owner()).await.unwrap();
        assert_eq!(transport.write_count(), 1);

        // Second pass: stamps are equal on both sides, nothing moves.
        sync_profile(&db, &transport, &owner()).await.unwrap();
        assert_eq!(transport.write_count(), 1);
    }

    #[tokio::test]
    async fn test_daily_logs_outside_window_stay_local() {
        let db = database();
        let transport = MockTransport::new();

        let today = Utc::now().date_naive();
        let recent = DailyLog::new(owner(), today);
        let ancient = DailyLog::new(owner(), today - Duration::days(SYNC_WINDOW_DAYS + 1));
        {
            let guard = db.lock().await;
            DailyLogStore::new(guard.connection())
                .save_all(&[recent.clone(), ancient])
                .unwrap();
        }

        sync_daily_logs(&db, &transport, &owner()).await.unwrap();

        let rows = transport.rows("daily_logs");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["log_date"], recent.date_key());
    }

    #[tokio::test]
    async fn test_daily_logs_outside_window_not_pulled() {
        let db = database();
        let transport = MockTransport::new();

        let today = Utc::now().date_naive();
        let ancient = DailyLog::new(owner(), today - Duration::days(SYNC_WINDOW_DAYS + 1));
        transport.seed("daily_logs", ancient.to_wire().unwrap());

        sync_daily_logs(&db, &transport, &owner()).await.unwrap();

        // The windowed fetch never sees the old row, so nothing lands
        // locally and nothing is pushed back.
        let guard = db.lock().await;
        let store = DailyLogStore::new(guard.connection());
        assert!(store.get_by_date(&owner(), ancient.log_date).unwrap().is_none());
        assert!(store
            .list_since(&owner(), ancient.log_date)
            .unwrap()
            .is_empty());
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test]
    async fn test_daily_logs_merge_by_date() {
        let db = database();
        let transport = MockTransport::new();

        let today = Utc::now().date_naive();
        let local = DailyLog::new(owner(), today);
        let mut remote_log = DailyLog::new(owner(), today - Duration::days(1));
        remote_log.record(Some("calm".to_string()), Some(4), vec![], None);

        {
            let guard = db.lock().await;
            DailyLogStore::new(guard.connection())
                .save_all(std::slice::from_ref(&local))
                .unwrap();
        }
        transport.seed("daily_logs", remote_log.to_wire().unwrap());

        sync_daily_logs(&db, &transport, &owner()).await.unwrap();

        // Local-only day pushed, remote-only day pulled.
        assert_eq!(transport.rows("daily_logs").len(), 2);
        let guard = db.lock().await;
        let stored = DailyLogStore::new(guard.connection())
            .get_by_date(&owner(), remote_log.log_date)
            .unwrap()
            .unwrap();
        assert_eq!(stored.mood, Some("calm".to_string()));
    }

    #[tokio::test]
    async fn test_cabinet_remote_use_wins_over_untouched_local() {
        let db = database();
        let transport = MockTransport::new();

        let local = CabinetItem::new(owner(), "tulsi");
        let mut remote = local.clone();
        remote.last_used_at = Some(local.added_at + Duration::hours(2));

        {
            let guard = db.lock().await;
            CabinetStore::new(guard.connection())
                .save_all(std::slice::from_ref(&local))
                .unwrap();
        }
        transport.seed("cabinet_items", remote.to_wire().unwrap());

        sync_cabinet(&db, &transport, &owner()).await.unwrap();

        let guard = db.lock().await;
        let stored = CabinetStore::new(guard.connection())
            .get(&owner(), "tulsi")
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_used_at, remote.last_used_at);
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_remote_stamp_loses_to_local() {
        let db = database();
        let transport = MockTransport::new();

        let mut local = ProgressRecord::new(owner());
        local.record_check_in(date(2024, 3, 5));
        {
            let guard = db.lock().await;
            ProgressStore::new(guard.connection()).upsert(&local).unwrap();
        }

        // Same record remotely, but with an unreadable stamp.
        let mut row = local.to_wire().unwrap();
        row["updated_at"] = serde_json::json!("not a timestamp");
        row["current_streak"] = serde_json::json!(99);
        transport.seed("progress_records", row);

        sync_progress(&db, &transport, &owner()).await.unwrap();

        // The corrupt side parses to the sentinel and loses: local pushes.
        assert_eq!(transport.update_count.load(std::sync::atomic::Ordering::SeqCst), 1);
        let rows = transport.rows("progress_records");
        assert_eq!(rows[0]["current_streak"], 1);
    }

    #[tokio::test]
    async fn test_run_all_isolates_collection_failures() {
        let db = database();
        let transport = MockTransport::new();
        transport.fail_collection("daily_logs");

        let profile = Profile::new(owner(), "vata");
        let item = CabinetItem::new(owner(), "tulsi");
        {
            let guard = db.lock().await;
            ProfileStore::new(guard.connection()).upsert(&profile).unwrap();
            CabinetStore::new(guard.connection())
                .save_all(std::slice::from_ref(&item))
                .unwrap();
        }

        let failures = run_all(&db, &transport, &owner()).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].collection, "daily_logs");
        // The other collections still synced.
        assert_eq!(transport.rows("profiles").len(), 1);
        assert_eq!(transport.rows("cabinet_items").len(), 1);
    }

    #[tokio::test]
    async fn test_run_all_reports_failures_in_run_order() {
        let db = database();
        let transport = MockTransport::new();
        transport.fail_collection("cabinet_items");
        transport.fail_collection("profiles");

        let failures = run_all(&db, &transport, &owner()).await;

        let collections: Vec<_> = failures.iter().map(|f| f.collection).collect();
        assert_eq!(collections, vec!["profiles", "cabinet_items"]);
    }
}
