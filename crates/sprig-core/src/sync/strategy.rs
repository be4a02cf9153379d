//! Reconciliation planners.
//!
//! Planning is pure: given local and remote snapshots, compute which side
//! wins per record. All IO (transport calls, the local commit) happens in
//! the collection runners, so the suspension points of a sync pass stay
//! exactly at the transport boundary and the final store commit.
//!
//! Records are never deleted on either side: a record absent from one side
//! is inserted into it. A record deleted directly on the backend therefore
//! reappears after the next pass; there is no tombstone signal to act on.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::models::RecordId;

/// A record the engine can reconcile between the local store and a remote
/// collection.
pub trait SyncEntity: Clone {
    /// Remote collection (table) name.
    const COLLECTION: &'static str;

    /// Shared local/remote identifier.
    fn record_id(&self) -> RecordId;

    /// Timestamp compared to decide the conflict winner. `updated_at` for
    /// every entity except cabinet items, which use recency of use.
    fn conflict_stamp(&self) -> DateTime<Utc>;

    /// Map to the flat wire record.
    fn to_wire(&self) -> Result<Value>;

    /// Build from a wire record.
    fn from_wire(row: &Value) -> Result<Self>;

    /// Overwrite payload fields with the remote copy, adopting its stamp.
    fn absorb_remote(&mut self, remote: &Self);
}

/// A [`SyncEntity`] matched across sides by a stable natural key rather
/// than by record id.
pub trait KeyedSyncEntity: SyncEntity {
    fn natural_key(&self) -> String;
}

/// Outcome of reconciling a singleton collection.
#[derive(Debug, Clone, PartialEq)]
pub enum SingletonPlan<E> {
    /// Nothing to do (absent on both sides, or equal stamps).
    Noop,
    /// Local only: insert the remote copy.
    PushInsert(E),
    /// Local strictly newer: update the remote row by its id.
    PushUpdate { remote_id: RecordId, record: E },
    /// Remote strictly newer or local absent: write this row locally.
    PullWrite(E),
}

/// Reconcile at most one row per side, matched by owner identity.
pub fn plan_singleton<E: SyncEntity>(local: Option<E>, remote: Option<E>) -> SingletonPlan<E> {
    match (local, remote) {
        (None, None) => SingletonPlan::Noop,
        (Some(local), None) => SingletonPlan::PushInsert(local),
        (None, Some(remote)) => SingletonPlan::PullWrite(remote),
        (Some(local), Some(remote)) => match local.conflict_stamp().cmp(&remote.conflict_stamp()) {
            Ordering::Greater => SingletonPlan::PushUpdate {
                remote_id: remote.record_id(),
                record: local,
            },
            Ordering::Less => {
                let mut merged = local;
                merged.absorb_remote(&remote);
                SingletonPlan::PullWrite(merged)
            }
            Ordering::Equal => SingletonPlan::Noop,
        },
    }
}

/// Outcome of reconciling a keyed collection.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedPlan<E> {
    /// Local rows with no remote counterpart: insert remotely.
    pub push_inserts: Vec<E>,
    /// Local rows strictly newer than their remote match: update by id.
    pub push_updates: Vec<(RecordId, E)>,
    /// Rows to write locally: absorbed pulls plus remote-only rows.
    pub local_writes: Vec<E>,
}

impl<E> KeyedPlan<E> {
    /// Whether the plan performs no work at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.push_inserts.is_empty()
            && self.push_updates.is_empty()
            && self.local_writes.is_empty()
    }
}

/// Reconcile many rows per side, matched by natural key.
///
/// Duplicate remote keys should not occur; when they do, the last-seen
/// entry wins (a defensive default, not a guarantee). Output order follows
/// local fetch order, then remote fetch order for remote-only rows, so a
/// pass is reproducible.
pub fn plan_keyed<E: KeyedSyncEntity>(locals: Vec<E>, remotes: Vec<E>) -> KeyedPlan<E> {
    let mut slots: Vec<Option<E>> = remotes.into_iter().map(Some).collect();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    for (index, slot) in slots.iter().enumerate() {
        if let Some(remote) = slot {
            by_key.insert(remote.natural_key(), index);
        }
    }

    let mut plan = KeyedPlan {
        push_inserts: Vec::new(),
        push_updates: Vec::new(),
        local_writes: Vec::new(),
    };

    for local in locals {
        let Some(index) = by_key.remove(&local.natural_key()) else {
            plan.push_inserts.push(local);
            continue;
        };
        let Some(remote) = slots[index].take() else {
            continue;
        };

        match local.conflict_stamp().cmp(&remote.conflict_stamp()) {
            Ordering::Greater => plan.push_updates.push((remote.record_id(), local)),
            Ordering::Less => {
                let mut merged = local;
                merged.absorb_remote(&remote);
                plan.local_writes.push(merged);
            }
            Ordering::Equal => {}
        }
    }

    // Remote rows whose key had no local counterpart become new local rows.
    // Superseded duplicates (same key, earlier position) are dropped.
    let mut unmatched: Vec<usize> = by_key.into_values().collect();
    unmatched.sort_unstable();
    for index in unmatched {
        if let Some(remote) = slots[index].take() {
            plan.local_writes.push(remote);
        }
    }

    plan
}
