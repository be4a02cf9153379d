//! Transport contract between the sync engine and the backend.
//!
//! Three operations per collection: filtered read, insert-one,
//! update-one-by-id. Records cross this boundary as flat JSON objects in
//! wire field naming (`user_id`, `updated_at`, ...); the typed mapping
//! lives next to each model. No batching, no pagination; the daily log
//! strategy bounds payload size itself with a date filter.

use serde_json::Value;

use crate::error::Result;

/// A predicate applied to a collection read.
///
/// Reads are always scoped by equality on the owner identity; the daily
/// log read adds a greater-than-or-equal bound on its date field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `field = value`
    Eq(&'static str, String),
    /// `field >= value`
    Gte(&'static str, String),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<String>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn gte(field: &'static str, value: impl Into<String>) -> Self {
        Self::Gte(field, value.into())
    }

    /// Render as a PostgREST-style query pair, e.g. `("user_id", "eq.u1")`.
    #[must_use]
    pub fn to_query_pair(&self) -> (&'static str, String) {
        match self {
            Self::Eq(field, value) => (field, format!("eq.{value}")),
            Self::Gte(field, value) => (field, format!("gte.{value}")),
        }
    }
}

/// Asynchronous access to the remote backend, one table per collection.
///
/// Abstracts the network layer so tests can substitute an in-memory
/// implementation. Every call can fail with a transport error; retries and
/// backoff are the caller's concern (in practice: the next sync pass).
#[allow(async_fn_in_trait)]
pub trait RemoteTransport: Send + Sync {
    /// Read all records matching the filters.
    async fn select(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>>;

    /// Insert one record.
    async fn insert(&self, collection: &str, record: &Value) -> Result<()>;

    /// Update one record by its remote identifier.
    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::Value;

    use super::{Filter, RemoteTransport};
    use crate::error::{Error, Result};

    /// In-memory backend for tests: one row list per collection, filter
    /// semantics matching the REST transport (string equality and
    /// lexicographic greater-or-equal), plus per-collection failure
    /// injection.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        rows: Mutex<HashMap<String, Vec<Value>>>,
        failing: Mutex<HashSet<String>>,
        pub(crate) insert_count: AtomicUsize,
        pub(crate) update_count: AtomicUsize,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Seed a remote row directly, bypassing the transport contract.
        pub(crate) fn seed(&self, collection: &str, row: Value) {
            self.rows
                .lock()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .push(row);
        }

        /// Make every operation against the collection fail.
        pub(crate) fn fail_collection(&self, collection: &str) {
            self.failing.lock().unwrap().insert(collection.to_string());
        }

        /// Undo [`Self::fail_collection`].
        pub(crate) fn heal_collection(&self, collection: &str) {
            self.failing.lock().unwrap().remove(collection);
        }

        pub(crate) fn rows(&self, collection: &str) -> Vec<Value> {
            self.rows
                .lock()
                .unwrap()
                .get(collection)
                .cloned()
                .unwrap_or_default()
        }

        pub(crate) fn write_count(&self) -> usize {
            self.insert_count.load(Ordering::SeqCst) + self.update_count.load(Ordering::SeqCst)
        }

        fn check(&self, collection: &str) -> Result<()> {
            if self.failing.lock().unwrap().contains(collection) {
                return Err(Error::Transport(format!("{collection}: injected failure")));
            }
            Ok(())
        }

        fn matches(row: &Value, filter: &Filter) -> bool {
            match filter {
                Filter::Eq(field, value) => row[field].as_str() == Some(value),
                Filter::Gte(field, value) => {
                    row[field].as_str().is_some_and(|text| text >= value.as_str())
                }
            }
        }
    }

    impl RemoteTransport for MockTransport {
        async fn select(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>> {
            self.check(collection)?;
            let rows = self.rows(collection);
            Ok(rows
                .into_iter()
                .filter(|row| filters.iter().all(|filter| Self::matches(row, filter)))
                .collect())
        }

        async fn insert(&self, collection: &str, record: &Value) -> Result<()> {
            self.check(collection)?;
            self.insert_count.fetch_add(1, Ordering::SeqCst);
            self.seed(collection, record.clone());
            Ok(())
        }

        async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<()> {
            self.check(collection)?;
            self.update_count.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            if let Some(rows) = rows.get_mut(collection) {
                for row in rows.iter_mut() {
                    if row["id"].as_str() == Some(id) {
                        *row = record.clone();
                    }
                }
            }
            Ok(())
        }
    }
}
