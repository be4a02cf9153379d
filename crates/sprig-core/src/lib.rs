//! sprig-core - Core library for Sprig
//!
//! This crate contains the shared models, local database layer, and the
//! offline-first synchronization engine used by all Sprig clients
//! (mobile shell, CLI). Conflict resolution is last-write-wins, driven by
//! per-record modification timestamps.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;

pub use error::{Error, Result};
pub use models::{OwnerId, RecordId};
pub use sync::{SkipReason, SyncCoordinator, SyncReport, SyncRun, SyncStatus};
