//! Local database layer for Sprig

mod connection;
mod migrations;
mod stores;

pub use connection::Database;
pub use stores::{
    CabinetStore, DailyLogStore, EnrollmentStore, ProfileStore, ProgressStore, SyncMetaStore,
};
