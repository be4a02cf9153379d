//! Progress record model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::daily_log::{format_date_key, parse_date_key};
use crate::models::{OwnerId, RecordId};
use crate::sync::timestamp::{format_timestamp, now_utc, parse_timestamp};

/// Streak and completion counters for a user's habit check-ins.
///
/// Singleton: exactly one local row per installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Unique identifier
    pub id: RecordId,
    /// Owning user
    pub owner: OwnerId,
    /// Consecutive days with a check-in, ending today or yesterday
    pub current_streak: u32,
    /// Longest streak ever reached
    pub longest_streak: u32,
    /// Lifetime check-in count
    pub total_check_ins: u32,
    /// Date of the most recent check-in (UTC)
    pub last_check_in: Option<NaiveDate>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp; sole conflict-resolution signal
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Create a zeroed progress record for the given owner.
    #[must_use]
    pub fn new(owner: OwnerId) -> Self {
        let now = now_utc();
        Self {
            id: RecordId::new(),
            owner,
            current_streak: 0,
            longest_streak: 0,
            total_check_ins: 0,
            last_check_in: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Register a check-in for the given UTC date. Advances `updated_at`.
    ///
    /// A repeated check-in on the same date is a no-op for the counters but
    /// still counts as a mutation.
    pub fn record_check_in(&mut self, today: NaiveDate) {
        match self.last_check_in {
            Some(last) if last == today => {}
            Some(last) if last.succ_opt() == Some(today) => {
                self.current_streak += 1;
                self.total_check_ins += 1;
            }
            _ => {
                self.current_streak = 1;
                self.total_check_ins += 1;
            }
        }
        self.last_check_in = Some(today);
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    /// Map to the flat wire record exchanged with the backend.
    pub fn to_wire(&self) -> Result<serde_json::Value> {
        serde_json::to_value(WireProgressRecord {
            id: self.id.as_str(),
            user_id: self.owner.as_str().to_string(),
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            total_check_ins: self.total_check_ins,
            last_check_in: self.last_check_in.map(format_date_key),
            created_at: format_timestamp(self.created_at),
            updated_at: format_timestamp(self.updated_at),
        })
        .map_err(Error::from)
    }

    /// Build a progress record from a wire record.
    pub fn from_wire(row: &serde_json::Value) -> Result<Self> {
        let wire: WireProgressRecord = serde_json::from_value(row.clone())
            .map_err(|error| Error::MalformedRecord(format!("progress record: {error}")))?;
        Ok(Self {
            id: wire
                .id
                .parse()
                .map_err(|_| Error::MalformedRecord(format!("progress record id: {}", wire.id)))?,
            owner: OwnerId::new(wire.user_id),
            current_streak: wire.current_streak,
            longest_streak: wire.longest_streak,
            total_check_ins: wire.total_check_ins,
            last_check_in: wire
                .last_check_in
                .as_deref()
                .map(parse_date_key)
                .transpose()?,
            created_at: parse_timestamp(&wire.created_at),
            updated_at: parse_timestamp(&wire.updated_at),
        })
    }

    /// Overwrite payload fields with the remote copy and adopt its stamp.
    pub fn absorb_remote(&mut self, remote: &Self) {
        self.current_streak = remote.current_streak;
        self.longest_streak = remote.longest_streak;
        self.total_check_ins = remote.total_check_ins;
        self.last_check_in = remote.last_check_in;
        self.updated_at = remote.updated_at;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireProgressRecord {
    id: String,
    user_id: String,
    #[serde(default)]
    current_streak: u32,
    #[serde(default)]
    longest_streak: u32,
    #[serde(default)]
    total_check_ins: u32,
    #[serde(default)]
    last_check_in: Option<String>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}
