//! Program enrollment model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::daily_log::{format_date_key, parse_date_key};
use crate::models::{OwnerId, RecordId};
use crate::sync::timestamp::{format_timestamp, now_utc, parse_timestamp};

/// A user's enrollment in a guided wellness program.
///
/// Keyed by program identifier; standard `updated_at` conflict signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEnrollment {
    /// Unique identifier
    pub id: RecordId,
    /// Owning user
    pub owner: OwnerId,
    /// Stable program identifier (e.g. "21-day-reset"); the natural key
    pub program: String,
    /// UTC date the user started the program
    pub started_on: NaiveDate,
    /// Current day within the program, starting at 1
    pub current_day: u32,
    /// Whether the program has been completed
    pub completed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp; sole conflict-resolution signal
    pub updated_at: DateTime<Utc>,
}

impl ProgramEnrollment {
    /// Enroll the owner into a program starting on the given UTC date.
    #[must_use]
    pub fn new(owner: OwnerId, program: impl Into<String>, started_on: NaiveDate) -> Self {
        let now = now_utc();
        Self {
            id: RecordId::new(),
            owner,
            program: program.into(),
            started_on,
            current_day: 1,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance to the next program day. Advances `updated_at`.
    pub fn advance_day(&mut self) {
        self.current_day += 1;
        self.touch();
    }

    /// Mark the program completed. Advances `updated_at`.
    pub fn complete(&mut self) {
        self.completed = true;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    /// Map to the flat wire record exchanged with the backend.
    pub fn to_wire(&self) -> Result<serde_json::Value> {
        serde_json::to_value(WireProgramEnrollment {
            id: self.id.as_str(),
            user_id: self.owner.as_str().to_string(),
            program: self.program.clone(),
            started_on: format_date_key(self.started_on),
            current_day: self.current_day,
            completed: self.completed,
            created_at: format_timestamp(self.created_at),
            updated_at: format_timestamp(self.updated_at),
        })
        .map_err(Error::from)
    }

    /// Build an enrollment from a wire record.
    pub fn from_wire(row: &serde_json::Value) -> Result<Self> {
        let wire: WireProgramEnrollment = serde_json::from_value(row.clone())
            .map_err(|error| Error::MalformedRecord(format!("enrollment: {error}")))?;
        Ok(Self {
            id: wire
                .id
                .parse()
                .map_err(|_| Error::MalformedRecord(format!("enrollment id: {}", wire.id)))?,
            owner: OwnerId::new(wire.user_id),
            program: wire.program,
            started_on: parse_date_key(&wire.started_on)?,
            current_day: wire.current_day,
            completed: wire.completed,
            created_at: parse_timestamp(&wire.created_at),
            updated_at: parse_timestamp(&wire.updated_at),
        })
    }

    /// Overwrite payload fields with the remote copy and adopt its stamp.
    pub fn absorb_remote(&mut self, remote: &Self) {
        self.started_on = remote.started_on;
        self.current_day = remote.current_day;
        self.completed = remote.completed;
        self.updated_at = remote.updated_at;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireProgramEnrollment {
    id: String,
    user_id: String,
    #[serde(default)]
    program: String,
    #[serde(default)]
    started_on: String,
    #[serde(default = "default_current_day")]
    current_day: u32,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

const fn default_current_day() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_advance_and_complete() {
        let mut enrollment =
            ProgramEnrollment::new(OwnerId::new("u1"), "21-day-reset", date(2024, 3, 1));
        enrollment.advance_day();
        enrollment.complete();
        assert_eq!(enrollment.current_day, 2);
        assert!(enrollment.completed);
    }

    #[test]
    fn test_wire_round_trip() {
        let enrollment =
            ProgramEnrollment::new(OwnerId::new("u1"), "21-day-reset", date(2024, 3, 1));
        let row = enrollment.to_wire().unwrap();
        assert_eq!(row["program"], "21-day-reset");
        assert_eq!(row["started_on"], "2024-03-01");

        let parsed = ProgramEnrollment::from_wire(&row).unwrap();
        assert_eq!(parsed.program, enrollment.program);
        assert_eq!(parsed.started_on, enrollment.started_on);
        assert_eq!(parsed.current_day, 1);
    }
}
