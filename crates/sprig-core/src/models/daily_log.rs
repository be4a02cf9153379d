//! Daily log model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{OwnerId, RecordId};
use crate::sync::timestamp::{format_timestamp, now_utc, parse_timestamp};

/// Fixed-width key format for a calendar date.
const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// One day's wellness check-in: mood, energy, symptoms, free-form notes.
///
/// Keyed by `log_date`, a UTC calendar date, so two devices in different
/// timezones agree on "the same day". Only a trailing window of logs is
/// synced per pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
    /// Unique identifier
    pub id: RecordId,
    /// Owning user
    pub owner: OwnerId,
    /// UTC calendar date this log covers; the natural key
    pub log_date: NaiveDate,
    /// Reported mood
    pub mood: Option<String>,
    /// Energy level, 1-5
    pub energy: Option<i32>,
    /// Symptoms reported for the day
    pub symptoms: Vec<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp; sole conflict-resolution signal
    pub updated_at: DateTime<Utc>,
}

impl DailyLog {
    /// Create an empty log for the given UTC date.
    #[must_use]
    pub fn new(owner: OwnerId, log_date: NaiveDate) -> Self {
        let now = now_utc();
        Self {
            id: RecordId::new(),
            owner,
            log_date,
            mood: None,
            energy: None,
            symptoms: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an empty log for today, in UTC.
    #[must_use]
    pub fn for_today(owner: OwnerId) -> Self {
        Self::new(owner, Utc::now().date_naive())
    }

    /// Record the day's check-in fields. Advances `updated_at`.
    pub fn record(
        &mut self,
        mood: Option<String>,
        energy: Option<i32>,
        symptoms: Vec<String>,
        notes: Option<String>,
    ) {
        self.mood = mood;
        self.energy = energy;
        self.symptoms = symptoms;
        self.notes = notes;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    /// Natural key: the calendar date as a fixed-width UTC string.
    #[must_use]
    pub fn date_key(&self) -> String {
        format_date_key(self.log_date)
    }

    /// Map to the flat wire record exchanged with the backend.
    pub fn to_wire(&self) -> Result<serde_json::Value> {
        serde_json::to_value(WireDailyLog {
            id: self.id.as_str(),
            user_id: self.owner.as_str().to_string(),
            log_date: self.date_key(),
            mood: self.mood.clone(),
            energy: self.energy,
            symptoms: self.symptoms.clone(),
            notes: self.notes.clone(),
            created_at: format_timestamp(self.created_at),
            updated_at: format_timestamp(self.updated_at),
        })
        .map_err(Error::from)
    }

    /// Build a log from a wire record.
    pub fn from_wire(row: &serde_json::Value) -> Result<Self> {
        let wire: WireDailyLog = serde_json::from_value(row.clone())
            .map_err(|error| Error::MalformedRecord(format!("daily log: {error}")))?;
        Ok(Self {
            id: wire
                .id
                .parse()
                .map_err(|_| Error::MalformedRecord(format!("daily log id: {}", wire.id)))?,
            owner: OwnerId::new(wire.user_id),
            log_date: parse_date_key(&wire.log_date)?,
            mood: wire.mood,
            energy: wire.energy,
            symptoms: wire.symptoms,
            notes: wire.notes,
            created_at: parse_timestamp(&wire.created_at),
            updated_at: parse_timestamp(&wire.updated_at),
        })
    }

    /// Overwrite payload fields with the remote copy and adopt its stamp.
    pub fn absorb_remote(&mut self, remote: &Self) {
        self.mood = remote.mood.clone();
        self.energy = remote.energy;
        self.symptoms = remote.symptoms.clone();
        self.notes = remote.notes.clone();
        self.updated_at = remote.updated_at;
    }
}

/// Render a calendar date as its fixed-width wire/key form.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a wire date key. Unlike timestamps, a bad date key is an error:
/// without it the record cannot be matched at all.
pub fn parse_date_key(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_KEY_FORMAT)
        .map_err(|_| Error::MalformedRecord(format!("date key: {text}")))
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDailyLog {
    id: String,
    user_id: String,
    #[serde(default)]
    log_date: String,
    #[serde(default)]
    mood: Option<String>,
    #[serde(default)]
    energy: Option<i32>,
    #[serde(default)]
    symptoms: Vec<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_key_is_fixed_width() {
        let log = DailyLog::new(OwnerId::new("u1"), date(2024, 3, 5));
        assert_eq!(log.date_key(), "2024-03-05");
    }

    #[test]
    fn test_record_advances_updated_at() {
        let mut log = DailyLog::new(OwnerId::new("u1"), date(2024, 3, 5));
        let before = log.updated_at;
        log.record(Some("calm".to_string()), Some(4), vec![], None);
        assert!(log.updated_at >= before);
        assert_eq!(log.energy, Some(4));
    }

    #[test]
    fn test_wire_round_trip() {
        let mut log = DailyLog::new(OwnerId::new("u1"), date(2024, 3, 5));
        log.record(
            Some("calm".to_string()),
            Some(3),
            vec!["headache".to_string()],
            Some("slept late".to_string()),
        );

        let row = log.to_wire().unwrap();
        assert_eq!(row["log_date"], "2024-03-05");

        let parsed = DailyLog::from_wire(&row).unwrap();
        assert_eq!(parsed.log_date, log.log_date);
        assert_eq!(parsed.mood, log.mood);
        assert_eq!(parsed.symptoms, log.symptoms);
    }

    #[test]
    fn test_from_wire_rejects_bad_date_key() {
        let row = serde_json::json!({
            "id": RecordId::new().as_str(),
            "user_id": "u1",
            "log_date": "03/05/2024",
        });
        assert!(DailyLog::from_wire(&row).is_err());
    }
}
