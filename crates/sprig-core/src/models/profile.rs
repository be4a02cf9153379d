//! Wellness profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{OwnerId, RecordId};
use crate::sync::timestamp::{format_timestamp, now_utc, parse_timestamp};

/// A user's wellness profile: the constitution classification produced by
/// the onboarding quiz plus the goals and symptoms they selected.
///
/// Singleton: exactly one local row per installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier
    pub id: RecordId,
    /// Owning user
    pub owner: OwnerId,
    /// Constitution classification (e.g. "vata", "pitta")
    pub constitution: String,
    /// Selected wellness goals
    pub goals: Vec<String>,
    /// Reported symptoms
    pub symptoms: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp; sole conflict-resolution signal
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new profile for the given owner.
    #[must_use]
    pub fn new(owner: OwnerId, constitution: impl Into<String>) -> Self {
        let now = now_utc();
        Self {
            id: RecordId::new(),
            owner,
            constitution: constitution.into(),
            goals: Vec::new(),
            symptoms: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the quiz assessment. Advances `updated_at`.
    pub fn set_assessment(
        &mut self,
        constitution: impl Into<String>,
        goals: Vec<String>,
        symptoms: Vec<String>,
    ) {
        self.constitution = constitution.into();
        self.goals = goals;
        self.symptoms = symptoms;
        self.touch();
    }

    /// Replace the goal list. Advances `updated_at`.
    pub fn set_goals(&mut self, goals: Vec<String>) {
        self.goals = goals;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    /// Map to the flat wire record exchanged with the backend.
    pub fn to_wire(&self) -> Result<serde_json::Value> {
        serde_json::to_value(WireProfile {
            id: self.id.as_str(),
            user_id: self.owner.as_str().to_string(),
            constitution: self.constitution.clone(),
            goals: self.goals.clone(),
            symptoms: self.symptoms.clone(),
            created_at: format_timestamp(self.created_at),
            updated_at: format_timestamp(self.updated_at),
        })
        .map_err(Error::from)
    }

    /// Build a profile from a wire record.
    ///
    /// Timestamps are parsed totally (corrupt stamps become the sentinel);
    /// a missing or malformed id is a malformed-record error.
    pub fn from_wire(row: &serde_json::Value) -> Result<Self> {
        let wire: WireProfile = serde_json::from_value(row.clone())
            .map_err(|error| Error::MalformedRecord(format!("profile: {error}")))?;
        Ok(Self {
            id: wire
                .id
                .parse()
                .map_err(|_| Error::MalformedRecord(format!("profile id: {}", wire.id)))?,
            owner: OwnerId::new(wire.user_id),
            constitution: wire.constitution,
            goals: wire.goals,
            symptoms: wire.symptoms,
            created_at: parse_timestamp(&wire.created_at),
            updated_at: parse_timestamp(&wire.updated_at),
        })
    }

    /// Overwrite payload fields with the remote copy and adopt its stamp,
    /// leaving identity and `created_at` untouched.
    pub fn absorb_remote(&mut self, remote: &Self) {
        self.constitution = remote.constitution.clone();
        self.goals = remote.goals.clone();
        self.symptoms = remote.symptoms.clone();
        self.updated_at = remote.updated_at;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireProfile {
    id: String,
    user_id: String,
    #[serde(default)]
    constitution: String,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    symptoms: Vec<String>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_advances_updated_at() {
        let mut profile = Profile::new(OwnerId::new("u1"), "vata");
        let before = profile.updated_at;
        profile.set_goals(vec!["energy".to_string()]);
        assert!(profile.updated_at >= before);
        assert_eq!(profile.goals, vec!["energy".to_string()]);
    }

    #[test]
    fn test_wire_round_trip() {
        let mut profile = Profile::new(OwnerId::new("u1"), "pitta");
        profile.set_assessment(
            "pitta",
            vec!["sleep".to_string()],
            vec!["fatigue".to_string()],
        );

        let row = profile.to_wire().unwrap();
        assert_eq!(row["user_id"], "u1");

        let parsed = Profile::from_wire(&row).unwrap();
        assert_eq!(parsed.id, profile.id);
        assert_eq!(parsed.goals, profile.goals);
        // Canonical format keeps microsecond precision
        assert_eq!(
            parsed.updated_at,
            parse_timestamp(&format_timestamp(profile.updated_at))
        );
    }

    #[test]
    fn test_from_wire_rejects_bad_id() {
        let row = serde_json::json!({
            "id": "nope",
            "user_id": "u1",
            "constitution": "vata",
        });
        assert!(Profile::from_wire(&row).is_err());
    }

    #[test]
    fn test_from_wire_tolerates_missing_timestamps() {
        let row = serde_json::json!({
            "id": RecordId::new().as_str(),
            "user_id": "u1",
        });
        let parsed = Profile::from_wire(&row).unwrap();
        assert_eq!(
            parsed.updated_at,
            crate::sync::timestamp::TIMESTAMP_SENTINEL
        );
    }

    #[test]
    fn test_absorb_remote_adopts_stamp() {
        let mut local = Profile::new(OwnerId::new("u1"), "vata");
        let mut remote = local.clone();
        remote.set_goals(vec!["sleep".to_string()]);

        local.absorb_remote(&remote);
        assert_eq!(local.goals, vec!["sleep".to_string()]);
        assert_eq!(local.updated_at, remote.updated_at);
        assert_eq!(local.id, remote.id);
    }
}
