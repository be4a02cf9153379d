//! Cabinet item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{OwnerId, RecordId};
use crate::sync::timestamp::{format_timestamp, now_utc, parse_timestamp};

/// An ingredient in the user's herbal cabinet.
///
/// Keyed by ingredient identifier. Conflict resolution uses recency of
/// *use*, not of edit: the signal is `last_used_at` falling back to
/// `added_at`. That is a product decision specific to this entity; do not
/// generalize it to the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CabinetItem {
    /// Unique identifier
    pub id: RecordId,
    /// Owning user
    pub owner: OwnerId,
    /// Stable ingredient identifier (e.g. "ashwagandha"); the natural key
    pub ingredient: String,
    /// Whether the user marked this a staple
    pub is_staple: bool,
    /// When the ingredient entered the cabinet
    pub added_at: DateTime<Utc>,
    /// When the ingredient was last used in a suggestion
    pub last_used_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp (advanced on every mutation)
    pub updated_at: DateTime<Utc>,
}

impl CabinetItem {
    /// Add a new ingredient to the cabinet.
    #[must_use]
    pub fn new(owner: OwnerId, ingredient: impl Into<String>) -> Self {
        let now = now_utc();
        Self {
            id: RecordId::new(),
            owner,
            ingredient: ingredient.into(),
            is_staple: false,
            added_at: now,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record that the ingredient was just used. Advances `updated_at`.
    pub fn mark_used(&mut self) {
        let now = now_utc();
        self.last_used_at = Some(now);
        self.updated_at = now;
    }

    /// Toggle the staple flag. Advances `updated_at`.
    pub fn set_staple(&mut self, is_staple: bool) {
        self.is_staple = is_staple;
        self.updated_at = now_utc();
    }

    /// The entity-specific conflict signal: recency of use.
    #[must_use]
    pub fn usage_stamp(&self) -> DateTime<Utc> {
        self.last_used_at.unwrap_or(self.added_at)
    }

    /// Map to the flat wire record exchanged with the backend.
    pub fn to_wire(&self) -> Result<serde_json::Value> {
        serde_json::to_value(WireCabinetItem {
            id: self.id.as_str(),
            user_id: self.owner.as_str().to_string(),
            ingredient: self.ingredient.clone(),
            is_staple: self.is_staple,
            added_at: format_timestamp(self.added_at),
            last_used_at: self.last_used_at.map(format_timestamp),
            created_at: format_timestamp(self.created_at),
            updated_at: format_timestamp(self.updated_at),
        })
        .map_err(Error::from)
    }

    /// Build a cabinet item from a wire record.
    ///
    /// A corrupt `last_used_at` parses to the sentinel rather than `None`,
    /// so a record with a broken usage stamp still loses comparisons.
    pub fn from_wire(row: &serde_json::Value) -> Result<Self> {
        let wire: WireCabinetItem = serde_json::from_value(row.clone())
            .map_err(|error| Error::MalformedRecord(format!("cabinet item: {error}")))?;
        Ok(Self {
            id: wire
                .id
                .parse()
                .map_err(|_| Error::MalformedRecord(format!("cabinet item id: {}", wire.id)))?,
            owner: OwnerId::new(wire.user_id),
            ingredient: wire.ingredient,
            is_staple: wire.is_staple,
            added_at: parse_timestamp(&wire.added_at),
            last_used_at: wire.last_used_at.as_deref().map(parse_timestamp),
            created_at: parse_timestamp(&wire.created_at),
            updated_at: parse_timestamp(&wire.updated_at),
        })
    }

    /// Overwrite payload fields with the remote copy and adopt its stamps.
    pub fn absorb_remote(&mut self, remote: &Self) {
        self.is_staple = remote.is_staple;
        self.added_at = remote.added_at;
        self.last_used_at = remote.last_used_at;
        self.updated_at = remote.updated_at;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCabinetItem {
    id: String,
    user_id: String,
    #[serde(default)]
    ingredient: String,
    #[serde(default)]
    is_staple: bool,
    #[serde(default)]
    added_at: String,
    #[serde(default)]
    last_used_at: Option<String>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_stamp_falls_back_to_added_at() {
        let item = CabinetItem::new(OwnerId::new("u1"), "tulsi");
        assert_eq!(item.usage_stamp(), item.added_at);
    }

    #[test]
    fn test_mark_used_advances_both_stamps() {
        let mut item = CabinetItem::new(OwnerId::new("u1"), "tulsi");
        item.mark_used();
        assert_eq!(item.last_used_at, Some(item.updated_at));
        assert_eq!(item.usage_stamp(), item.updated_at);
    }

    #[test]
    fn test_wire_round_trip_preserves_null_last_used() {
        let item = CabinetItem::new(OwnerId::new("u1"), "brahmi");
        let row = item.to_wire().unwrap();
        assert!(row["last_used_at"].is_null());

        let parsed = CabinetItem::from_wire(&row).unwrap();
        assert_eq!(parsed.last_used_at, None);
        assert_eq!(parsed.ingredient, "brahmi");
    }

    #[test]
    fn test_corrupt_last_used_becomes_sentinel() {
        let mut item = CabinetItem::new(OwnerId::new("u1"), "brahmi");
        item.mark_used();
        let mut row = item.to_wire().unwrap();
        row["last_used_at"] = serde_json::json!("###");

        let parsed = CabinetItem::from_wire(&row).unwrap();
        assert_eq!(
            parsed.last_used_at,
            Some(crate::sync::timestamp::TIMESTAMP_SENTINEL)
        );
        // The broken stamp loses to any valid usage stamp
        assert!(parsed.usage_stamp() < item.usage_stamp());
    }
}
