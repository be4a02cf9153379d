//! Per-entity local stores
//!
//! Each store gives the sync engine (and the clients) owner-scoped reads
//! and write paths that keep one collection's mutations inside a single
//! transaction per sync pass.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{
    format_date_key, CabinetItem, DailyLog, OwnerId, Profile, ProgramEnrollment, ProgressRecord,
    RecordId,
};
use crate::sync::timestamp::{format_timestamp, parse_timestamp};

fn encode_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values).map_err(Error::from)
}

fn decode_list(text: &str) -> Vec<String> {
    serde_json::from_str(text).unwrap_or_default()
}

fn decode_stamp(text: &str) -> DateTime<Utc> {
    parse_timestamp(text)
}

fn decode_id(text: &str) -> RecordId {
    text.parse().unwrap_or_default()
}

fn decode_date(text: &str) -> NaiveDate {
    crate::models::parse_date_key(text).unwrap_or_default()
}

/// Store for the singleton wellness profile.
pub struct ProfileStore<'a> {
    conn: &'a Connection,
}

impl<'a> ProfileStore<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fetch the owner's profile, if one exists.
    pub fn get(&self, owner: &OwnerId) -> Result<Option<Profile>> {
        let result = self.conn.query_row(
            "SELECT id, user_id, constitution, goals, symptoms, created_at, updated_at
             FROM profiles WHERE user_id = ?",
            params![owner.as_str()],
            Self::parse_row,
        );

        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert or overwrite the owner's profile.
    pub fn upsert(&self, profile: &Profile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO profiles (id, user_id, constitution, goals, symptoms, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                constitution = excluded.constitution,
                goals = excluded.goals,
                symptoms = excluded.symptoms,
                updated_at = excluded.updated_at",
            params![
                profile.id.as_str(),
                profile.owner.as_str(),
                profile.constitution,
                encode_list(&profile.goals)?,
                encode_list(&profile.symptoms)?,
                format_timestamp(profile.created_at),
                format_timestamp(profile.updated_at),
            ],
        )?;
        Ok(())
    }

    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
        Ok(Profile {
            id: decode_id(&row.get::<_, String>(0)?),
            owner: OwnerId::new(row.get::<_, String>(1)?),
            constitution: row.get(2)?,
            goals: decode_list(&row.get::<_, String>(3)?),
            symptoms: decode_list(&row.get::<_, String>(4)?),
            created_at: decode_stamp(&row.get::<_, String>(5)?),
            updated_at: decode_stamp(&row.get::<_, String>(6)?),
        })
    }
}

/// Store for daily logs, keyed by UTC calendar date.
pub struct DailyLogStore<'a> {
    conn: &'a Connection,
}

impl<'a> DailyLogStore<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fetch logs on or after the given UTC date, oldest first.
    pub fn list_since(&self, owner: &OwnerId, from: NaiveDate) -> Result<Vec<DailyLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, log_date, mood, energy, symptoms, notes, created_at, updated_at
             FROM daily_logs
             WHERE user_id = ? AND log_date >= ?
             ORDER BY log_date ASC",
        )?;

        let logs = stmt
            .query_map(
                params![owner.as_str(), format_date_key(from)],
                Self::parse_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(logs)
    }

    /// Fetch the log for one UTC date.
    pub fn get_by_date(&self, owner: &OwnerId, date: NaiveDate) -> Result<Option<DailyLog>> {
        let result = self.conn.query_row(
            "SELECT id, user_id, log_date, mood, energy, symptoms, notes, created_at, updated_at
             FROM daily_logs WHERE user_id = ? AND log_date = ?",
            params![owner.as_str(), format_date_key(date)],
            Self::parse_row,
        );

        match result {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a batch of logs in a single transaction.
    pub fn save_all(&self, logs: &[DailyLog]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for log in logs {
            tx.execute(
                "INSERT INTO daily_logs
                    (id, user_id, log_date, mood, energy, symptoms, notes, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    mood = excluded.mood,
                    energy = excluded.energy,
                    symptoms = excluded.symptoms,
                    notes = excluded.notes,
                    updated_at = excluded.updated_at",
                params![
                    log.id.as_str(),
                    log.owner.as_str(),
                    log.date_key(),
                    log.mood,
                    log.energy,
                    encode_list(&log.symptoms)?,
                    log.notes,
                    format_timestamp(log.created_at),
                    format_timestamp(log.updated_at),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyLog> {
        Ok(DailyLog {
            id: decode_id(&row.get::<_, String>(0)?),
            owner: OwnerId::new(row.get::<_, String>(1)?),
            log_date: decode_date(&row.get::<_, String>(2)?),
            mood: row.get(3)?,
            energy: row.get(4)?,
            symptoms: decode_list(&row.get::<_, String>(5)?),
            notes: row.get(6)?,
            created_at: decode_stamp(&row.get::<_, String>(7)?),
            updated_at: decode_stamp(&row.get::<_, String>(8)?),
        })
    }
}

/// Store for the singleton progress record.
pub struct ProgressStore<'a> {
    conn: &'a Connection,
}

impl<'a> ProgressStore<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fetch the owner's progress record, if one exists.
    pub fn get(&self, owner: &OwnerId) -> Result<Option<ProgressRecord>> {
        let result = self.conn.query_row(
            "SELECT id, user_id, current_streak, longest_streak, total_check_ins,
                    last_check_in, created_at, updated_at
             FROM progress_records WHERE user_id = ?",
            params![owner.as_str()],
            Self::parse_row,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert or overwrite the owner's progress record.
    pub fn upsert(&self, record: &ProgressRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO progress_records
                (id, user_id, current_streak, longest_streak, total_check_ins,
                 last_check_in, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                current_streak = excluded.current_streak,
                longest_streak = excluded.longest_streak,
                total_check_ins = excluded.total_check_ins,
                last_check_in = excluded.last_check_in,
                updated_at = excluded.updated_at",
            params![
                record.id.as_str(),
                record.owner.as_str(),
                record.current_streak,
                record.longest_streak,
                record.total_check_ins,
                record.last_check_in.map(format_date_key),
                format_timestamp(record.created_at),
                format_timestamp(record.updated_at),
            ],
        )?;
        Ok(())
    }

    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgressRecord> {
        Ok(ProgressRecord {
            id: decode_id(&row.get::<_, String>(0)?),
            owner: OwnerId::new(row.get::<_, String>(1)?),
            current_streak: row.get(2)?,
            longest_streak: row.get(3)?,
            total_check_ins: row.get(4)?,
            last_check_in: row.get::<_, Option<String>>(5)?.as_deref().map(decode_date),
            created_at: decode_stamp(&row.get::<_, String>(6)?),
            updated_at: decode_stamp(&row.get::<_, String>(7)?),
        })
    }
}

/// Store for cabinet items, keyed by ingredient identifier.
pub struct CabinetStore<'a> {
    conn: &'a Connection,
}

impl<'a> CabinetStore<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fetch every cabinet item for the owner, by ingredient.
    pub fn list(&self, owner: &OwnerId) -> Result<Vec<CabinetItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, ingredient, is_staple, added_at, last_used_at,
                    created_at, updated_at
             FROM cabinet_items WHERE user_id = ? ORDER BY ingredient ASC",
        )?;

        let items = stmt
            .query_map(params![owner.as_str()], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    /// Fetch one item by its ingredient identifier.
    pub fn get(&self, owner: &OwnerId, ingredient: &str) -> Result<Option<CabinetItem>> {
        let result = self.conn.query_row(
            "SELECT id, user_id, ingredient, is_staple, added_at, last_used_at,
                    created_at, updated_at
             FROM cabinet_items WHERE user_id = ? AND ingredient = ?",
            params![owner.as_str(), ingredient],
            Self::parse_row,
        );

        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a batch of items in a single transaction.
    pub fn save_all(&self, items: &[CabinetItem]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for item in items {
            tx.execute(
                "INSERT INTO cabinet_items
                    (id, user_id, ingredient, is_staple, added_at, last_used_at,
                     created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    is_staple = excluded.is_staple,
                    added_at = excluded.added_at,
                    last_used_at = excluded.last_used_at,
                    updated_at = excluded.updated_at",
                params![
                    item.id.as_str(),
                    item.owner.as_str(),
                    item.ingredient,
                    i32::from(item.is_staple),
                    format_timestamp(item.added_at),
                    item.last_used_at.map(format_timestamp),
                    format_timestamp(item.created_at),
                    format_timestamp(item.updated_at),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CabinetItem> {
        Ok(CabinetItem {
            id: decode_id(&row.get::<_, String>(0)?),
            owner: OwnerId::new(row.get::<_, String>(1)?),
            ingredient: row.get(2)?,
            is_staple: row.get::<_, i32>(3)? != 0,
            added_at: decode_stamp(&row.get::<_, String>(4)?),
            last_used_at: row
                .get::<_, Option<String>>(5)?
                .as_deref()
                .map(decode_stamp),
            created_at: decode_stamp(&row.get::<_, String>(6)?),
            updated_at: decode_stamp(&row.get::<_, String>(7)?),
        })
    }
}

/// Store for program enrollments, keyed by program identifier.
pub struct EnrollmentStore<'a> {
    conn: &'a Connection,
}

impl<'a> EnrollmentStore<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fetch every enrollment for the owner, by program.
    pub fn list(&self, owner: &OwnerId) -> Result<Vec<ProgramEnrollment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, program, started_on, current_day, completed,
                    created_at, updated_at
             FROM program_enrollments WHERE user_id = ? ORDER BY program ASC",
        )?;

        let enrollments = stmt
            .query_map(params![owner.as_str()], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(enrollments)
    }

    /// Fetch one enrollment by program identifier.
    pub fn get(&self, owner: &OwnerId, program: &str) -> Result<Option<ProgramEnrollment>> {
        let result = self.conn.query_row(
            "SELECT id, user_id, program, started_on, current_day, completed,
                    created_at, updated_at
             FROM program_enrollments WHERE user_id = ? AND program = ?",
            params![owner.as_str(), program],
            Self::parse_row,
        );

        match result {
            Ok(enrollment) => Ok(Some(enrollment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a batch of enrollments in a single transaction.
    pub fn save_all(&self, enrollments: &[ProgramEnrollment]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for enrollment in enrollments {
            tx.execute(
                "INSERT INTO program_enrollments
                    (id, user_id, program, started_on, current_day, completed,
                     created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    started_on = excluded.started_on,
                    current_day = excluded.current_day,
                    completed = excluded.completed,
                    updated_at = excluded.updated_at",
                params![
                    enrollment.id.as_str(),
                    enrollment.owner.as_str(),
                    enrollment.program,
                    format_date_key(enrollment.started_on),
                    enrollment.current_day,
                    i32::from(enrollment.completed),
                    format_timestamp(enrollment.created_at),
                    format_timestamp(enrollment.updated_at),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgramEnrollment> {
        Ok(ProgramEnrollment {
            id: decode_id(&row.get::<_, String>(0)?),
            owner: OwnerId::new(row.get::<_, String>(1)?),
            program: row.get(2)?,
            started_on: decode_date(&row.get::<_, String>(3)?),
            current_day: row.get(4)?,
            completed: row.get::<_, i32>(5)? != 0,
            created_at: decode_stamp(&row.get::<_, String>(6)?),
            updated_at: decode_stamp(&row.get::<_, String>(7)?),
        })
    }
}

/// Key/value store for coordinator state that must survive restarts.
pub struct SyncMetaStore<'a> {
    conn: &'a Connection,
}

impl<'a> SyncMetaStore<'a> {
    /// Key under which the last sync pass start is stored.
    pub const LAST_SYNC_STARTED_AT: &'static str = "last_sync_started_at";

    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM sync_meta WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
