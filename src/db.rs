//! Database module for the wellness service
//!
//! Provides persistence for profiles, chat history, mood logs,
//! notifications, surveys and emergency reports.

mod emergency;
mod metrics;
mod notifications;
mod schema;
mod surveys;

pub use metrics::{DateRange, DEFAULT_RANGE_DAYS};
pub use notifications::DEFAULT_NOTIFICATION_LIMIT;
pub use schema::*;

use crate::intake::{Intensity, MoodLabel, OnboardingState, Role};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, types::Type, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("User already exists: {0}")]
    UserExists(String),
    #[error("Unknown profile field: {0}")]
    UnknownProfileField(String),
    #[error("Notification not found: {0}")]
    NotificationNotFound(String),
    #[error("Invalid wellness metric: {0}")]
    InvalidMetric(String),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Default page size for mood listings
pub const DEFAULT_MOOD_LIMIT: u32 = 30;

/// Default page size for chat history
pub const DEFAULT_CHAT_PAGE_LIMIT: u32 = 50;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;

        // Add the registered column to older databases; errors once it exists
        let _ = conn.execute(
            "ALTER TABLE users ADD COLUMN registered BOOLEAN NOT NULL DEFAULT 0",
            [],
        );
        Ok(())
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // ==================== Profile Operations ====================

    /// Register a user and seed the welcome notification.
    ///
    /// A row left behind by chat before signup is completed in place,
    /// keeping what chat already stored where the signup leaves it blank.
    /// Only a user who already signed up is rejected.
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: Option<&str>,
        badge_number: Option<&str>,
        department: Option<&str>,
    ) -> DbResult<Profile> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = timestamp(Utc::now());

        let registered: Option<bool> = tx
            .query_row(
                "SELECT registered FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match registered {
            Some(true) => return Err(DbError::UserExists(id.to_string())),
            Some(false) => {
                tx.execute(
                    "UPDATE users SET
                         name = CASE WHEN ?2 = '' THEN name ELSE ?2 END,
                         email = COALESCE(?3, email),
                         badge_number = COALESCE(?4, badge_number),
                         department = COALESCE(?5, department),
                         registered = 1,
                         updated_at = ?6
                     WHERE id = ?1",
                    params![id, name, email, badge_number, department, now],
                )?;
                tracing::info!(user_id = %id, "Completed signup for user first seen in chat");
            }
            None => {
                tx.execute(
                    "INSERT INTO users (id, name, email, badge_number, department, onboarding_state, registered, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)",
                    params![
                        id,
                        name,
                        email,
                        badge_number,
                        department,
                        OnboardingState::New.as_str(),
                        now
                    ],
                )?;
            }
        }

        notifications::insert_notification(
            &tx,
            id,
            "Welcome!",
            "Thanks for joining Mindful. Your companion is here whenever you need to talk.",
        )?;

        let profile = query_profile(&tx, id)?;
        tx.commit()?;
        Ok(profile)
    }

    /// Get a profile by user ID
    pub fn get_profile(&self, id: &str) -> DbResult<Profile> {
        let conn = self.conn()?;
        query_profile(&conn, id)
    }

    /// Merge fields into a profile, creating the row if needed.
    ///
    /// Repeating the same merge leaves the same field values behind.
    pub fn merge_profile_fields(
        &self,
        id: &str,
        fields: &BTreeMap<String, String>,
    ) -> DbResult<Profile> {
        if let Some(unknown) = fields
            .keys()
            .find(|k| !PROFILE_FIELDS.contains(&k.as_str()))
        {
            return Err(DbError::UnknownProfileField(unknown.clone()));
        }

        let conn = self.conn()?;
        let now = timestamp(Utc::now());

        let mut columns = vec!["id", "created_at", "updated_at"];
        let mut values = vec![id.to_string(), now.clone(), now];
        for (field, value) in fields {
            columns.push(field.as_str());
            values.push(value.clone());
        }

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let mut updates: Vec<String> = fields
            .keys()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        updates.push("updated_at = excluded.updated_at".to_string());

        let sql = format!(
            "INSERT INTO users ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
            columns.join(", "),
            placeholders.join(", "),
            updates.join(", "),
        );
        conn.execute(&sql, params_from_iter(values.iter()))?;

        tracing::debug!(user_id = %id, fields = ?fields.keys().collect::<Vec<_>>(), "Merged profile fields");
        query_profile(&conn, id)
    }

    /// Stored onboarding state; users without a row are `New`
    pub fn get_onboarding_state(&self, id: &str) -> DbResult<OnboardingState> {
        let conn = self.conn()?;
        let state: Option<String> = conn
            .query_row(
                "SELECT onboarding_state FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match state {
            Some(s) => Ok(s.parse().unwrap_or_else(|e| {
                tracing::warn!(user_id = %id, error = %e, "Unreadable onboarding state, treating as new");
                OnboardingState::New
            })),
            None => Ok(OnboardingState::New),
        }
    }

    // ==================== Chat Operations ====================

    /// Store one exchange and the state it leads to in a single transaction.
    ///
    /// The user turn and the reply get consecutive sequence ids. A failure
    /// anywhere rolls the whole exchange back.
    pub fn commit_turn(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
        next_state: Option<OnboardingState>,
    ) -> DbResult<(ChatMessage, ChatMessage)> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let user_turn = insert_turn(&tx, user_id, Role::User, user_message)?;
        let reply_turn = insert_turn(&tx, user_id, Role::Assistant, reply)?;
        if let Some(state) = next_state {
            upsert_onboarding_state(&tx, user_id, state)?;
        }

        tx.commit()?;
        Ok((user_turn, reply_turn))
    }

    /// All turns for a user in chronological order
    pub fn get_turns(&self, user_id: &str) -> DbResult<Vec<ChatMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT message_id, user_id, sequence_id, role, content, created_at
             FROM chat_messages WHERE user_id = ?1 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![user_id], parse_chat_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// The newest `limit` turns before sequence id `before` (or the end),
    /// returned oldest first
    pub fn list_turns_page(
        &self,
        user_id: &str,
        limit: u32,
        before: Option<i64>,
    ) -> DbResult<ChatPage> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT message_id, user_id, sequence_id, role, content, created_at
             FROM chat_messages
             WHERE user_id = ?1 AND (?2 IS NULL OR sequence_id < ?2)
             ORDER BY sequence_id DESC LIMIT ?3",
        )?;

        // One extra row tells whether older turns remain
        let rows = stmt.query_map(
            params![user_id, before, i64::from(limit) + 1],
            parse_chat_row,
        )?;
        let mut messages = rows.collect::<Result<Vec<_>, _>>()?;

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let has_more = messages.len() > limit;
        messages.truncate(limit);
        messages.reverse();
        Ok(ChatPage { messages, has_more })
    }

    // ==================== Mood Operations ====================

    /// Insert a mood entry with a server-assigned id and timestamp
    pub fn log_mood(
        &self,
        user_id: &str,
        mood_label: MoodLabel,
        intensity: Intensity,
        note: &str,
    ) -> DbResult<MoodEntry> {
        let conn = self.conn()?;
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO moods (id, user_id, mood_label, intensity, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                user_id,
                mood_label.as_str(),
                intensity.get(),
                note,
                timestamp(now)
            ],
        )?;

        Ok(MoodEntry {
            id,
            user_id: user_id.to_string(),
            mood_label,
            intensity,
            note: note.to_string(),
            created_at: now,
        })
    }

    /// Most recent mood entries first
    pub fn list_moods(&self, user_id: &str, limit: u32) -> DbResult<Vec<MoodEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, mood_label, intensity, note, created_at
             FROM moods WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit], parse_mood_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn mood_stats(&self, user_id: &str) -> DbResult<MoodStats> {
        let conn = self.conn()?;
        let (total, average_intensity): (i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), AVG(intensity) FROM moods WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let most_recent = conn
            .query_row(
                "SELECT id, user_id, mood_label, intensity, note, created_at
                 FROM moods WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![user_id],
                parse_mood_row,
            )
            .optional()?
            .map(|entry| RecentMood {
                mood_label: entry.mood_label,
                intensity: entry.intensity,
                created_at: entry.created_at,
            });

        Ok(MoodStats {
            total,
            average_intensity,
            most_recent,
        })
    }
}

fn query_profile(conn: &Connection, id: &str) -> DbResult<Profile> {
    conn.query_row(
        "SELECT id, name, email, bio, badge_number, department, onboarding_state, created_at, updated_at
         FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(Profile {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                bio: row.get(3)?,
                badge_number: row.get(4)?,
                department: row.get(5)?,
                onboarding_state: parse_column(6, &row.get::<_, String>(6)?)?,
                created_at: parse_datetime(&row.get::<_, String>(7)?),
                updated_at: parse_datetime(&row.get::<_, String>(8)?),
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::UserNotFound(id.to_string()),
        other => DbError::Sqlite(other),
    })
}

fn insert_turn(
    conn: &Connection,
    user_id: &str,
    role: Role,
    content: &str,
) -> DbResult<ChatMessage> {
    let now = Utc::now();
    let message_id = uuid::Uuid::new_v4().to_string();

    let sequence_id: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM chat_messages WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO chat_messages (message_id, user_id, sequence_id, role, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            message_id,
            user_id,
            sequence_id,
            role.to_string(),
            content,
            timestamp(now)
        ],
    )?;

    Ok(ChatMessage {
        message_id,
        user_id: user_id.to_string(),
        sequence_id,
        role,
        content: content.to_string(),
        created_at: now,
    })
}

/// Creates the user row if needed
fn upsert_onboarding_state(conn: &Connection, id: &str, state: OnboardingState) -> DbResult<()> {
    conn.execute(
        "INSERT INTO users (id, onboarding_state, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(id) DO UPDATE SET onboarding_state = excluded.onboarding_state,
                                       updated_at = excluded.updated_at",
        params![id, state.as_str(), timestamp(Utc::now())],
    )?;
    Ok(())
}

fn parse_chat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        message_id: row.get(0)?,
        user_id: row.get(1)?,
        sequence_id: row.get(2)?,
        role: parse_column(3, &row.get::<_, String>(3)?)?,
        content: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_mood_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MoodEntry> {
    let raw_intensity: i64 = row.get(3)?;
    let intensity = u8::try_from(raw_intensity)
        .ok()
        .and_then(Intensity::new)
        .ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Integer,
                format!("intensity out of range: {raw_intensity}").into(),
            )
        })?;

    Ok(MoodEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        mood_label: parse_column(2, &row.get::<_, String>(2)?)?,
        intensity,
        note: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

/// Parse a text column into a type with a string `FromStr` error
fn parse_column<T: FromStr<Err = String>>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
