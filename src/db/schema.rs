//! Database schema and record types

use crate::intake::{Intensity, MoodLabel, OnboardingState, Role};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    email TEXT,
    bio TEXT,
    badge_number TEXT,
    department TEXT,
    onboarding_state TEXT NOT NULL DEFAULT 'new',
    registered BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_messages (
    message_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chat_messages_user ON chat_messages(user_id, sequence_id);

CREATE TABLE IF NOT EXISTS moods (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    mood_label TEXT NOT NULL,
    intensity INTEGER NOT NULL CHECK (intensity BETWEEN 1 AND 5),
    note TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_moods_user ON moods(user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    read BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS survey_responses (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    category TEXT NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_survey_responses_user ON survey_responses(user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS emergency_reports (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    details TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS wellness_metrics (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    stress_level INTEGER NOT NULL CHECK (stress_level BETWEEN 1 AND 10),
    mood_score INTEGER NOT NULL CHECK (mood_score BETWEEN 1 AND 10),
    interaction_count INTEGER NOT NULL DEFAULT 0,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_wellness_metrics_user ON wellness_metrics(user_id, recorded_at);
";

/// Profile columns that `merge_profile_fields` may write
pub const PROFILE_FIELDS: &[&str] = &["name", "email", "bio", "badge_number", "department"];

/// User profile record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub badge_number: Option<String>,
    pub department: Option<String>,
    pub onboarding_state: OnboardingState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub user_id: String,
    pub sequence_id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Mood log entry. Rows are only ever inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: String,
    pub user_id: String,
    pub mood_label: MoodLabel,
    pub intensity: Intensity,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate view of a user's mood log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodStats {
    pub total: i64,
    pub average_intensity: Option<f64>,
    pub most_recent: Option<RecentMood>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentMood {
    pub mood_label: MoodLabel,
    pub intensity: Intensity,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyStats {
    pub total: i64,
    pub last_submission: Option<DateTime<Utc>>,
}

/// Kind of emergency a user reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyKind {
    Medical,
    Security,
    Mental,
}

impl EmergencyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EmergencyKind::Medical => "medical",
            EmergencyKind::Security => "security",
            EmergencyKind::Mental => "mental",
        }
    }
}

impl fmt::Display for EmergencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmergencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medical" => Ok(EmergencyKind::Medical),
            "security" => Ok(EmergencyKind::Security),
            "mental" => Ok(EmergencyKind::Mental),
            other => Err(format!("unknown emergency kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyReport {
    pub id: String,
    pub user_id: String,
    pub kind: EmergencyKind,
    pub details: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Self-reported stress and mood check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessMetric {
    pub id: String,
    pub user_id: String,
    pub stress_level: u8,
    pub mood_score: u8,
    pub interaction_count: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Everything recorded for a user on one UTC day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub metric_count: i64,
    pub average_stress: Option<f64>,
    pub average_mood: Option<f64>,
    /// Interactions reported with the check-ins
    pub reported_interactions: i64,
    /// Messages the user sent to the companion
    pub chat_messages: i64,
    pub mood_entries: i64,
    pub negative_moods: i64,
}

impl DailyActivity {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            metric_count: 0,
            average_stress: None,
            average_mood: None,
            reported_interactions: 0,
            chat_messages: 0,
            mood_entries: 0,
            negative_moods: 0,
        }
    }
}

/// One page of chat history, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct ChatPage {
    pub messages: Vec<ChatMessage>,
    /// Older turns exist before the first message
    pub has_more: bool,
}
