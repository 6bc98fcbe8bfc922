//! API request and response types

use crate::config::EmergencyContact;
use crate::db::{
    DateRange, EmergencyKind, EmergencyReport, MoodEntry, Notification, SurveyResponse,
    WellnessMetric,
};
use crate::intake::{Action, ConversationTurn, MoodLabel, OnboardingState};
use crate::learning::LearningResource;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request to classify a message without touching storage
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// When absent, the state is inferred from `history`
    pub onboarding_state: Option<OnboardingState>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub reply_text: String,
    pub action: Option<Action>,
    pub next_state: OnboardingState,
}

/// Request to create a user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Generated when absent
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub badge_number: Option<String>,
    pub department: Option<String>,
}

/// Request to merge profile fields
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub fields: BTreeMap<String, String>,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Paging for chat history. `before` is a sequence id cursor.
#[derive(Debug, Deserialize)]
pub struct ChatPageQuery {
    pub limit: Option<u32>,
    pub before: Option<i64>,
}

/// Request to log a mood directly
#[derive(Debug, Deserialize)]
pub struct LogMoodRequest {
    pub mood_label: MoodLabel,
    /// Defaults to the label's default intensity
    pub intensity: Option<u8>,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MoodListResponse {
    pub moods: Vec<MoodEntry>,
}

/// Wellness check-in
#[derive(Debug, Deserialize)]
pub struct MetricRequest {
    pub stress_level: u8,
    pub mood_score: u8,
    #[serde(default)]
    pub interaction_count: u32,
    /// Defaults to now
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Inclusive day range; defaults to the last 30 days
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct MetricListResponse {
    pub range: DateRange,
    pub metrics: Vec<WellnessMetric>,
}

#[derive(Debug, Deserialize)]
pub struct SurveyRequest {
    pub category: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct SurveyQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SurveyListResponse {
    pub responses: Vec<SurveyResponse>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[derive(Debug, Deserialize)]
pub struct LearningQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LearningListResponse {
    pub resources: Vec<LearningResource>,
}

#[derive(Debug, Serialize)]
pub struct EmergencyContactsResponse {
    pub contacts: Vec<EmergencyContact>,
}

#[derive(Debug, Deserialize)]
pub struct EmergencyRequest {
    pub kind: EmergencyKind,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct EmergencyListResponse {
    pub reports: Vec<EmergencyReport>,
}

/// Response for actions without a body
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
