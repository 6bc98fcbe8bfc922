//! Decisions and the actions they carry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Detected sentiment of a mood report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodLabel {
    Positive,
    Neutral,
    Negative,
}

impl MoodLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            MoodLabel::Positive => "positive",
            MoodLabel::Neutral => "neutral",
            MoodLabel::Negative => "negative",
        }
    }

    /// Intensity recorded when the label is inferred from chat
    pub fn default_intensity(self) -> Intensity {
        match self {
            MoodLabel::Positive => Intensity(4),
            MoodLabel::Neutral => Intensity(3),
            MoodLabel::Negative => Intensity(2),
        }
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(MoodLabel::Positive),
            "neutral" => Ok(MoodLabel::Neutral),
            "negative" => Ok(MoodLabel::Negative),
            other => Err(format!("unknown mood label: {other}")),
        }
    }
}

/// Mood intensity on a 1-5 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Intensity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "intensity must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<Intensity> for u8 {
    fn from(value: Intensity) -> Self {
        value.0
    }
}

/// Side effect for the caller to execute after showing the reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Action {
    /// Merge fields into the user's profile (idempotent upsert)
    UpdateProfile { fields: BTreeMap<String, String> },

    /// Append a mood log entry
    LogMood {
        mood_label: MoodLabel,
        intensity: Intensity,
        note: String,
    },

    /// Informational only; nothing is persisted
    SuggestActivity {
        activity_id: String,
        duration_hint: String,
    },
}

impl Action {
    pub fn update_name(name: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), name.into());
        Action::UpdateProfile { fields }
    }

    pub fn log_mood(mood_label: MoodLabel, note: impl Into<String>) -> Self {
        Action::LogMood {
            mood_label,
            intensity: mood_label.default_intensity(),
            note: note.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::UpdateProfile { .. } => "update_profile",
            Action::LogMood { .. } => "log_mood",
            Action::SuggestActivity { .. } => "suggest_activity",
        }
    }
}

/// Classifier output: the reply plus at most one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeDecision {
    pub reply_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl IntakeDecision {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply_text: text.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}
