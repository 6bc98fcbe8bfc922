//! Reply templates and the marker phrases the legacy inference scans for

use serde::{Deserialize, Serialize};

/// Assistant reply templates.
///
/// Placeholders: `{name}` in `name_ack`, `{mood}` in `mood_ack`,
/// `{title}`, `{duration}` and `{description}` in `activity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Replies {
    pub name_request: String,
    pub name_request_marker: String,
    pub name_ack: String,
    pub profile_marker: String,
    pub mood_ack: String,
    pub activity: String,
    pub fallback: String,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            name_request: "Hi! I'd love to get to know you better. What should I call you?"
                .to_string(),
            name_request_marker: "What should I call you?".to_string(),
            name_ack: "Nice to meet you, {name}! How are you feeling today?".to_string(),
            profile_marker: "Nice to meet you".to_string(),
            mood_ack: "I understand you're feeling {mood}. Thanks for sharing. \
                       Would you like to try an activity?"
                .to_string(),
            activity: "You could try \"{title}\" ({duration}). {description}".to_string(),
            fallback: "That's interesting. Tell me more.".to_string(),
        }
    }
}

impl Replies {
    /// Check that the templates emit the markers the history scan relies on,
    /// so both onboarding modes agree.
    pub fn validate(&self) -> Result<(), String> {
        if self.name_request_marker.trim().is_empty() {
            return Err("name_request_marker must not be empty".to_string());
        }
        if self.profile_marker.trim().is_empty() {
            return Err("profile_marker must not be empty".to_string());
        }
        if !contains_ci(&self.name_request, &self.name_request_marker) {
            return Err("name_request must contain name_request_marker".to_string());
        }
        if !self.name_ack.contains("{name}") {
            return Err("name_ack must contain the {name} placeholder".to_string());
        }
        if !contains_ci(&self.name_ack, &self.profile_marker) {
            return Err("name_ack must contain profile_marker".to_string());
        }
        if contains_ci(&self.name_request, &self.profile_marker) {
            return Err("name_request must not contain profile_marker".to_string());
        }
        for (label, template) in [
            ("mood_ack", &self.mood_ack),
            ("activity", &self.activity),
            ("fallback", &self.fallback),
        ] {
            if contains_ci(template, &self.name_request_marker)
                || contains_ci(template, &self.profile_marker)
            {
                return Err(format!("{label} must not contain an onboarding marker"));
            }
        }
        Ok(())
    }

    pub fn name_ack_for(&self, name: &str) -> String {
        self.name_ack.replace("{name}", name)
    }

    pub fn mood_ack_for(&self, mood: &str) -> String {
        self.mood_ack.replace("{mood}", mood)
    }

    pub fn activity_for(&self, title: &str, duration: &str, description: &str) -> String {
        self.activity
            .replace("{title}", title)
            .replace("{duration}", duration)
            .replace("{description}", description)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
