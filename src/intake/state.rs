//! Conversation turns and onboarding state

use super::Replies;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One message exchanged between the user and the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

#[allow(dead_code)] // Used in tests
impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Progress through the intake conversation.
///
/// Only moves forward: `New -> AwaitingName -> Onboarded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    /// The assistant has never asked for the user's name
    #[default]
    New,
    /// The name request was sent; the next message is taken as the name
    AwaitingName,
    /// The name was captured
    Onboarded,
}

impl OnboardingState {
    pub fn as_str(self) -> &'static str {
        match self {
            OnboardingState::New => "new",
            OnboardingState::AwaitingName => "awaiting_name",
            OnboardingState::Onboarded => "onboarded",
        }
    }

    /// Reconstruct the state by scanning earlier assistant turns for the
    /// configured marker phrases (case-insensitive).
    ///
    /// A history in which the name was never requested is `New` even if a
    /// profile-completion phrase shows up, matching the legacy rule order.
    pub fn infer(history: &[ConversationTurn], replies: &Replies) -> Self {
        let name_marker = replies.name_request_marker.to_lowercase();
        let profile_marker = replies.profile_marker.to_lowercase();

        let mut asked_for_name = false;
        let mut has_profile = false;
        for turn in history.iter().filter(|t| t.role == Role::Assistant) {
            let content = turn.content.to_lowercase();
            asked_for_name |= content.contains(&name_marker);
            has_profile |= content.contains(&profile_marker);
        }

        match (asked_for_name, has_profile) {
            (false, _) => OnboardingState::New,
            (true, false) => OnboardingState::AwaitingName,
            (true, true) => OnboardingState::Onboarded,
        }
    }
}

impl fmt::Display for OnboardingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnboardingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OnboardingState::New),
            "awaiting_name" => Ok(OnboardingState::AwaitingName),
            "onboarded" => Ok(OnboardingState::Onboarded),
            other => Err(format!("unknown onboarding state: {other}")),
        }
    }
}
