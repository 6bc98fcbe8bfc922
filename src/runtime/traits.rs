//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the intake runtime with mock implementations.

use crate::db::Database;
use crate::intake::{Action, ConversationTurn, OnboardingState};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Storage for conversation turns
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Get all turns for a user in chronological order
    async fn get_turns(&self, user_id: &str) -> Result<Vec<ConversationTurn>, String>;

    /// Atomically append the user turn, then the reply, and store
    /// `next_state` when given. On error nothing is stored.
    async fn commit_turn(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
        next_state: Option<OnboardingState>,
    ) -> Result<(), String>;
}

/// Storage for explicit onboarding state
#[async_trait]
pub trait OnboardingStore: Send + Sync {
    async fn get_onboarding_state(&self, user_id: &str) -> Result<OnboardingState, String>;
}

/// Combined storage trait for convenience
pub trait Storage: TurnStore + OnboardingStore {}
impl<T: TurnStore + OnboardingStore> Storage for T {}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Failed to update profile: {0}")]
    Profile(String),
    #[error("Failed to log mood: {0}")]
    Mood(String),
}

/// Executes the side effect an intake decision asks for
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, user_id: &str, action: &Action) -> Result<(), DispatchError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: TurnStore + ?Sized> TurnStore for Arc<T> {
    async fn get_turns(&self, user_id: &str) -> Result<Vec<ConversationTurn>, String> {
        (**self).get_turns(user_id).await
    }

    async fn commit_turn(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
        next_state: Option<OnboardingState>,
    ) -> Result<(), String> {
        (**self)
            .commit_turn(user_id, user_message, reply, next_state)
            .await
    }
}

#[async_trait]
impl<T: OnboardingStore + ?Sized> OnboardingStore for Arc<T> {
    async fn get_onboarding_state(&self, user_id: &str) -> Result<OnboardingState, String> {
        (**self).get_onboarding_state(user_id).await
    }
}

#[async_trait]
impl<T: ActionDispatcher + ?Sized> ActionDispatcher for Arc<T> {
    async fn dispatch(&self, user_id: &str, action: &Action) -> Result<(), DispatchError> {
        (**self).dispatch(user_id, action).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TurnStore for DatabaseStorage {
    async fn get_turns(&self, user_id: &str) -> Result<Vec<ConversationTurn>, String> {
        let messages = self.db.get_turns(user_id).map_err(|e| e.to_string())?;
        Ok(messages
            .into_iter()
            .map(|m| ConversationTurn {
                role: m.role,
                content: m.content,
            })
            .collect())
    }

    async fn commit_turn(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
        next_state: Option<OnboardingState>,
    ) -> Result<(), String> {
        self.db
            .commit_turn(user_id, user_message, reply, next_state)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl OnboardingStore for DatabaseStorage {
    async fn get_onboarding_state(&self, user_id: &str) -> Result<OnboardingState, String> {
        self.db
            .get_onboarding_state(user_id)
            .map_err(|e| e.to_string())
    }
}

/// Adapter that applies actions to the Database
#[derive(Clone)]
pub struct DatabaseDispatcher {
    db: Database,
}

impl DatabaseDispatcher {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActionDispatcher for DatabaseDispatcher {
    async fn dispatch(&self, user_id: &str, action: &Action) -> Result<(), DispatchError> {
        match action {
            Action::UpdateProfile { fields } => {
                self.db
                    .merge_profile_fields(user_id, fields)
                    .map_err(|e| DispatchError::Profile(e.to_string()))?;
            }
            Action::LogMood {
                mood_label,
                intensity,
                note,
            } => {
                self.db
                    .log_mood(user_id, *mood_label, *intensity, note)
                    .map_err(|e| DispatchError::Mood(e.to_string()))?;
            }
            Action::SuggestActivity { activity_id, .. } => {
                tracing::debug!(user_id = %user_id, activity_id = %activity_id, "Suggested activity");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{Intensity, MoodLabel};

    #[tokio::test]
    async fn test_database_dispatcher_applies_actions() {
        let db = Database::open_in_memory().unwrap();
        let dispatcher = DatabaseDispatcher::new(db.clone());

        dispatcher
            .dispatch("u-1", &Action::update_name("Alex"))
            .await
            .unwrap();
        dispatcher
            .dispatch("u-1", &Action::log_mood(MoodLabel::Negative, "I feel bad"))
            .await
            .unwrap();
        dispatcher
            .dispatch(
                "u-1",
                &Action::SuggestActivity {
                    activity_id: "box-breathing".to_string(),
                    duration_hint: "4 minutes".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(db.get_profile("u-1").unwrap().name, "Alex");
        let moods = db.list_moods("u-1", 10).unwrap();
        assert_eq!(moods.len(), 1);
        assert_eq!(moods[0].intensity, Intensity::new(2).unwrap());
        assert_eq!(moods[0].note, "I feel bad");
    }

    #[tokio::test]
    async fn test_database_storage_commits_turns_and_state() {
        let storage = DatabaseStorage::new(Database::open_in_memory().unwrap());
        storage
            .commit_turn(
                "u-1",
                "hello",
                "What should I call you?",
                Some(OnboardingState::AwaitingName),
            )
            .await
            .unwrap();

        let turns = storage.get_turns("u-1").await.unwrap();
        assert_eq!(
            turns,
            vec![
                ConversationTurn::user("hello"),
                ConversationTurn::assistant("What should I call you?"),
            ]
        );
        assert_eq!(
            storage.get_onboarding_state("u-1").await.unwrap(),
            OnboardingState::AwaitingName
        );
    }
}
