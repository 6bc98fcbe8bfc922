//! Mock implementations for testing
//!
//! These mocks enable runtime testing without real I/O.

use super::traits::*;
use crate::intake::{Action, ConversationTurn, OnboardingState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// In-Memory Storage
// ============================================================================

#[derive(Default)]
struct Tables {
    turns: HashMap<String, Vec<ConversationTurn>>,
    states: HashMap<String, OnboardingState>,
}

/// In-memory storage for testing
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_next_state_write: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next commit that carries a state change fail
    pub fn fail_next_state_write(&self) {
        self.fail_next_state_write.store(true, Ordering::SeqCst);
    }

    pub fn all_turns(&self, user_id: &str) -> Vec<ConversationTurn> {
        self.tables
            .lock()
            .unwrap()
            .turns
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn stored_state(&self, user_id: &str) -> Option<OnboardingState> {
        self.tables.lock().unwrap().states.get(user_id).copied()
    }
}

#[async_trait]
impl TurnStore for InMemoryStorage {
    async fn get_turns(&self, user_id: &str) -> Result<Vec<ConversationTurn>, String> {
        Ok(self.all_turns(user_id))
    }

    async fn commit_turn(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
        next_state: Option<OnboardingState>,
    ) -> Result<(), String> {
        let mut tables = self.tables.lock().unwrap();
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        if next_state.is_some() && self.fail_next_state_write.swap(false, Ordering::SeqCst) {
            return Err("state write failed".to_string());
        }

        let turns = tables.turns.entry(user_id.to_string()).or_default();
        turns.push(ConversationTurn::user(user_message));
        turns.push(ConversationTurn::assistant(reply));
        if let Some(state) = next_state {
            tables.states.insert(user_id.to_string(), state);
        }
        Ok(())
    }
}

#[async_trait]
impl OnboardingStore for InMemoryStorage {
    async fn get_onboarding_state(&self, user_id: &str) -> Result<OnboardingState, String> {
        Ok(self.stored_state(user_id).unwrap_or_default())
    }
}

// ============================================================================
// Mock Dispatcher
// ============================================================================

/// Records dispatched actions; can be told to fail
#[derive(Default)]
pub struct MockDispatcher {
    pub dispatched: Mutex<Vec<(String, Action)>>,
    fail: AtomicBool,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let dispatcher = Self::default();
        dispatcher.fail.store(true, Ordering::SeqCst);
        dispatcher
    }

    pub fn recorded(&self) -> Vec<(String, Action)> {
        self.dispatched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionDispatcher for MockDispatcher {
    async fn dispatch(&self, user_id: &str, action: &Action) -> Result<(), DispatchError> {
        self.dispatched
            .lock()
            .unwrap()
            .push((user_id.to_string(), action.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Profile("connection refused".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Delayed Mock Dispatcher (for timeout and concurrency testing)
// ============================================================================

/// Dispatcher that sleeps before succeeding
pub struct DelayedMockDispatcher {
    inner: MockDispatcher,
    delay: Duration,
    /// Notified when a dispatch starts
    pub dispatch_started: Arc<Notify>,
}

impl DelayedMockDispatcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockDispatcher::new(),
            delay,
            dispatch_started: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl ActionDispatcher for DelayedMockDispatcher {
    async fn dispatch(&self, user_id: &str, action: &Action) -> Result<(), DispatchError> {
        self.dispatch_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.dispatch(user_id, action).await
    }
}

// ============================================================================
// Runtime Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{IntakeContext, MoodLabel, Replies};
    use crate::learning::LearningCatalog;
    use crate::runtime::{ChatError, IntakeRuntime, OnboardingMode};

    fn context() -> Arc<IntakeContext> {
        Arc::new(IntakeContext::new(
            Replies::default(),
            LearningCatalog::builtin(),
        ))
    }

    fn runtime<D: ActionDispatcher + 'static>(
        storage: Arc<InMemoryStorage>,
        dispatcher: D,
        mode: OnboardingMode,
    ) -> IntakeRuntime<Arc<InMemoryStorage>, D> {
        IntakeRuntime::new(storage, dispatcher, context(), mode, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let storage = Arc::new(InMemoryStorage::new());
        let rt = runtime(storage.clone(), MockDispatcher::new(), OnboardingMode::Explicit);

        assert_eq!(
            rt.send_message("u-1", "   \n").await,
            Err(ChatError::EmptyMessage)
        );
        assert!(storage.all_turns("u-1").is_empty());
    }

    #[tokio::test]
    async fn test_onboarding_flow_explicit() {
        let storage = Arc::new(InMemoryStorage::new());
        let dispatcher = Arc::new(MockDispatcher::new());
        let rt = runtime(storage.clone(), dispatcher.clone(), OnboardingMode::Explicit);

        let first = rt.send_message("u-1", "hello").await.unwrap();
        assert_eq!(first.reply_text, Replies::default().name_request);
        assert_eq!(first.onboarding_state, OnboardingState::AwaitingName);
        assert_eq!(storage.stored_state("u-1"), Some(OnboardingState::AwaitingName));

        let second = rt.send_message("u-1", "  Alex ").await.unwrap();
        assert_eq!(second.action, Some(Action::update_name("Alex")));
        assert_eq!(second.onboarding_state, OnboardingState::Onboarded);
        assert!(second.notice.is_none());

        let third = rt.send_message("u-1", "I feel good today").await.unwrap();
        assert!(matches!(
            third.action,
            Some(Action::LogMood {
                mood_label: MoodLabel::Positive,
                ..
            })
        ));
        assert_eq!(third.onboarding_state, OnboardingState::Onboarded);

        let recorded = dispatcher.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|(user, _)| user == "u-1"));
    }

    #[tokio::test]
    async fn test_turns_stored_user_then_assistant() {
        let storage = Arc::new(InMemoryStorage::new());
        let rt = runtime(storage.clone(), MockDispatcher::new(), OnboardingMode::Explicit);

        rt.send_message("u-1", "hi").await.unwrap();
        let turns = storage.all_turns("u-1");
        assert_eq!(
            turns,
            vec![
                ConversationTurn::user("hi"),
                ConversationTurn::assistant(Replies::default().name_request),
            ]
        );
    }

    #[tokio::test]
    async fn test_legacy_mode_infers_without_storing_state() {
        let storage = Arc::new(InMemoryStorage::new());
        let rt = runtime(
            storage.clone(),
            MockDispatcher::new(),
            OnboardingMode::LegacyMarkers,
        );

        rt.send_message("u-1", "hello").await.unwrap();
        let outcome = rt.send_message("u-1", "Sam").await.unwrap();

        assert_eq!(outcome.action, Some(Action::update_name("Sam")));
        assert_eq!(outcome.onboarding_state, OnboardingState::Onboarded);
        assert_eq!(storage.stored_state("u-1"), None);
    }

    #[tokio::test]
    async fn test_explicit_and_legacy_modes_agree() {
        let script = [
            "I feel sad",
            "hello there",
            "Officer Priya",
            "hi again",
            "my mood is bad",
            "any breathing exercise?",
            "thanks",
        ];

        let explicit = runtime(
            Arc::new(InMemoryStorage::new()),
            MockDispatcher::new(),
            OnboardingMode::Explicit,
        );
        let legacy = runtime(
            Arc::new(InMemoryStorage::new()),
            MockDispatcher::new(),
            OnboardingMode::LegacyMarkers,
        );

        for message in script {
            let a = explicit.send_message("u-1", message).await.unwrap();
            let b = legacy.send_message("u-1", message).await.unwrap();
            assert_eq!(a, b, "modes diverged on {message:?}");
        }
    }

    #[tokio::test]
    async fn test_dispatch_failure_becomes_notice() {
        let storage = Arc::new(InMemoryStorage::new());
        let rt = runtime(
            storage.clone(),
            MockDispatcher::failing(),
            OnboardingMode::Explicit,
        );

        rt.send_message("u-1", "hello").await.unwrap();
        let outcome = rt.send_message("u-1", "Alex").await.unwrap();

        assert!(outcome.reply_text.contains("Alex"));
        assert!(outcome.notice.is_some());
        assert_eq!(outcome.onboarding_state, OnboardingState::Onboarded);
        assert_eq!(storage.all_turns("u-1").len(), 4);
    }

    #[tokio::test]
    async fn test_dispatch_timeout_becomes_notice() {
        let storage = Arc::new(InMemoryStorage::new());
        let rt = IntakeRuntime::new(
            storage,
            DelayedMockDispatcher::new(Duration::from_millis(500)),
            context(),
            OnboardingMode::Explicit,
            Duration::from_millis(20),
        );

        let outcome = rt.send_message("u-1", "I feel bad").await.unwrap();
        assert!(outcome.action.is_some());
        assert!(outcome.notice.is_some());
    }

    #[tokio::test]
    async fn test_storage_failure_is_error_and_releases_user() {
        let storage = Arc::new(InMemoryStorage::new());
        let rt = runtime(storage.clone(), MockDispatcher::new(), OnboardingMode::Explicit);

        storage.fail_writes(true);
        assert!(matches!(
            rt.send_message("u-1", "hello").await,
            Err(ChatError::Storage(_))
        ));

        storage.fail_writes(false);
        assert!(rt.send_message("u-1", "hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_state_write_stores_no_turns() {
        let storage = Arc::new(InMemoryStorage::new());
        let rt = runtime(storage.clone(), MockDispatcher::new(), OnboardingMode::Explicit);

        storage.fail_next_state_write();
        assert!(matches!(
            rt.send_message("u-1", "hello").await,
            Err(ChatError::Storage(_))
        ));
        assert!(storage.all_turns("u-1").is_empty());
        assert_eq!(storage.stored_state("u-1"), None);

        // The retry starts the conversation over
        let retry = rt.send_message("u-1", "hello").await.unwrap();
        assert_eq!(retry.reply_text, Replies::default().name_request);
        assert_eq!(retry.onboarding_state, OnboardingState::AwaitingName);

        let turns = storage.all_turns("u-1");
        assert_eq!(turns.len(), 2);
        assert_eq!(
            OnboardingState::infer(&turns, &Replies::default()),
            storage.stored_state("u-1").unwrap()
        );
    }

    #[tokio::test]
    async fn test_concurrent_turn_for_same_user_is_busy() {
        let dispatcher = Arc::new(DelayedMockDispatcher::new(Duration::from_millis(300)));
        let started = dispatcher.dispatch_started.clone();
        let rt = Arc::new(IntakeRuntime::new(
            Arc::new(InMemoryStorage::new()),
            dispatcher,
            context(),
            OnboardingMode::Explicit,
            Duration::from_secs(2),
        ));

        let slow = {
            let rt = rt.clone();
            tokio::spawn(async move { rt.send_message("u-1", "I feel tired").await })
        };
        started.notified().await;

        assert_eq!(
            rt.send_message("u-1", "hello?").await,
            Err(ChatError::Busy("u-1".to_string()))
        );
        // Other users are not blocked
        assert!(rt.send_message("u-2", "how about an activity").await.is_ok());

        assert!(slow.await.unwrap().is_ok());
        assert!(rt.send_message("u-1", "thanks").await.is_ok());
    }
}
