//! Intake runtime executor

use super::traits::{ActionDispatcher, Storage};
use super::OnboardingMode;

use crate::intake::{classify, Action, IntakeContext, OnboardingState};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("A message for user {0} is already being processed")]
    Busy(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result of one chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub reply_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    pub onboarding_state: OnboardingState,
    /// Set when the action could not be applied; the reply still stands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Runs chat turns through the classifier, storage and dispatcher
pub struct IntakeRuntime<S, D>
where
    S: Storage + 'static,
    D: ActionDispatcher + 'static,
{
    storage: S,
    dispatcher: Arc<D>,
    context: Arc<IntakeContext>,
    mode: OnboardingMode,
    dispatch_timeout: Duration,
    /// Users with a turn in progress
    in_flight: Mutex<HashSet<String>>,
}

impl<S, D> IntakeRuntime<S, D>
where
    S: Storage + 'static,
    D: ActionDispatcher + 'static,
{
    pub fn new(
        storage: S,
        dispatcher: D,
        context: Arc<IntakeContext>,
        mode: OnboardingMode,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            dispatcher: Arc::new(dispatcher),
            context,
            mode,
            dispatch_timeout,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn context(&self) -> &IntakeContext {
        &self.context
    }

    /// Process one user message and return the assistant's reply
    pub async fn send_message(&self, user_id: &str, text: &str) -> Result<TurnOutcome, ChatError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let _guard = self.begin_turn(user_id)?;

        let history = self
            .storage
            .get_turns(user_id)
            .await
            .map_err(ChatError::Storage)?;

        let state = match self.mode {
            OnboardingMode::Explicit => self
                .storage
                .get_onboarding_state(user_id)
                .await
                .map_err(ChatError::Storage)?,
            OnboardingMode::LegacyMarkers => OnboardingState::infer(&history, &self.context.replies),
        };

        let outcome = classify(state, message, &self.context);
        tracing::info!(
            user_id = %user_id,
            state = %state,
            next_state = %outcome.next_state,
            action = outcome.decision.action.as_ref().map_or("none", Action::kind),
            "Classified message"
        );

        // Explicit mode stores the state only when it changes
        let next_state = (self.mode == OnboardingMode::Explicit && outcome.next_state != state)
            .then_some(outcome.next_state);
        self.storage
            .commit_turn(user_id, message, &outcome.decision.reply_text, next_state)
            .await
            .map_err(ChatError::Storage)?;

        let notice = match &outcome.decision.action {
            Some(action) => self.dispatch(user_id, action).await,
            None => None,
        };

        Ok(TurnOutcome {
            reply_text: outcome.decision.reply_text,
            action: outcome.decision.action,
            onboarding_state: outcome.next_state,
            notice,
        })
    }

    /// Apply an action, returning a user-facing notice on failure
    async fn dispatch(&self, user_id: &str, action: &Action) -> Option<String> {
        match tokio::time::timeout(
            self.dispatch_timeout,
            self.dispatcher.dispatch(user_id, action),
        )
        .await
        {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                tracing::error!(user_id = %user_id, action = action.kind(), error = %e, "Action dispatch failed");
                Some(notice_for(action))
            }
            Err(_) => {
                tracing::error!(
                    user_id = %user_id,
                    action = action.kind(),
                    timeout_ms = u64::try_from(self.dispatch_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Action dispatch timed out"
                );
                Some(notice_for(action))
            }
        }
    }

    fn begin_turn(&self, user_id: &str) -> Result<TurnGuard<'_>, ChatError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(user_id.to_string()) {
            tracing::warn!(user_id = %user_id, "Rejected concurrent message");
            return Err(ChatError::Busy(user_id.to_string()));
        }
        Ok(TurnGuard {
            in_flight: &self.in_flight,
            user_id: user_id.to_string(),
        })
    }
}

/// Releases the user's in-flight slot when the turn ends
struct TurnGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    user_id: String,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}

fn notice_for(action: &Action) -> String {
    match action {
        Action::UpdateProfile { .. } => {
            "We couldn't save your profile just now. Please try again later.".to_string()
        }
        Action::LogMood { .. } => {
            "We couldn't record your mood just now. Please try again later.".to_string()
        }
        Action::SuggestActivity { .. } => {
            "We couldn't prepare that activity just now.".to_string()
        }
    }
}
