//! Pure intake classifier
//!
//! Rules are evaluated in a fixed priority order and the first match wins:
//! name request, name capture, mood detection, activity request, fallback.
//! Matching is case-insensitive substring matching throughout.

use super::{Action, ConversationTurn, IntakeDecision, MoodLabel, OnboardingState, Replies};
use crate::learning::LearningCatalog;
use serde::Serialize;

const GREETING_TOKENS: &[&str] = &["hi", "hello"];
const MOOD_TOKENS: &[&str] = &["feel", "feeling", "mood"];
const POSITIVE_TOKENS: &[&str] = &["happy", "good"];
const NEGATIVE_TOKENS: &[&str] = &["sad", "bad"];
const ACTIVITY_TOKENS: &[&str] = &["activity", "exercise", "breathing", "meditation", "relax"];

/// Read-only inputs the classifier needs besides the message
#[derive(Debug, Clone, Default)]
pub struct IntakeContext {
    pub replies: Replies,
    pub catalog: LearningCatalog,
}

impl IntakeContext {
    pub fn new(replies: Replies, catalog: LearningCatalog) -> Self {
        Self { replies, catalog }
    }
}

/// Result of classifying one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeOutcome {
    #[serde(flatten)]
    pub decision: IntakeDecision,
    pub next_state: OnboardingState,
}

impl IntakeOutcome {
    fn stay(state: OnboardingState, decision: IntakeDecision) -> Self {
        Self {
            decision,
            next_state: state,
        }
    }
}

/// Classify a message given the explicit onboarding state.
///
/// Total and deterministic: no I/O, no errors. The message is expected to be
/// non-empty after trimming; the caller filters empty input.
pub fn classify(state: OnboardingState, message: &str, ctx: &IntakeContext) -> IntakeOutcome {
    let lower = message.to_lowercase();
    let replies = &ctx.replies;

    match state {
        OnboardingState::New if contains_any(&lower, GREETING_TOKENS) => {
            return IntakeOutcome {
                decision: IntakeDecision::reply(replies.name_request.clone()),
                next_state: OnboardingState::AwaitingName,
            };
        }
        OnboardingState::AwaitingName => {
            // The whole message is the name, verbatim
            return IntakeOutcome {
                decision: IntakeDecision::reply(replies.name_ack_for(message))
                    .with_action(Action::update_name(message)),
                next_state: OnboardingState::Onboarded,
            };
        }
        _ => {}
    }

    if contains_any(&lower, MOOD_TOKENS) {
        let label = detect_mood(&lower);
        let decision = IntakeDecision::reply(replies.mood_ack_for(label.as_str()))
            .with_action(Action::log_mood(label, message));
        return IntakeOutcome::stay(state, decision);
    }

    if contains_any(&lower, ACTIVITY_TOKENS) {
        if let Some(resource) = ctx.catalog.suggest_for(&lower) {
            let reply = replies.activity_for(
                &resource.title,
                &resource.time_to_read,
                &resource.description,
            );
            let decision = IntakeDecision::reply(reply).with_action(Action::SuggestActivity {
                activity_id: resource.id.clone(),
                duration_hint: resource.time_to_read.clone(),
            });
            return IntakeOutcome::stay(state, decision);
        }
    }

    IntakeOutcome::stay(state, IntakeDecision::reply(replies.fallback.clone()))
}

/// Classify using only the prior turns, inferring onboarding progress from
/// the marker phrases earlier assistant replies contain.
pub fn classify_history(
    message: &str,
    history: &[ConversationTurn],
    ctx: &IntakeContext,
) -> IntakeOutcome {
    let state = OnboardingState::infer(history, &ctx.replies);
    classify(state, message, ctx)
}

fn detect_mood(lower: &str) -> MoodLabel {
    if contains_any(lower, POSITIVE_TOKENS) {
        MoodLabel::Positive
    } else if contains_any(lower, NEGATIVE_TOKENS) {
        MoodLabel::Negative
    } else {
        MoodLabel::Neutral
    }
}

fn contains_any(haystack: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| haystack.contains(t))
}
