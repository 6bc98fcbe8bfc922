//! Property-based tests for the intake classifier
//!
//! These tests verify the rule ordering and purity hold across generated
//! conversations.

use super::*;
use crate::learning::LearningCatalog;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> IntakeContext {
    IntakeContext::new(Replies::default(), LearningCatalog::builtin())
}

/// Words that trigger none of the keyword rules
const NEUTRAL_WORDS: &[&str] = &[
    "the", "weather", "was", "odd", "today", "work", "patrol", "quiet", "long", "day", "car",
    "coffee", "report", "partner", "court",
];

const GREETINGS: &[&str] = &["hi", "Hello", "HI", "hello"];

const MOOD_SAMPLES: &[&str] = &["feel", "feeling", "mood", "FEEL"];

/// Words mixing rule triggers with neutral filler
const MIXED_WORDS: &[&str] = &[
    "hi", "hello", "feel", "feeling", "mood", "happy", "good", "sad", "bad", "activity",
    "breathing", "sleep", "exercise", "today", "patrol", "tired", "Jordan", "Priya", "okay",
];

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = OnboardingState> {
    prop_oneof![
        Just(OnboardingState::New),
        Just(OnboardingState::AwaitingName),
        Just(OnboardingState::Onboarded),
    ]
}

fn arb_sentence(words: &'static [&'static str]) -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::sample::select(words), 1..6)
        .prop_map(|words| words.join(" "))
}

fn arb_greeting() -> impl Strategy<Value = String> {
    (
        "[a-z ]{0,10}",
        proptest::sample::select(GREETINGS),
        "[a-z ]{0,10}",
    )
        .prop_map(|(prefix, greeting, suffix)| format!("{prefix}{greeting}{suffix}"))
}

fn arb_mood_token() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(MOOD_SAMPLES)
}

fn arb_any_message() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_sentence(MIXED_WORDS),
        "[A-Za-z ,.!?']{1,40}".prop_filter("non-empty after trim", |s| !s.trim().is_empty()),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_greeting_when_new_asks_for_name(message in arb_greeting()) {
        let ctx = test_context();
        let outcome = classify(OnboardingState::New, &message, &ctx);
        prop_assert_eq!(&outcome.decision.reply_text, &ctx.replies.name_request);
        prop_assert!(outcome.decision.action.is_none());
        prop_assert_eq!(outcome.next_state, OnboardingState::AwaitingName);
    }

    #[test]
    fn prop_greeting_with_mood_resolves_through_onboarding(
        greeting in arb_greeting(),
        mood in arb_mood_token(),
        tail in arb_sentence(MIXED_WORDS),
    ) {
        let ctx = test_context();
        let message = format!("{greeting} {mood} {tail}");
        let outcome = classify(OnboardingState::New, &message, &ctx);
        prop_assert!(outcome.decision.action.is_none());
        prop_assert_eq!(outcome.next_state, OnboardingState::AwaitingName);
    }

    #[test]
    fn prop_awaiting_name_captures_message_verbatim(message in arb_any_message()) {
        let ctx = test_context();
        let outcome = classify(OnboardingState::AwaitingName, &message, &ctx);
        prop_assert_eq!(outcome.decision.action, Some(Action::update_name(message.clone())));
        prop_assert!(outcome.decision.reply_text.contains(&message));
        prop_assert_eq!(outcome.next_state, OnboardingState::Onboarded);
    }

    #[test]
    fn prop_classify_is_pure(state in arb_state(), message in arb_any_message()) {
        let ctx = test_context();
        prop_assert_eq!(classify(state, &message, &ctx), classify(state, &message, &ctx));
    }

    #[test]
    fn prop_keyword_free_message_gets_fallback(message in arb_sentence(NEUTRAL_WORDS)) {
        let ctx = test_context();
        let outcome = classify(OnboardingState::Onboarded, &message, &ctx);
        prop_assert_eq!(&outcome.decision.reply_text, &ctx.replies.fallback);
        prop_assert!(outcome.decision.action.is_none());
    }

    #[test]
    fn prop_mood_log_carries_message_and_valid_intensity(
        mood in arb_mood_token(),
        tail in arb_sentence(NEUTRAL_WORDS),
    ) {
        let ctx = test_context();
        let message = format!("{tail} {mood}");
        let outcome = classify(OnboardingState::Onboarded, &message, &ctx);
        match outcome.decision.action {
            Some(Action::LogMood { intensity, note, .. }) => {
                prop_assert!((Intensity::MIN..=Intensity::MAX).contains(&intensity.get()));
                prop_assert_eq!(note, message);
            }
            other => prop_assert!(false, "expected LogMood, got {:?}", other),
        }
    }

    #[test]
    fn prop_state_only_moves_forward(state in arb_state(), message in arb_any_message()) {
        let ctx = test_context();
        let next = classify(state, &message, &ctx).next_state;
        let rank = |s: OnboardingState| match s {
            OnboardingState::New => 0,
            OnboardingState::AwaitingName => 1,
            OnboardingState::Onboarded => 2,
        };
        prop_assert!(rank(next) >= rank(state));
        prop_assert!(rank(next) - rank(state) <= 1);
    }

    /// Driving a conversation with the explicit state and with marker
    /// inference over the accumulated history yields the same outcomes.
    #[test]
    fn prop_explicit_and_inferred_state_agree(
        messages in proptest::collection::vec(arb_sentence(MIXED_WORDS), 1..12)
    ) {
        let ctx = test_context();
        let mut history: Vec<ConversationTurn> = Vec::new();
        let mut state = OnboardingState::New;

        for message in messages {
            prop_assert_eq!(OnboardingState::infer(&history, &ctx.replies), state);

            let explicit = classify(state, &message, &ctx);
            let inferred = classify_history(&message, &history, &ctx);
            prop_assert_eq!(&explicit, &inferred);

            history.push(ConversationTurn::user(message));
            history.push(ConversationTurn::assistant(explicit.decision.reply_text.clone()));
            state = explicit.next_state;
        }
    }
}
