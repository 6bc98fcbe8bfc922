//! Conversational intake engine
//!
//! A pure, rule-based classifier in the Elm Architecture style: given the
//! onboarding state and a new user message it produces a reply, an optional
//! action for the caller to execute, and the next onboarding state.

mod action;
pub mod classify;
mod replies;
pub mod state;

#[cfg(test)]
mod proptests;

pub use action::{Action, IntakeDecision, Intensity, MoodLabel};
pub use classify::{classify, classify_history, IntakeContext};
pub use replies::Replies;
pub use state::{ConversationTurn, OnboardingState, Role};
