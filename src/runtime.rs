//! Runtime for chat turns
//!
//! Wraps the pure intake classifier with history loading, turn persistence,
//! onboarding state tracking and action dispatch.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ChatError, IntakeRuntime, TurnOutcome};
pub use traits::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = IntakeRuntime<DatabaseStorage, DatabaseDispatcher>;

/// Where the runtime gets a user's onboarding state from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingMode {
    /// Stored per user and updated after each turn
    #[default]
    Explicit,
    /// Inferred from marker phrases in earlier assistant replies
    LegacyMarkers,
}

impl OnboardingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OnboardingMode::Explicit => "explicit",
            OnboardingMode::LegacyMarkers => "legacy_markers",
        }
    }
}

impl fmt::Display for OnboardingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnboardingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explicit" => Ok(OnboardingMode::Explicit),
            "legacy_markers" | "legacy" => Ok(OnboardingMode::LegacyMarkers),
            other => Err(format!(
                "unknown onboarding mode: {other} (expected explicit or legacy_markers)"
            )),
        }
    }
}
