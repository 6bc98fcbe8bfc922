//! Service configuration from environment variables

use crate::intake::Replies;
use crate::runtime::OnboardingMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 2000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid reply templates: {0}")]
    Replies(String),
}

/// A number to call for help
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub role: String,
    pub phone: String,
}

pub fn default_emergency_contacts() -> Vec<EmergencyContact> {
    vec![
        EmergencyContact {
            name: "Emergency Response Team".to_string(),
            role: "24/7 Support".to_string(),
            phone: "100".to_string(),
        },
        EmergencyContact {
            name: "Mental Health Helpline".to_string(),
            role: "Counseling Support".to_string(),
            phone: "1800-599-0019".to_string(),
        },
    ]
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub onboarding_mode: OnboardingMode,
    pub dispatch_timeout: Duration,
    pub replies: Replies,
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("MINDFUL_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".mindful").join("mindful.db")
            },
            PathBuf::from,
        );

        let port = match lookup("MINDFUL_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "MINDFUL_PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let onboarding_mode = match lookup("MINDFUL_ONBOARDING_MODE") {
            Some(raw) => raw.parse::<OnboardingMode>().map_err(|reason| ConfigError::Invalid {
                var: "MINDFUL_ONBOARDING_MODE",
                value: raw.clone(),
                reason,
            })?,
            None => OnboardingMode::default(),
        };

        let timeout_ms = match lookup("MINDFUL_DISPATCH_TIMEOUT_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        var: "MINDFUL_DISPATCH_TIMEOUT_MS",
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(ms) => ms,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "MINDFUL_DISPATCH_TIMEOUT_MS",
                        value: raw,
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_DISPATCH_TIMEOUT_MS,
        };

        let replies = match lookup("MINDFUL_REPLIES_PATH") {
            Some(path) => read_json::<Replies>(Path::new(&path))?,
            None => Replies::default(),
        };
        replies.validate().map_err(ConfigError::Replies)?;

        let emergency_contacts = match lookup("MINDFUL_EMERGENCY_CONTACTS_PATH") {
            Some(path) => read_json(Path::new(&path))?,
            None => default_emergency_contacts(),
        };

        Ok(Self {
            db_path,
            port,
            onboarding_mode,
            dispatch_timeout: Duration::from_millis(timeout_ms),
            replies,
            emergency_contacts,
        })
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
