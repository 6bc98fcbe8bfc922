//! HTTP API for the wellness service

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::config::{AppConfig, EmergencyContact};
use crate::db::Database;
use crate::intake::IntakeContext;
use crate::learning::LearningCatalog;
use crate::runtime::{DatabaseDispatcher, DatabaseStorage, IntakeRuntime, ProductionRuntime};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub runtime: Arc<ProductionRuntime>,
    pub emergency_contacts: Arc<Vec<EmergencyContact>>,
}

impl AppState {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let context = Arc::new(IntakeContext::new(
            config.replies.clone(),
            LearningCatalog::builtin(),
        ));
        let runtime = IntakeRuntime::new(
            DatabaseStorage::new(db.clone()),
            DatabaseDispatcher::new(db.clone()),
            context,
            config.onboarding_mode,
            config.dispatch_timeout,
        );
        Self {
            db,
            runtime: Arc::new(runtime),
            emergency_contacts: Arc::new(config.emergency_contacts.clone()),
        }
    }

    pub fn intake(&self) -> &IntakeContext {
        self.runtime.context()
    }
}
