//! Application state management

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hydra_core::{Database, HydraConfig, Result};
use tracing::{info, warn};

use crate::assistant::{Assistant, GeminiAssistant, Unconfigured};

/// Process-wide handles shared by every session
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<HydraConfig>,
    pub assistant: Arc<dyn Assistant>,
}

impl AppState {
    /// Open the configured database and build the assistant client
    pub fn new(config: HydraConfig) -> Result<Self> {
        let db_path = config.database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?
            .with_default_ad_interval(config.ads.default_interval_seconds);
        info!(path = %db_path.display(), "Database ready");

        let assistant: Arc<dyn Assistant> = match GeminiAssistant::from_config(&config.assistant) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                warn!(error = %e, "Assistant disabled; replies will report a core failure");
                Arc::new(Unconfigured)
            }
        };

        Ok(Self::with_parts(db, config, assistant))
    }

    /// Assemble from existing parts (tests, embedding)
    pub fn with_parts(db: Database, config: HydraConfig, assistant: Arc<dyn Assistant>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            assistant,
        }
    }

    /// Lock the database. A poisoned lock is recovered: every store call is
    /// a single statement or transaction, so no half-written state survives a panic.
    pub fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &HydraConfig {
        &self.config
    }
}
