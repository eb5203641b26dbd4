//! Deployment configuration
//!
//! Loaded from `hydra.toml` in the platform config directory. Every section is
//! optional; a missing file yields the defaults. Secrets (bootstrap admin
//! credential, assistant API key) may also come from the environment so they
//! never have to live in source or in a checked-in file.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "hydra.toml";
pub const DATABASE_FILE_NAME: &str = "hydra.db";

pub const ENV_ADMIN_EMAIL: &str = "HYDRA_ADMIN_EMAIL";
pub const ENV_ADMIN_SECRET: &str = "HYDRA_ADMIN_SECRET";
pub const ENV_API_KEY: &str = "HYDRA_API_KEY";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Could not determine platform directories")]
    NoProjectDirs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraConfig {
    pub storage: StorageConfig,
    pub admin: Option<AdminBootstrap>,
    pub usage: UsagePolicy,
    pub ads: AdsConfig,
    pub payment: PaymentConfig,
    pub assistant: AssistantConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; defaults to `hydra.db` in the platform data directory
    pub path: Option<PathBuf>,
}

/// The single privileged credential, supplied at deployment time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminBootstrap {
    pub email: String,
    pub secret: String,
    #[serde(default = "default_admin_name")]
    pub name: String,
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

/// Free-tier metering rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsagePolicy {
    pub free_ceiling_seconds: u32,
    /// Ticks accumulated in memory before a write to storage
    pub flush_interval_ticks: u32,
    pub tick_millis: u64,
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self {
            free_ceiling_seconds: 600,
            flush_interval_ticks: 10,
            tick_millis: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsConfig {
    pub default_interval_seconds: u32,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            default_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub pix_key: String,
    pub basic_price: String,
    pub premium_price: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            pix_key: String::new(),
            basic_price: "R$ 24,99/mês".to_string(),
            premium_price: "R$ 299,90 (lifetime)".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub system_instruction: String,
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-3-flash-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            system_instruction: "You are HydraPro AI. Answer directly, technically and professionally."
                .to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub splash_delay_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            splash_delay_ms: 1200,
        }
    }
}

impl HydraConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        info!(path = %path.display(), "Loaded config file");
        Self::from_toml_str(&text)
    }

    /// Load from the platform config directory and apply environment overrides
    pub fn load_default() -> Result<Self, ConfigError> {
        let dirs = project_dirs()?;
        let mut config = Self::load(&dirs.config_dir().join(CONFIG_FILE_NAME))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.assistant.api_key = Some(key);
        }

        let email = lookup(ENV_ADMIN_EMAIL).filter(|e| !e.is_empty());
        let secret = lookup(ENV_ADMIN_SECRET).filter(|s| !s.is_empty());
        match (&mut self.admin, email, secret) {
            (Some(admin), email, secret) => {
                if let Some(email) = email {
                    admin.email = email;
                }
                if let Some(secret) = secret {
                    admin.secret = secret;
                }
            }
            (None, Some(email), Some(secret)) => {
                self.admin = Some(AdminBootstrap {
                    email,
                    secret,
                    name: default_admin_name(),
                });
            }
            _ => {}
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.usage.free_ceiling_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "usage.free_ceiling_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        if self.usage.flush_interval_ticks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "usage.flush_interval_ticks",
                reason: "must be greater than zero".into(),
            });
        }
        if self.usage.tick_millis == 0 {
            return Err(ConfigError::InvalidValue {
                field: "usage.tick_millis",
                reason: "must be greater than zero".into(),
            });
        }
        if self.ads.default_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ads.default_interval_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        if let Some(admin) = &self.admin {
            if !admin.email.contains('@') {
                return Err(ConfigError::InvalidValue {
                    field: "admin.email",
                    reason: format!("'{}' is not an email address", admin.email),
                });
            }
            if admin.secret.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "admin.secret",
                    reason: "must not be empty".into(),
                });
            }
        }
        Ok(())
    }

    /// Resolved database path
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE_NAME)),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("app", "hydrapro", "hydra").ok_or(ConfigError::NoProjectDirs)
}
