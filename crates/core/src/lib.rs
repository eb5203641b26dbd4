//! HydraPro Core Library
//!
//! Account, entitlement, usage and support logic for the HydraPro chat client,
//! on top of a SQLite persistence layer.

pub mod accounts;
pub mod ads;
pub mod config;
pub mod credentials;
pub mod error;
pub mod invariants;
pub mod models;
pub mod payments;
pub mod storage;
pub mod support;
pub mod usage;

pub use accounts::AccountService;
pub use ads::{AdBoard, AdRotation};
pub use config::{AdminBootstrap, ConfigError, HydraConfig, UsagePolicy};
pub use error::{Error, Result};
pub use models::*;
pub use payments::PaymentWorkflow;
pub use storage::{
    AccountRepository, Database, SettingsRepository, Snapshot, SnapshotRepository, Storage,
    SupportRepository,
};
pub use support::SupportLog;
pub use usage::{format_remaining, TickOutcome, UsageMeter};
