//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock). Services only ever see these traits.

use uuid::Uuid;

use crate::error::Result;
use crate::models::{Ad, AppConfig, SupportMessage, User};
use crate::storage::Snapshot;

/// Account repository operations
pub trait AccountRepository {
    /// Insert a new account; fails with `DuplicateAccount` if the email exists
    fn create_account(&self, user: &User) -> Result<()>;

    /// Find an account by normalized email
    fn find_account(&self, email: &str) -> Result<Option<User>>;

    /// Overwrite every mutable field of an existing account
    fn save_account(&self, user: &User) -> Result<()>;

    /// All accounts, newest first
    fn list_accounts(&self) -> Result<Vec<User>>;

    /// Add usage seconds, clamped at `ceiling`. Returns the new total, or
    /// `None` if the account does not exist.
    fn add_usage(&self, email: &str, seconds: u32, ceiling: u32) -> Result<Option<u32>>;
}

/// Support channel operations
pub trait SupportRepository {
    /// Append one message and return it with its assigned id
    fn append_support_message(
        &self,
        sender_email: &str,
        text: &str,
        is_admin_reply: bool,
    ) -> Result<SupportMessage>;

    /// Messages for one user's thread, oldest first
    fn list_support_messages_for(&self, email: &str) -> Result<Vec<SupportMessage>>;

    /// The whole log, oldest first
    fn list_support_messages(&self) -> Result<Vec<SupportMessage>>;
}

/// App-wide settings and ads
pub trait SettingsRepository {
    /// Current app config; defaults are written on first read
    fn load_app_config(&self, default_interval: u32) -> Result<AppConfig>;

    /// Set the ad rotation interval in seconds
    fn set_ad_interval(&self, seconds: u32) -> Result<()>;

    /// Append an ad to the rotation
    fn insert_ad(&self, ad: &Ad) -> Result<()>;

    /// Delete an ad; returns whether it existed
    fn delete_ad(&self, id: Uuid) -> Result<bool>;

    /// Include or exclude an ad from rotation; returns whether it exists
    fn set_ad_active(&self, id: Uuid, active: bool) -> Result<bool>;
}

/// Whole-store backup and restore
pub trait SnapshotRepository {
    fn export_snapshot(&self) -> Result<Snapshot>;

    /// Replace the stored state atomically with the snapshot contents
    fn restore_snapshot(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
pub trait Storage:
    AccountRepository + SupportRepository + SettingsRepository + SnapshotRepository
{
}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: AccountRepository + SupportRepository + SettingsRepository + SnapshotRepository
{
}
