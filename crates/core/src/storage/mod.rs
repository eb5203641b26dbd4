//! SQLite storage layer for HydraPro

mod messages;
mod migrations;
mod parse;
mod settings;
mod snapshot;
mod traits;
mod users;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Ad, AppConfig, SupportMessage, User};

pub use messages::SupportStore;
pub use settings::SettingsStore;
pub use snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use traits::{
    AccountRepository, SettingsRepository, SnapshotRepository, Storage, SupportRepository,
};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
    /// Interval written on first config read
    default_ad_interval: u32,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn,
            default_ad_interval: 60,
        };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            default_ad_interval: 60,
        };
        db.init()?;
        Ok(db)
    }

    /// Override the ad interval used when the config is first initialized
    pub fn with_default_ad_interval(mut self, seconds: u32) -> Self {
        self.default_ad_interval = seconds;
        self
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    pub fn support(&self) -> SupportStore<'_> {
        SupportStore::new(&self.conn)
    }

    pub fn settings(&self) -> SettingsStore<'_> {
        SettingsStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl AccountRepository for Database {
    fn create_account(&self, user: &User) -> Result<()> {
        self.users().create(user)
    }

    fn find_account(&self, email: &str) -> Result<Option<User>> {
        self.users().find_by_email(email)
    }

    fn save_account(&self, user: &User) -> Result<()> {
        self.users().update(user)
    }

    fn list_accounts(&self) -> Result<Vec<User>> {
        self.users().list()
    }

    fn add_usage(&self, email: &str, seconds: u32, ceiling: u32) -> Result<Option<u32>> {
        self.users().add_usage(email, seconds, ceiling)
    }
}

impl SupportRepository for Database {
    fn append_support_message(
        &self,
        sender_email: &str,
        text: &str,
        is_admin_reply: bool,
    ) -> Result<SupportMessage> {
        self.support().append(sender_email, text, is_admin_reply)
    }

    fn list_support_messages_for(&self, email: &str) -> Result<Vec<SupportMessage>> {
        self.support().list_for(email)
    }

    fn list_support_messages(&self) -> Result<Vec<SupportMessage>> {
        self.support().list_all()
    }
}

impl SettingsRepository for Database {
    fn load_app_config(&self, default_interval: u32) -> Result<AppConfig> {
        self.settings().load(default_interval)
    }

    fn set_ad_interval(&self, seconds: u32) -> Result<()> {
        self.settings().set_ad_interval(seconds)
    }

    fn insert_ad(&self, ad: &Ad) -> Result<()> {
        self.settings().insert_ad(ad)
    }

    fn delete_ad(&self, id: Uuid) -> Result<bool> {
        self.settings().delete_ad(id)
    }

    fn set_ad_active(&self, id: Uuid, active: bool) -> Result<bool> {
        self.settings().set_ad_active(id, active)
    }
}

impl SnapshotRepository for Database {
    fn export_snapshot(&self) -> Result<Snapshot> {
        let users = self.users().list()?;
        let config = self.settings().load(self.default_ad_interval)?;
        Ok(Snapshot::new(users, config))
    }

    fn restore_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        snapshot::restore(&self.conn, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hydra.db");
        {
            let db = Database::open(&path).unwrap();
            db.create_account(&User::new("ana@example.com".into(), "hash".into()))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.find_account("ana@example.com").unwrap().is_some());
        assert_eq!(db.schema_version(), 2);
    }

    #[test]
    fn restore_replaces_everything_in_one_go() {
        let source = Database::open_in_memory().unwrap();
        source
            .create_account(&User::new("ana@example.com".into(), "h".into()))
            .unwrap();
        source.append_support_message("ana@example.com", "help", false).unwrap();
        source.set_ad_interval(15).unwrap();
        let snapshot = source.export_snapshot().unwrap();

        let target = Database::open_in_memory().unwrap();
        target
            .create_account(&User::new("old@example.com".into(), "h".into()))
            .unwrap();
        target.restore_snapshot(&snapshot).unwrap();

        let emails: Vec<_> = target.list_accounts().unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["ana@example.com"]);
        assert_eq!(target.list_support_messages().unwrap().len(), 1);
        assert_eq!(target.load_app_config(60).unwrap().ad_interval_seconds, 15);
    }

    #[test]
    fn failed_restore_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&User::new("keep@example.com".into(), "h".into()))
            .unwrap();

        // Two records sharing one id violate the UNIQUE(id) constraint mid-write
        let a = User::new("a@example.com".into(), "h".into());
        let mut b = User::new("b@example.com".into(), "h".into());
        b.id = a.id;
        let snapshot = Snapshot::new(vec![a, b], AppConfig::with_interval(60));

        assert!(matches!(
            db.restore_snapshot(&snapshot),
            Err(Error::DuplicateAccount(_))
        ));
        let emails: Vec<_> = db.list_accounts().unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["keep@example.com"]);
    }
}
