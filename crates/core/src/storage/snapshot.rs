//! Backup document covering accounts and the app config
//!
//! Export writes a pretty-printed JSON document. Import accepts that document or
//! the older bare `{ email: user }` mapping. Parsing and validation finish before
//! anything is written, and the write itself is one transaction.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{SettingsStore, SupportStore, UserStore};
use crate::error::{Error, Result};
use crate::models::{normalize_email, AppConfig, PaymentStatus, User};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub users: BTreeMap<String, User>,
    /// Absent in legacy backups; restore then leaves settings untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AppConfig>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Full(Snapshot),
    Legacy(BTreeMap<String, User>),
}

impl Snapshot {
    pub fn new(users: Vec<User>, config: AppConfig) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            users: users.into_iter().map(|u| (u.email.clone(), u)).collect(),
            config: Some(config),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a backup document
    pub fn from_json(text: &str) -> Result<Self> {
        let document: SnapshotDocument =
            serde_json::from_str(text).map_err(|e| Error::MalformedSnapshot(e.to_string()))?;

        let snapshot = match document {
            SnapshotDocument::Full(snapshot) => snapshot,
            SnapshotDocument::Legacy(users) => Self {
                version: 0,
                exported_at: Utc::now(),
                users,
                config: None,
            },
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        if self.version > SNAPSHOT_VERSION {
            return Err(Error::MalformedSnapshot(format!(
                "unsupported version {}",
                self.version
            )));
        }

        for (key, user) in &self.users {
            if key != &user.email {
                return Err(Error::MalformedSnapshot(format!(
                    "key '{key}' does not match record email '{}'",
                    user.email
                )));
            }
            if !user.email.contains('@') {
                return Err(Error::MalformedSnapshot(format!(
                    "'{}' is not an email address",
                    user.email
                )));
            }
            if key != &normalize_email(key) {
                return Err(Error::MalformedSnapshot(format!(
                    "'{key}' is not a normalized email"
                )));
            }
            let approved = user.payment_status == PaymentStatus::Approved;
            if approved && user.is_free() {
                return Err(Error::MalformedSnapshot(format!(
                    "'{key}' is approved but on the free plan"
                )));
            }
            if user.is_admin && (!approved || user.is_free()) {
                return Err(Error::MalformedSnapshot(format!(
                    "administrator '{key}' must be an approved paid account"
                )));
            }
        }

        if let Some(config) = &self.config {
            if config.ad_interval_seconds == 0 {
                return Err(Error::MalformedSnapshot("ad interval must be positive".into()));
            }
            let mut ids = HashSet::new();
            if !config.support_messages.iter().all(|m| ids.insert(m.id)) {
                return Err(Error::MalformedSnapshot("duplicate support message id".into()));
            }
            let mut ad_ids = HashSet::new();
            if !config.ads.iter().all(|a| ad_ids.insert(a.id)) {
                return Err(Error::MalformedSnapshot("duplicate ad id".into()));
            }
        }
        Ok(())
    }
}

/// Replace stored state with the snapshot inside one transaction
#[instrument(skip(conn, snapshot), fields(users = snapshot.users.len()))]
pub(crate) fn restore(conn: &rusqlite::Connection, snapshot: &Snapshot) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    let users = UserStore::new(&tx);
    users.clear()?;
    for user in snapshot.users.values() {
        users.create(user)?;
    }

    if let Some(config) = &snapshot.config {
        let support = SupportStore::new(&tx);
        support.clear()?;
        for message in &config.support_messages {
            support.insert_existing(message)?;
        }

        let settings = SettingsStore::new(&tx);
        settings.clear_ads()?;
        for ad in &config.ads {
            settings.insert_ad(ad)?;
        }
        settings.set_ad_interval(config.ad_interval_seconds)?;
    }

    tx.commit()?;
    info!(version = snapshot.version, "Snapshot restored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            Snapshot::from_json("not valid json"),
            Err(Error::MalformedSnapshot(_))
        ));
        assert!(matches!(Snapshot::from_json("[1, 2]"), Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn legacy_mapping_is_accepted() {
        let user = User::new("ana@example.com".into(), "hash".into());
        let legacy = serde_json::json!({ "ana@example.com": user });

        let snapshot = Snapshot::from_json(&legacy.to_string()).unwrap();
        assert_eq!(snapshot.users.len(), 1);
        assert!(snapshot.config.is_none());
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let user = User::new("ana@example.com".into(), "hash".into());
        let doc = serde_json::json!({ "bob@example.com": user });
        assert!(matches!(
            Snapshot::from_json(&doc.to_string()),
            Err(Error::MalformedSnapshot(_))
        ));
    }

    fn assert_rejected(key: &str, user: User) {
        let doc = serde_json::json!({ key: user });
        assert!(matches!(
            Snapshot::from_json(&doc.to_string()),
            Err(Error::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn mixed_case_key_is_rejected() {
        let user = User::new("Ana@Example.com".into(), "hash".into());
        assert_rejected("Ana@Example.com", user);
    }

    #[test]
    fn approved_free_account_is_rejected() {
        let mut user = User::new("ana@example.com".into(), "hash".into());
        user.payment_status = PaymentStatus::Approved;
        assert_rejected("ana@example.com", user);
    }

    #[test]
    fn admin_must_keep_the_administrator_shape() {
        let mut free_admin = User::new("owner@example.com".into(), "hash".into());
        free_admin.is_admin = true;
        assert_rejected("owner@example.com", free_admin);

        let mut pending_admin =
            User::administrator("owner@example.com".into(), "Owner".into(), "hash".into());
        pending_admin.payment_status = PaymentStatus::Pending;
        assert_rejected("owner@example.com", pending_admin);

        let admin = User::administrator("owner@example.com".into(), "Owner".into(), "hash".into());
        let doc = serde_json::json!({ "owner@example.com": admin });
        assert!(Snapshot::from_json(&doc.to_string()).is_ok());
    }

    #[test]
    fn export_document_parses_back() {
        let user = User::new("ana@example.com".into(), "hash".into());
        let snapshot = Snapshot::new(vec![user.clone()], AppConfig::with_interval(60));

        let parsed = Snapshot::from_json(&snapshot.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed.users.get("ana@example.com"), Some(&user));
        assert_eq!(parsed.config.unwrap().ad_interval_seconds, 60);
    }
}
