//! Account registration, authentication and backup
//!
//! The privileged path is driven by the deployment's [`AdminBootstrap`]: the
//! configured email plus bootstrap secret always authenticates and materializes
//! the administrator record on first use.

use tracing::{info, instrument, warn};

use crate::config::AdminBootstrap;
use crate::credentials::{hash_secret, verify_secret};
use crate::error::{Error, Result};
use crate::invariants::assert_user_invariants;
use crate::models::{normalize_email, User};
use crate::storage::{AccountRepository, Snapshot, SnapshotRepository};

pub struct AccountService<'a, R: ?Sized> {
    repo: &'a R,
    admin: Option<&'a AdminBootstrap>,
}

impl<'a, R> AccountService<'a, R>
where
    R: AccountRepository + ?Sized,
{
    pub fn new(repo: &'a R, admin: Option<&'a AdminBootstrap>) -> Self {
        Self { repo, admin }
    }

    /// Create a free-tier account
    #[instrument(skip(self, secret))]
    pub fn register(&self, email: &str, secret: &str) -> Result<User> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidInput("Enter a valid email address.".into()));
        }
        if secret.is_empty() {
            return Err(Error::InvalidInput("Enter a password.".into()));
        }
        if self.is_bootstrap_email(&email) {
            return Err(Error::DuplicateAccount(email));
        }
        if self.repo.find_account(&email)?.is_some() {
            return Err(Error::DuplicateAccount(email));
        }

        let user = User::new(email, hash_secret(secret)?);
        self.repo.create_account(&user)?;
        info!(email = %user.email, "Account registered");
        Ok(user)
    }

    /// Verify a credential and return the account
    #[instrument(skip(self, secret))]
    pub fn authenticate(&self, email: &str, secret: &str) -> Result<User> {
        let email = normalize_email(email);

        if let Some(admin) = self.admin {
            if email == normalize_email(&admin.email) && secret == admin.secret {
                return self.bootstrap_admin(admin);
            }
        }

        let user = self
            .repo
            .find_account(&email)?
            .ok_or_else(|| Error::AccountNotFound(email.clone()))?;

        if !verify_secret(secret, &user.password_hash)? {
            warn!(email = %email, "Rejected credential");
            return Err(Error::InvalidCredential);
        }

        assert_user_invariants(&user);
        Ok(user)
    }

    /// All accounts, newest first
    pub fn list_all(&self) -> Result<Vec<User>> {
        self.repo.list_accounts()
    }

    fn bootstrap_admin(&self, admin: &AdminBootstrap) -> Result<User> {
        let email = normalize_email(&admin.email);
        if let Some(existing) = self.repo.find_account(&email)? {
            return Ok(existing);
        }

        let user = User::administrator(email, admin.name.clone(), hash_secret(&admin.secret)?);
        self.repo.create_account(&user)?;
        info!(email = %user.email, "Administrator account materialized");
        Ok(user)
    }

    fn is_bootstrap_email(&self, email: &str) -> bool {
        self.admin
            .is_some_and(|admin| normalize_email(&admin.email) == email)
    }
}

impl<'a, R> AccountService<'a, R>
where
    R: AccountRepository + SnapshotRepository + ?Sized,
{
    /// Serialize the whole store as a human-readable document
    pub fn export_snapshot(&self) -> Result<String> {
        self.repo.export_snapshot()?.to_json_pretty()
    }

    /// Replace the store with a backup document.
    ///
    /// A document that does not parse or validate returns `MalformedSnapshot`
    /// and leaves the store untouched.
    #[instrument(skip(self, blob), fields(bytes = blob.len()))]
    pub fn restore_snapshot(&self, blob: &str) -> Result<()> {
        let snapshot = Snapshot::from_json(blob).inspect_err(|e| {
            warn!(error = %e, "Backup rejected");
        })?;
        self.repo.restore_snapshot(&snapshot)
    }
}
