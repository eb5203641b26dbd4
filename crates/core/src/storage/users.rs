//! Account storage operations

use rusqlite::{params, Connection, ErrorCode, Row};
use tracing::instrument;

use super::parse::{parse_datetime, parse_datetime_opt, parse_label, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::User;

const USER_COLUMNS: &str = "email, id, name, password_hash, created_at, plan, payment_status, \
     payment_proof, payment_submitted_at, last_payment_at, usage_seconds, is_admin, \
     referral_source, referred_by, coupon_code";

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new account
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn create(&self, user: &User) -> Result<()> {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO users ({USER_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                user.email,
                user.id.to_string(),
                user.name,
                user.password_hash,
                user.created_at.to_rfc3339(),
                user.plan.as_str(),
                user.payment_status.as_str(),
                user.payment_proof,
                user.payment_submitted_at.map(|t| t.to_rfc3339()),
                user.last_payment_at.map(|t| t.to_rfc3339()),
                user.usage_seconds,
                user.is_admin as i32,
                user.referral_source,
                user.referred_by,
                user.coupon_code,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(Error::DuplicateAccount(user.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find account by email
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?;

        let user = stmt.query_row(params![email], map_user).optional()?;
        Ok(user)
    }

    /// Overwrite an existing account's mutable fields
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn update(&self, user: &User) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET
                name = ?2,
                password_hash = ?3,
                plan = ?4,
                payment_status = ?5,
                payment_proof = ?6,
                payment_submitted_at = ?7,
                last_payment_at = ?8,
                usage_seconds = ?9,
                is_admin = ?10,
                referral_source = ?11,
                referred_by = ?12,
                coupon_code = ?13
             WHERE email = ?1",
            params![
                user.email,
                user.name,
                user.password_hash,
                user.plan.as_str(),
                user.payment_status.as_str(),
                user.payment_proof,
                user.payment_submitted_at.map(|t| t.to_rfc3339()),
                user.last_payment_at.map(|t| t.to_rfc3339()),
                user.usage_seconds,
                user.is_admin as i32,
                user.referral_source,
                user.referred_by,
                user.coupon_code,
            ],
        )?;

        if changed == 0 {
            return Err(Error::AccountNotFound(user.email.clone()));
        }
        Ok(())
    }

    /// All accounts, newest first
    pub fn list(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, rowid DESC"
        ))?;

        let users = stmt
            .query_map([], map_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Add to the usage counter, never exceeding `ceiling`
    pub fn add_usage(&self, email: &str, seconds: u32, ceiling: u32) -> Result<Option<u32>> {
        let changed = self.conn.execute(
            "UPDATE users SET usage_seconds = MIN(usage_seconds + ?2, MAX(usage_seconds, ?3))
             WHERE email = ?1",
            params![email, seconds, ceiling],
        )?;

        if changed == 0 {
            return Ok(None);
        }

        let total: u32 = self.conn.query_row(
            "SELECT usage_seconds FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(Some(total))
    }

    /// Remove every account (snapshot restore only)
    pub(crate) fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM users", [])?;
        Ok(())
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        email: row.get(0)?,
        id: parse_uuid(&row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?)?,
        plan: parse_label(&row.get::<_, String>(5)?)?,
        payment_status: parse_label(&row.get::<_, String>(6)?)?,
        payment_proof: row.get(7)?,
        payment_submitted_at: parse_datetime_opt(row.get(8)?)?,
        last_payment_at: parse_datetime_opt(row.get(9)?)?,
        usage_seconds: row.get(10)?,
        is_admin: row.get::<_, i32>(11)? != 0,
        referral_source: row.get(12)?,
        referred_by: row.get(13)?,
        coupon_code: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentStatus, Plan};
    use crate::storage::Database;
    use chrono::{Duration, Utc};

    fn user(email: &str) -> User {
        User::new(email.to_string(), "hash".to_string())
    }

    #[test]
    fn create_and_find() {
        let db = Database::open_in_memory().unwrap();
        db.users().create(&user("ana@example.com")).unwrap();

        let found = db.users().find_by_email("ana@example.com").unwrap().unwrap();
        assert_eq!(found.name, "ana");
        assert_eq!(found.plan, Plan::Free);
        assert!(db.users().find_by_email("bob@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.users().create(&user("ana@example.com")).unwrap();

        let err = db.users().create(&user("ana@example.com")).unwrap_err();
        assert!(matches!(err, Error::DuplicateAccount(e) if e == "ana@example.com"));
    }

    #[test]
    fn update_round_trips_entitlement_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut u = user("ana@example.com");
        db.users().create(&u).unwrap();

        u.plan = Plan::Premium;
        u.payment_status = PaymentStatus::Pending;
        u.payment_proof = Some("proof-1".into());
        u.payment_submitted_at = Some(Utc::now());
        u.referral_source = Some("TikTok".into());
        db.users().update(&u).unwrap();

        let found = db.users().find_by_email("ana@example.com").unwrap().unwrap();
        assert_eq!(found.plan, Plan::Premium);
        assert_eq!(found.payment_status, PaymentStatus::Pending);
        assert_eq!(found.payment_proof.as_deref(), Some("proof-1"));
        assert_eq!(found.referral_source.as_deref(), Some("TikTok"));
    }

    #[test]
    fn update_missing_account_fails() {
        let db = Database::open_in_memory().unwrap();
        let err = db.users().update(&user("ghost@example.com")).unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
    }

    #[test]
    fn list_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let mut older = user("old@example.com");
        older.created_at = Utc::now() - Duration::days(2);
        let newer = user("new@example.com");
        db.users().create(&older).unwrap();
        db.users().create(&newer).unwrap();

        let emails: Vec<_> = db.users().list().unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["new@example.com", "old@example.com"]);
    }

    #[test]
    fn add_usage_clamps_at_ceiling() {
        let db = Database::open_in_memory().unwrap();
        db.users().create(&user("ana@example.com")).unwrap();

        assert_eq!(db.users().add_usage("ana@example.com", 590, 600).unwrap(), Some(590));
        assert_eq!(db.users().add_usage("ana@example.com", 20, 600).unwrap(), Some(600));
        assert_eq!(db.users().add_usage("ghost@example.com", 10, 600).unwrap(), None);
    }
}
