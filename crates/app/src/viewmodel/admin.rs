//! Administrator panel

use std::sync::Arc;

use hydra_core::{
    AccountService, Ad, AdBoard, AppConfig, Error, NewAd, PaymentStatus, PaymentWorkflow, Result,
    SupportLog, SupportThread, User,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{Session, View};
use crate::assistant::{ask, AssistantReply, AssistantRequest};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminStats {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
}

/// Snapshot of the store plus the administrator's operations on it.
///
/// Every mutation refreshes the snapshot.
pub struct AdminPanel {
    app: Arc<AppState>,
    users: Vec<User>,
    config: AppConfig,
}

impl Session {
    /// Open the panel; only for an administrator on the admin view
    pub fn admin_panel(&self) -> Result<AdminPanel> {
        let allowed = {
            let state = self.lock();
            state.view == View::Admin && state.user.as_ref().is_some_and(|u| u.is_admin)
        };
        if !allowed {
            return Err(Error::PermissionDenied("administrator only".into()));
        }
        AdminPanel::load(self.app().clone())
    }
}

impl AdminPanel {
    fn load(app: Arc<AppState>) -> Result<Self> {
        let mut panel = Self {
            app,
            users: Vec::new(),
            config: AppConfig::with_interval(0),
        };
        panel.refresh()?;
        Ok(panel)
    }

    pub fn refresh(&mut self) -> Result<()> {
        let db = self.app.db();
        self.users = AccountService::new(&*db, None).list_all()?;
        self.config =
            AdBoard::new(&*db, self.app.config.ads.default_interval_seconds).config()?;
        Ok(())
    }

    /// All accounts, newest first
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stats(&self) -> AdminStats {
        let count = |status: PaymentStatus| self.users.iter().filter(|u| u.payment_status == status).count();
        AdminStats {
            total: self.users.len(),
            approved: count(PaymentStatus::Approved),
            pending: count(PaymentStatus::Pending),
        }
    }

    #[instrument(skip(self))]
    pub fn approve(&mut self, email: &str) -> Result<User> {
        let user = {
            let db = self.app.db();
            PaymentWorkflow::new(&*db).approve(email)?
        }
        .ok_or_else(|| Error::AccountNotFound(email.to_string()))?;
        self.refresh()?;
        Ok(user)
    }

    #[instrument(skip(self))]
    pub fn reject(&mut self, email: &str) -> Result<User> {
        let user = {
            let db = self.app.db();
            PaymentWorkflow::new(&*db).reject(email)?
        }
        .ok_or_else(|| Error::AccountNotFound(email.to_string()))?;
        self.refresh()?;
        Ok(user)
    }

    pub fn add_ad(&mut self, new_ad: NewAd) -> Result<Ad> {
        let ad = {
            let db = self.app.db();
            self.board(&db).add(new_ad)?
        };
        self.refresh()?;
        Ok(ad)
    }

    pub fn delete_ad(&mut self, id: Uuid) -> Result<bool> {
        let removed = {
            let db = self.app.db();
            self.board(&db).delete(id)?
        };
        self.refresh()?;
        Ok(removed)
    }

    pub fn set_ad_active(&mut self, id: Uuid, active: bool) -> Result<bool> {
        let found = {
            let db = self.app.db();
            self.board(&db).set_active(id, active)?
        };
        self.refresh()?;
        Ok(found)
    }

    pub fn set_ad_interval(&mut self, seconds: u32) -> Result<()> {
        {
            let db = self.app.db();
            self.board(&db).set_interval(seconds)?;
        }
        self.refresh()
    }

    fn board<'d>(&self, db: &'d hydra_core::Database) -> AdBoard<'d, hydra_core::Database> {
        AdBoard::new(db, self.app.config.ads.default_interval_seconds)
    }

    /// Support log grouped per user
    pub fn threads(&self) -> Vec<SupportThread> {
        hydra_core::support::group_threads(self.config.support_messages.clone())
    }

    /// Answer a user's thread
    #[instrument(skip(self, text))]
    pub fn reply(&mut self, email: &str, text: &str) -> Result<()> {
        let posted = {
            let db = self.app.db();
            SupportLog::new(&*db).post(email, text, true)?
        };
        if posted.is_some() {
            self.refresh()?;
        }
        Ok(())
    }

    /// Whole-store backup document
    pub fn export_backup(&self) -> Result<String> {
        let db = self.app.db();
        AccountService::new(&*db, None).export_snapshot()
    }

    /// Replace the store with a backup; a bad document changes nothing
    pub fn restore_backup(&mut self, blob: &str) -> Result<()> {
        {
            let db = self.app.db();
            AccountService::new(&*db, None).restore_snapshot(blob)?;
        }
        info!("Backup restored");
        self.refresh()
    }

    /// Ask the assistant about the user base. Credentials are not shared.
    pub async fn ask_insights(&self, question: &str) -> AssistantReply {
        let context: Vec<_> = self
            .users
            .iter()
            .map(|u| {
                json!({
                    "email": u.email,
                    "plan": u.plan,
                    "paymentStatus": u.payment_status,
                    "createdAt": u.created_at,
                    "usageSeconds": u.usage_seconds,
                    "referralSource": u.referral_source,
                    "referredBy": u.referred_by,
                    "couponCode": u.coupon_code,
                })
            })
            .collect();
        let prompt = format!(
            "Answer as the administrator. Context: {}. Question: {}",
            serde_json::Value::Array(context),
            question
        );
        ask(self.app.assistant.as_ref(), &AssistantRequest::new(prompt, None)).await
    }
}
