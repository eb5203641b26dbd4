//! Manual payment approval workflow
//!
//! `none -> pending` on submission, `pending -> approved | rejected` on the
//! administrator's decision, and any state back to `pending` on re-submission.
//! Each transition is written immediately.

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::invariants::assert_user_invariants;
use crate::models::{normalize_email, MarketingAttribution, PaymentStatus, Plan, User};
use crate::storage::AccountRepository;

pub struct PaymentWorkflow<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R> PaymentWorkflow<'a, R>
where
    R: AccountRepository + ?Sized,
{
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Record a payment proof for review.
    ///
    /// Returns `Ok(None)` when the account does not exist; callers treat that
    /// as "could not submit".
    #[instrument(skip(self, proof, attribution))]
    pub fn submit_payment(
        &self,
        email: &str,
        plan: Plan,
        proof: &str,
        attribution: Option<&MarketingAttribution>,
    ) -> Result<Option<User>> {
        if !plan.is_paid() {
            return Err(Error::InvalidInput("Choose a paid plan.".into()));
        }
        if proof.trim().is_empty() {
            return Err(Error::InvalidInput("Attach the payment proof.".into()));
        }

        let Some(mut user) = self.repo.find_account(&normalize_email(email))? else {
            warn!(email, "Payment submitted for unknown account");
            return Ok(None);
        };

        user.payment_status = PaymentStatus::Pending;
        user.plan = plan;
        user.payment_proof = Some(proof.to_string());
        user.payment_submitted_at = Some(Utc::now());
        if let Some(attribution) = attribution {
            user.referral_source = Some(attribution.source.clone());
            user.referred_by = attribution.creator.clone().filter(|c| !c.trim().is_empty());
            user.coupon_code = attribution.coupon.clone().filter(|c| !c.trim().is_empty());
        }

        self.repo.save_account(&user)?;
        info!(email = %user.email, plan = %plan, "Payment submitted");
        Ok(Some(user))
    }

    /// Approve the account's payment.
    ///
    /// Approval does not require a pending submission; that is the
    /// administrator override. A free-plan account cannot be approved.
    #[instrument(skip(self))]
    pub fn approve(&self, email: &str) -> Result<Option<User>> {
        let Some(mut user) = self.repo.find_account(&normalize_email(email))? else {
            return Ok(None);
        };

        if user.is_free() {
            return Err(Error::InvalidOperation(
                "Free-plan accounts have nothing to approve.".into(),
            ));
        }
        if user.payment_status != PaymentStatus::Pending {
            warn!(
                email = %user.email,
                status = %user.payment_status,
                "Approving account without a pending payment"
            );
        }

        user.payment_status = PaymentStatus::Approved;
        user.last_payment_at = Some(Utc::now());
        assert_user_invariants(&user);

        self.repo.save_account(&user)?;
        info!(email = %user.email, plan = %user.plan, "Payment approved");
        Ok(Some(user))
    }

    /// Reject the payment and drop the account back to the free plan
    #[instrument(skip(self))]
    pub fn reject(&self, email: &str) -> Result<Option<User>> {
        let Some(mut user) = self.repo.find_account(&normalize_email(email))? else {
            return Ok(None);
        };

        user.payment_status = PaymentStatus::Rejected;
        user.plan = Plan::Free;
        user.payment_proof = None;
        user.payment_submitted_at = None;

        self.repo.save_account(&user)?;
        info!(email = %user.email, "Payment rejected");
        Ok(Some(user))
    }
}
