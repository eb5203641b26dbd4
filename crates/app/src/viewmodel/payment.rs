//! Plan selection and payment submission

use hydra_core::{Error, MarketingAttribution, PaymentWorkflow, Plan, Result};
use tracing::instrument;

use super::{Session, View};

/// A plan card as shown on the plan selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOffer {
    pub plan: Plan,
    pub price: String,
}

/// What the payment form collects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentForm {
    /// Proof of payment, usually an image `data:` URI
    pub proof: String,
    /// Where the user heard about the product
    pub source: String,
    pub creator: Option<String>,
    pub coupon: Option<String>,
}

impl Session {
    /// Paid plans with their configured prices
    pub fn plan_offers(&self) -> Vec<PlanOffer> {
        let payment = &self.app().config.payment;
        vec![
            PlanOffer {
                plan: Plan::Basic,
                price: payment.basic_price.clone(),
            },
            PlanOffer {
                plan: Plan::Premium,
                price: payment.premium_price.clone(),
            },
        ]
    }

    pub fn pix_key(&self) -> String {
        self.app().config.payment.pix_key.clone()
    }

    /// Show the plan selector (the chat view's upgrade action)
    pub fn open_plans(&self) -> Result<()> {
        let view = self.view();
        if !matches!(view, View::Chat | View::Plans | View::Payment) {
            return Err(Error::InvalidOperation("Plans are not available here.".into()));
        }
        self.enter(View::Plans);
        Ok(())
    }

    /// Leave the plan selector for the login screen
    pub fn cancel_plans(&self) {
        self.logout();
    }

    /// Pick a plan; nothing is stored until the form is submitted
    pub fn select_plan(&self, plan: Plan) -> Result<()> {
        if !plan.is_paid() {
            return Err(Error::InvalidInput("Choose a paid plan.".into()));
        }
        {
            let mut state = self.lock();
            if state.view != View::Plans {
                return Err(Error::InvalidOperation("Open the plan list first.".into()));
            }
            state.selected_plan = Some(plan);
        }
        self.enter(View::Payment);
        Ok(())
    }

    pub fn selected_plan(&self) -> Option<Plan> {
        self.lock().selected_plan
    }

    /// Submit proof for the selected plan and wait for approval
    #[instrument(skip(self, form))]
    pub fn submit_payment(&self, form: &PaymentForm) -> Result<View> {
        if form.source.trim().is_empty() || form.proof.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Tell us where you found us and attach the payment proof.".into(),
            ));
        }

        let (email, plan) = {
            let state = self.lock();
            if state.view != View::Payment {
                return Err(Error::InvalidOperation("No payment in progress.".into()));
            }
            let email = state
                .user
                .as_ref()
                .map(|u| u.email.clone())
                .ok_or_else(|| Error::InvalidOperation("Sign in first.".into()))?;
            let plan = state
                .selected_plan
                .ok_or_else(|| Error::InvalidOperation("Choose a plan first.".into()))?;
            (email, plan)
        };

        let attribution = MarketingAttribution {
            source: form.source.trim().to_string(),
            creator: form.creator.clone(),
            coupon: form.coupon.clone(),
        };
        let updated = {
            let mut state = self.lock();
            let db = self.app().db();
            if let Some(meter) = state.meter.as_mut() {
                meter.flush(&*db)?;
            }
            PaymentWorkflow::new(&*db).submit_payment(&email, plan, &form.proof, Some(&attribution))?
        };
        let user = updated.ok_or(Error::AccountNotFound(email))?;

        {
            let mut state = self.lock();
            state.user = Some(user);
            state.meter = None;
            state.rotation = None;
            state.current_ad = None;
        }
        self.enter(View::Blocked);
        Ok(View::Blocked)
    }
}
