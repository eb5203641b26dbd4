//! User model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Basic,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Premium => "premium",
        }
    }

    /// Plans that can be bought through a payment submission
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            other => Err(ParseEnumError::new("plan", other)),
        }
    }
}

/// Lifecycle stage of a manually verified payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseEnumError::new("payment status", other)),
        }
    }
}

/// Unknown enum label read from storage or user input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// How the user found the product, captured on the payment form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingAttribution {
    pub source: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub coupon: Option<String>,
}

/// An account with its entitlement state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Argon2 PHC string, never the raw secret
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_proof: Option<String>,
    #[serde(default)]
    pub payment_submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_payment_at: Option<DateTime<Utc>>,
    /// Accumulated free-tier seconds; ignored once the plan is paid
    #[serde(default)]
    pub usage_seconds: u32,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub referral_source: Option<String>,
    #[serde(default)]
    pub referred_by: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl User {
    /// A fresh free-tier account. The display name is the local part of the email.
    pub fn new(email: String, password_hash: String) -> Self {
        let name = email.split('@').next().unwrap_or_default().to_string();
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            created_at: Utc::now(),
            plan: Plan::Free,
            payment_status: PaymentStatus::None,
            payment_proof: None,
            payment_submitted_at: None,
            last_payment_at: None,
            usage_seconds: 0,
            is_admin: false,
            referral_source: None,
            referred_by: None,
            coupon_code: None,
        }
    }

    /// The bootstrap administrator record
    pub fn administrator(email: String, name: String, password_hash: String) -> Self {
        Self {
            name,
            plan: Plan::Premium,
            payment_status: PaymentStatus::Approved,
            is_admin: true,
            ..Self::new(email, password_hash)
        }
    }

    pub fn is_free(&self) -> bool {
        self.plan == Plan::Free
    }

    pub fn is_awaiting_approval(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }

    /// Whether free-tier usage has reached the given ceiling
    pub fn has_exhausted_free_usage(&self, ceiling_seconds: u32) -> bool {
        self.is_free() && self.usage_seconds >= ceiling_seconds
    }
}

/// Normalize an email for use as the account key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
