//! Support channel message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One turn in the support channel between a user and the administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportMessage {
    /// Strictly increasing in creation order
    pub id: i64,
    /// Email of the user owning the thread, also for admin replies
    pub sender_email: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub is_admin_reply: bool,
}

impl SupportMessage {
    pub fn format_timestamp(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }
}

/// All messages belonging to one user's thread, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportThread {
    pub email: String,
    pub messages: Vec<SupportMessage>,
}

impl SupportThread {
    pub fn has_admin_reply(&self) -> bool {
        self.messages.iter().any(|m| m.is_admin_reply)
    }
}
