//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{PaymentStatus, SupportMessage, User};

/// Validate that an account's entitlement fields agree with each other
pub fn assert_user_invariants(user: &User) {
    debug_assert!(
        !(user.payment_status == PaymentStatus::Approved && user.is_free()),
        "User {} is approved but on the free plan",
        user.email
    );

    debug_assert!(
        !user.email.trim().is_empty(),
        "User {} has empty email",
        user.id
    );
}

/// Validate that a message list is in strictly increasing id order
pub fn assert_support_order(messages: &[SupportMessage]) {
    debug_assert!(
        messages.windows(2).all(|w| w[0].id < w[1].id),
        "Support messages out of creation order"
    );
}
