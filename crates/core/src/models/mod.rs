//! Data models for HydraPro

mod ad;
mod support;
mod user;

pub use ad::*;
pub use support::*;
pub use user::*;
