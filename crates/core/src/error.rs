//! Error types for Hydra Core

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("External service failure: {0}")]
    ExternalService(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Credential hashing error: {0}")]
    Credential(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Message shown to the person at the keyboard.
    ///
    /// Internal details (SQL, hashing, IO) are collapsed into a generic line;
    /// those are logged where they occur.
    pub fn user_message(&self) -> String {
        match self {
            Error::DuplicateAccount(_) => "This email is already in use.".to_string(),
            Error::AccountNotFound(_) => "User not found.".to_string(),
            Error::InvalidCredential => "Incorrect password.".to_string(),
            Error::MalformedSnapshot(_) => "Backup file is invalid; nothing was restored.".to_string(),
            Error::ExternalService(_) => {
                "The assistant is unavailable right now. Try again shortly.".to_string()
            }
            Error::InvalidInput(msg) | Error::InvalidOperation(msg) => msg.clone(),
            Error::PermissionDenied(_) => "You are not allowed to do that.".to_string(),
            Error::Database(_)
            | Error::Credential(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Serialization(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_hides_internal_details() {
        let err = Error::Credential("argon2 exploded".into());
        assert!(!err.user_message().contains("argon2"));
    }

    #[test]
    fn user_message_passes_validation_text_through() {
        let err = Error::InvalidInput("Attach the payment proof.".into());
        assert_eq!(err.user_message(), "Attach the payment proof.");
    }
}
