//! Credential hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{Error, Result};

/// Hash a secret into a salted PHC string
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Credential(format!("hash failed: {e}")))
}

/// Check a claimed secret against a stored PHC string.
///
/// `Ok(false)` means a mismatch; an unparseable stored hash is an error.
pub fn verify_secret(secret: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| Error::Credential(format!("invalid stored hash: {e}")))?;

    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Credential(format!("verify failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_secret("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_secret("hunter2", &hash).unwrap());
        assert!(!verify_secret("hunter3", &hash).unwrap());
    }

    #[test]
    fn same_secret_gets_distinct_salts() {
        assert_ne!(hash_secret("abc").unwrap(), hash_secret("abc").unwrap());
    }

    #[test]
    fn plaintext_stored_value_is_an_error() {
        assert!(matches!(
            verify_secret("secret", "secret"),
            Err(Error::Credential(_))
        ));
    }
}
