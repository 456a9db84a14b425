//! # Password Hashing
//!
//! Argon2id hashes in PHC string format (`$argon2id$v=19$...`), stored in
//! `usuarios.password_hash`. The plaintext policy lives in
//! `cotiza_core::validation::validate_password`; this module only hashes.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::{DbError, DbResult};

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// A real Argon2 hash of a throwaway secret, computed once.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        let secret = format!("no-such-user-{}", uuid::Uuid::new_v4());
        hash_password(&secret).unwrap_or_default()
    })
}

/// Burns one verification for a login with no matching account, so an
/// unknown email costs as much as a wrong password. Always `false`.
pub fn verify_dummy(password: &str) -> bool {
    verify_password(password, dummy_hash());
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Hormigon2026").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Hormigon2026", &hash));
        assert!(!verify_password("hormigon2026", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("Hormigon2026").unwrap();
        let b = hash_password("Hormigon2026").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_dummy_verification_runs_argon2() {
        assert!(dummy_hash().starts_with("$argon2"));
        assert!(PasswordHash::new(dummy_hash()).is_ok());
        assert!(!verify_dummy("Hormigon2026"));
        assert!(!verify_dummy(""));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }
}
