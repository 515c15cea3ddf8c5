//! Borrower secret hashing and verification

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    circulation::{CredentialCheck, CredentialVerifier},
    error::{AppError, AppResult},
    models::Borrower,
};

/// Checks a borrower secret against the stored Argon2 hash
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn verify(&self, borrower: &Borrower, secret: &str) -> CredentialCheck {
        let parsed_hash = match PasswordHash::new(&borrower.credential_hash) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(borrower_id = borrower.id, error = %e, "Stored credential hash is unreadable");
                return CredentialCheck::Mismatch;
            }
        };

        if Argon2::default().verify_password(secret.as_bytes(), &parsed_hash).is_ok() {
            CredentialCheck::Match
        } else {
            CredentialCheck::Mismatch
        }
    }
}

/// Hash a borrower secret using Argon2
pub fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash secret: {}", e)))?;
    Ok(hash.to_string())
}
