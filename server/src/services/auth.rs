//! Password hashing and verification for storefront accounts.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};

#[instrument(name = "auth::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "argon2 password hashing failed");
      AppError::Internal(format!("Password hashing process failed: {}", e))
    })
}

/// `Ok(false)` means the password simply did not match; errors are reserved
/// for malformed stored hashes and internal argon2 failures.
#[instrument(name = "auth::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  if stored_hash.is_empty() || provided_password.is_empty() {
    return Err(AppError::Auth("Invalid credentials.".to_string()));
  }

  let parsed = PasswordHash::new(stored_hash)
    .map_err(|e| AppError::Internal(format!("Invalid stored password hash format: {}", e)))?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("password mismatch");
      Ok(false)
    }
    Err(e) => Err(AppError::Internal(format!("Password verification failed: {}", e))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_and_verify_round_trip() {
    let hash = hash_password("wool-and-tweed").unwrap();
    assert!(verify_password(&hash, "wool-and-tweed").unwrap());
    assert!(!verify_password(&hash, "polyester").unwrap());
  }

  #[test]
  fn empty_password_is_rejected() {
    assert!(hash_password("").is_err());
  }
}
