//! Argon2id password hashing.
//!
//! Hashes are PHC strings, so the salt and cost parameters travel with the
//! hash and `verify` needs nothing else.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, RngCore};

/// Hash a plaintext secret with a fresh random salt.
///
/// # Errors
/// Returns an error if the OS RNG or the hasher fails.
pub fn hash(secret: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .context("failed to generate password salt")?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!("invalid salt: {e}"))?;

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}

/// Check a plaintext secret against a stored PHC hash.
///
/// Unparseable hashes never verify.
#[must_use]
pub fn verify(secret: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    })
}
