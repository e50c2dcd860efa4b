use std::sync::Arc;
use tracing::{debug, instrument};

use super::{error::AuthError, password};
use crate::storage::{User, UserFilter, UserStore};

/// Checks a handle and plaintext secret against the stored hash.
#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Look up `handle` and verify `secret`.
    ///
    /// Unknown handles and wrong secrets both yield
    /// [`AuthError::InvalidCredentials`].
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] on mismatch, [`AuthError::Storage`]
    /// if the lookup itself fails.
    #[instrument(skip(self, secret))]
    pub async fn authenticate(&self, handle: &str, secret: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .find_one(UserFilter::Username(handle.to_string()))
            .await
            .map_err(AuthError::Storage)?;

        let Some(user) = user else {
            debug!("unknown handle");
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify(secret, &user.password_hash) {
            debug!("password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}
