use std::sync::Arc;

use super::{
    config::AuthConfig, credentials::CredentialVerifier, resolver::IdentityResolver,
    token::TokenIssuer, token::TokenVerifier,
};
use crate::storage::UserStore;

/// Everything the HTTP layer needs to authenticate requests, shared as
/// `Arc<AuthState>`.
pub struct AuthState {
    config: AuthConfig,
    issuer: TokenIssuer,
    resolver: IdentityResolver,
    credentials: CredentialVerifier,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, users: Arc<dyn UserStore>) -> Self {
        Self {
            issuer: TokenIssuer::new(&config),
            resolver: IdentityResolver::new(TokenVerifier::new(&config), users.clone()),
            credentials: CredentialVerifier::new(users),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialVerifier {
        &self.credentials
    }
}
