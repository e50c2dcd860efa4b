use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    error::{AuthError, TokenError},
    token::TokenVerifier,
};
use crate::storage::{User, UserFilter, UserStore};

/// Turns a bearer token into the live user record it names.
#[derive(Clone)]
pub struct IdentityResolver {
    verifier: TokenVerifier,
    users: Arc<dyn UserStore>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(verifier: TokenVerifier, users: Arc<dyn UserStore>) -> Self {
        Self { verifier, users }
    }

    /// Verify `token` and load its subject, ignoring the active flag.
    ///
    /// # Errors
    /// [`AuthError::Unauthorized`] for any token or lookup miss,
    /// [`AuthError::Storage`] if the store fails.
    pub async fn resolve(&self, token: &str) -> Result<User, AuthError> {
        self.resolve_at(token, Utc::now().timestamp()).await
    }

    /// Like [`Self::resolve`], but disabled users fail with
    /// [`AuthError::Forbidden`].
    ///
    /// # Errors
    /// Same as [`Self::resolve`], plus [`AuthError::Forbidden`].
    pub async fn resolve_active(&self, token: &str) -> Result<User, AuthError> {
        self.resolve_active_at(token, Utc::now().timestamp()).await
    }

    /// # Errors
    /// See [`Self::resolve`].
    #[instrument(skip_all)]
    pub async fn resolve_at(&self, token: &str, now: i64) -> Result<User, AuthError> {
        let subject = self.verifier.verify_at(token, now).inspect_err(|err| {
            debug!(cause = %err, "token rejected");
        })?;

        let user = self
            .users
            .find_one(UserFilter::Username(subject.clone()))
            .await
            .map_err(AuthError::Storage)?;

        user.ok_or_else(|| {
            debug!(%subject, "token subject not found");
            AuthError::Unauthorized(TokenError::UnknownSubject(subject))
        })
    }

    /// # Errors
    /// See [`Self::resolve_active`].
    pub async fn resolve_active_at(&self, token: &str, now: i64) -> Result<User, AuthError> {
        let user = self.resolve_at(token, now).await?;
        if user.disabled {
            debug!(username = %user.username, "inactive user");
            return Err(AuthError::Forbidden);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{password, AuthConfig, Claims, TokenIssuer};
    use crate::storage::{avatar_uri, MemoryStore, NewUser, UserPatch};
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::time::Duration;
    use uuid::Uuid;

    const T0: i64 = 1_700_000_000;

    struct Fixture {
        store: Arc<MemoryStore>,
        issuer: TokenIssuer,
        resolver: IdentityResolver,
    }

    async fn fixture() -> Result<Fixture> {
        let config = AuthConfig::new(SecretString::from("s3cret".to_string()), "HS256")?;
        let store = Arc::new(MemoryStore::new());
        store
            .insert(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: password::hash("pw123")?,
                avatar_uri: avatar_uri("alice"),
            })
            .await?;

        Ok(Fixture {
            issuer: TokenIssuer::new(&config),
            resolver: IdentityResolver::new(TokenVerifier::new(&config), store.clone()),
            store,
        })
    }

    fn alice_token(issuer: &TokenIssuer) -> Result<String> {
        Ok(issuer.issue_at(
            Claims::subject("alice"),
            Some(Duration::from_secs(15 * 60)),
            T0,
        )?)
    }

    #[tokio::test]
    async fn resolves_before_expiry() -> Result<()> {
        let fx = fixture().await?;
        let token = alice_token(&fx.issuer)?;
        let user = fx.resolver.resolve_at(&token, T0 + 10 * 60).await?;
        assert_eq!(user.username, "alice");
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() -> Result<()> {
        let fx = fixture().await?;
        let token = alice_token(&fx.issuer)?;
        let result = fx.resolver.resolve_at(&token, T0 + 16 * 60).await;
        assert!(matches!(
            result,
            Err(AuthError::Unauthorized(TokenError::Expired))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_subject_is_unauthorized() -> Result<()> {
        let fx = fixture().await?;
        let token = fx.issuer.issue_at(Claims::subject("ghost"), None, T0)?;
        let result = fx.resolver.resolve_at(&token, T0).await;
        assert!(matches!(
            result,
            Err(AuthError::Unauthorized(TokenError::UnknownSubject(_)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn missing_subject_is_unauthorized() -> Result<()> {
        let fx = fixture().await?;
        let token = fx.issuer.issue_at(Claims::default(), None, T0)?;
        let result = fx.resolver.resolve_at(&token, T0).await;
        assert!(matches!(
            result,
            Err(AuthError::Unauthorized(TokenError::MissingSubject))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn tampered_token_is_unauthorized() -> Result<()> {
        let fx = fixture().await?;
        let token = alice_token(&fx.issuer)?;
        let Some((head, signature)) = token.rsplit_once('.') else {
            bail!("token has no signature segment");
        };
        let replacement = if signature.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{head}.{replacement}{}", &signature[1..]);
        let result = fx.resolver.resolve_at(&tampered, T0).await;
        assert!(matches!(result, Err(AuthError::Unauthorized(_))));
        Ok(())
    }

    #[tokio::test]
    async fn disabled_user_only_fails_active_resolution() -> Result<()> {
        let fx = fixture().await?;
        let Some(alice) = fx
            .store
            .find_one(UserFilter::Username("alice".to_string()))
            .await?
        else {
            bail!("seed user missing");
        };
        fx.store
            .update_fields(
                alice.id,
                UserPatch {
                    disabled: Some(true),
                    ..UserPatch::default()
                },
            )
            .await?;

        let token = alice_token(&fx.issuer)?;
        assert!(fx.resolver.resolve_at(&token, T0).await.is_ok());
        assert!(matches!(
            fx.resolver.resolve_active_at(&token, T0).await,
            Err(AuthError::Forbidden)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn active_user_passes_active_resolution() -> Result<()> {
        let fx = fixture().await?;
        let token = alice_token(&fx.issuer)?;
        let user = fx.resolver.resolve_active_at(&token, T0 + 60).await?;
        assert!(!user.disabled);
        Ok(())
    }

    #[tokio::test]
    async fn wall_clock_variants_accept_fresh_tokens() -> Result<()> {
        let fx = fixture().await?;
        let token = fx.issuer.issue(Claims::subject("alice"), None)?;
        assert_eq!(fx.resolver.resolve(&token).await?.username, "alice");
        assert_eq!(fx.resolver.resolve_active(&token).await?.username, "alice");
        Ok(())
    }

    struct BrokenStore;

    #[async_trait]
    impl UserStore for BrokenStore {
        async fn find_one(&self, _: UserFilter) -> Result<Option<User>> {
            bail!("connection refused")
        }
        async fn list(&self) -> Result<Vec<User>> {
            bail!("connection refused")
        }
        async fn insert(&self, _: NewUser) -> Result<crate::storage::InsertOutcome<User>> {
            bail!("connection refused")
        }
        async fn update_fields(
            &self,
            _: Uuid,
            _: UserPatch,
        ) -> Result<crate::storage::UpdateOutcome> {
            bail!("connection refused")
        }
        async fn delete(&self, _: Uuid) -> Result<bool> {
            bail!("connection refused")
        }
        async fn ping(&self) -> Result<()> {
            bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn storage_failure_is_not_an_auth_failure() -> Result<()> {
        let fx = fixture().await?;
        let config = AuthConfig::new(SecretString::from("s3cret".to_string()), "HS256")?;
        let resolver = IdentityResolver::new(TokenVerifier::new(&config), Arc::new(BrokenStore));
        let token = alice_token(&fx.issuer)?;
        assert!(matches!(
            resolver.resolve_at(&token, T0).await,
            Err(AuthError::Storage(_))
        ));
        Ok(())
    }
}
