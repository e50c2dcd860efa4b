//! Signed bearer tokens (JWT, HMAC).

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::{config::AuthConfig, error::TokenError};

/// Lifetime used when the caller does not pass one.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

const RESERVED_CLAIMS: [&str; 2] = ["sub", "exp"];

/// Claim set carried by a token. `exp` is always set by the issuer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    #[must_use]
    pub fn subject(sub: impl Into<String>) -> Self {
        Self {
            sub: Some(sub.into()),
            ..Self::default()
        }
    }

    /// Add a custom claim. `sub` and `exp` are owned by dedicated fields and
    /// are ignored here.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !RESERVED_CLAIMS.contains(&key.as_str()) {
            self.extra.insert(key, value.into());
        }
        self
    }
}

fn now_unix_seconds() -> i64 {
    Utc::now().timestamp()
}

fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    algorithm: Algorithm,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: config.encoding_key(),
            algorithm: config.algorithm(),
        }
    }

    /// Sign `claims` with `exp = now + ttl` (default 15 minutes).
    ///
    /// # Errors
    /// Only fails if the claims cannot be serialized.
    pub fn issue(
        &self,
        claims: Claims,
        ttl: Option<Duration>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(claims, ttl, now_unix_seconds())
    }

    /// Same as [`Self::issue`] with an explicit clock.
    ///
    /// # Errors
    /// Only fails if the claims cannot be serialized.
    pub fn issue_at(
        &self,
        mut claims: Claims,
        ttl: Option<Duration>,
        now: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let ttl = ttl.unwrap_or(DEFAULT_TOKEN_TTL);
        claims
            .extra
            .retain(|key, _| !RESERVED_CLAIMS.contains(&key.as_str()));
        claims.exp = now.saturating_add(ttl_seconds(ttl));
        encode(&Header::new(self.algorithm), &claims, &self.key)
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm());
        // Expiry is checked explicitly against the caller's clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            key: config.decoding_key(),
            validation,
        }
    }

    /// Check signature and expiry, then return the subject claim.
    ///
    /// # Errors
    /// Returns the specific [`TokenError`] cause.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        let claims = data.claims;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        claims
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(TokenError::MissingSubject)
    }

    /// [`Self::verify_at`] using the current time.
    ///
    /// # Errors
    /// Returns the specific [`TokenError`] cause.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, now_unix_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::SecretString;

    const T0: i64 = 1_700_000_000;

    fn config(secret: &str, algorithm: &str) -> Result<AuthConfig> {
        AuthConfig::new(SecretString::from(secret.to_string()), algorithm)
    }

    fn pair(secret: &str) -> Result<(TokenIssuer, TokenVerifier)> {
        let config = config(secret, "HS256")?;
        Ok((TokenIssuer::new(&config), TokenVerifier::new(&config)))
    }

    #[test]
    fn issue_then_verify_returns_subject() -> Result<()> {
        let (issuer, verifier) = pair("s3cret")?;
        let token = issuer.issue_at(Claims::subject("alice"), None, T0)?;
        assert_eq!(verifier.verify_at(&token, T0 + 60)?, "alice");
        Ok(())
    }

    #[test]
    fn token_is_three_url_safe_segments() -> Result<()> {
        let (issuer, _) = pair("s3cret")?;
        let token = issuer.issue_at(Claims::subject("alice"), None, T0)?;
        assert_eq!(token.split('.').count(), 3);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
        Ok(())
    }

    #[test]
    fn default_ttl_is_fifteen_minutes() -> Result<()> {
        let (issuer, verifier) = pair("s3cret")?;
        let token = issuer.issue_at(Claims::subject("alice"), None, T0)?;
        assert!(verifier.verify_at(&token, T0 + 15 * 60 - 1).is_ok());
        assert!(matches!(
            verifier.verify_at(&token, T0 + 15 * 60),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn explicit_ttl_controls_expiry() -> Result<()> {
        let (issuer, verifier) = pair("s3cret")?;
        let ttl = Duration::from_secs(15 * 60);
        let token = issuer.issue_at(Claims::subject("alice"), Some(ttl), T0)?;
        assert!(verifier.verify_at(&token, T0 + 10 * 60).is_ok());
        assert!(matches!(
            verifier.verify_at(&token, T0 + 16 * 60),
            Err(TokenError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn issuing_is_deterministic_for_same_inputs() -> Result<()> {
        let (issuer, _) = pair("s3cret")?;
        let first = issuer.issue_at(Claims::subject("alice"), None, T0)?;
        let second = issuer.issue_at(Claims::subject("alice"), None, T0)?;
        let later = issuer.issue_at(Claims::subject("alice"), None, T0 + 1)?;
        assert_eq!(first, second);
        assert_ne!(first, later);
        Ok(())
    }

    #[test]
    fn issuer_overrides_caller_expiry() -> Result<()> {
        let (issuer, verifier) = pair("s3cret")?;
        let claims = Claims {
            exp: T0 - 10_000,
            ..Claims::subject("alice")
        };
        let token = issuer.issue_at(claims, None, T0)?;
        assert!(verifier.verify_at(&token, T0 + 1).is_ok());
        Ok(())
    }

    #[test]
    fn extra_claims_survive_but_reserved_names_are_ignored() -> Result<()> {
        let config = config("s3cret", "HS256")?;
        let issuer = TokenIssuer::new(&config);
        let claims = Claims::subject("alice")
            .with_claim("scope", "things")
            .with_claim("sub", "mallory")
            .with_claim("exp", 1);
        let token = issuer.issue_at(claims, None, T0)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let decoded = decode::<Claims>(&token, &config.decoding_key(), &validation)?;
        assert_eq!(decoded.claims.sub.as_deref(), Some("alice"));
        assert_eq!(decoded.claims.exp, T0 + 15 * 60);
        assert_eq!(
            decoded.claims.extra.get("scope"),
            Some(&Value::from("things"))
        );
        assert!(!decoded.claims.extra.contains_key("sub"));
        Ok(())
    }

    #[test]
    fn reserved_names_inserted_directly_are_dropped() -> Result<()> {
        let config = config("s3cret", "HS256")?;
        let issuer = TokenIssuer::new(&config);
        let mut claims = Claims::subject("alice");
        claims.extra.insert("sub".to_string(), Value::from("mallory"));
        claims.extra.insert("exp".to_string(), Value::from(1));
        let token = issuer.issue_at(claims, None, T0)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let decoded = decode::<Value>(&token, &config.decoding_key(), &validation)?;
        assert_eq!(decoded.claims["sub"], Value::from("alice"));
        assert_eq!(decoded.claims["exp"], Value::from(T0 + 15 * 60));

        let (_, verifier) = pair("s3cret")?;
        assert_eq!(verifier.verify_at(&token, T0 + 60)?, "alice");
        Ok(())
    }

    #[test]
    fn missing_subject_is_rejected() -> Result<()> {
        let (issuer, verifier) = pair("s3cret")?;
        let token = issuer.issue_at(Claims::default().with_claim("scope", "x"), None, T0)?;
        assert!(matches!(
            verifier.verify_at(&token, T0),
            Err(TokenError::MissingSubject)
        ));
        Ok(())
    }

    #[test]
    fn wrong_key_is_rejected() -> Result<()> {
        let (issuer, _) = pair("s3cret")?;
        let (_, other) = pair("another-secret")?;
        let token = issuer.issue_at(Claims::subject("alice"), None, T0)?;
        assert!(matches!(
            other.verify_at(&token, T0),
            Err(TokenError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn other_algorithm_is_rejected() -> Result<()> {
        let hs512 = config("s3cret", "HS512")?;
        let token = TokenIssuer::new(&hs512).issue_at(Claims::subject("alice"), None, T0)?;
        let (_, verifier) = pair("s3cret")?;
        assert!(matches!(
            verifier.verify_at(&token, T0),
            Err(TokenError::InvalidAlgorithm)
        ));
        Ok(())
    }

    #[test]
    fn garbage_is_malformed() -> Result<()> {
        let (_, verifier) = pair("s3cret")?;
        for token in ["", "abc", "a.b.c", "a.b", "...."] {
            assert!(
                verifier.verify_at(token, T0).is_err(),
                "accepted garbage token {token:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn tampering_with_any_character_is_rejected() -> Result<()> {
        let (issuer, verifier) = pair("s3cret")?;
        let token = issuer.issue_at(Claims::subject("alice"), None, T0)?;

        for (index, original) in token.char_indices() {
            if original == '.' {
                continue;
            }
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(index..=index, &replacement.to_string());
            assert!(
                verifier.verify_at(&tampered, T0).is_err(),
                "tampered token accepted at index {index}"
            );
        }
        Ok(())
    }
}
