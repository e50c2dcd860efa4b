//! Process-wide signing configuration, built once at startup.

use anyhow::{anyhow, bail, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use secrecy::{ExposeSecret, SecretString};
use std::{str::FromStr, time::Duration};

pub const DEFAULT_ALGORITHM: &str = "HS256";
pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 15;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    secret_key: SecretString,
    algorithm: Algorithm,
    token_ttl: Duration,
}

impl AuthConfig {
    /// Validate the signing key and algorithm.
    ///
    /// # Errors
    /// Returns an error if the key is empty or the algorithm is not an HMAC
    /// variant; the caller is expected to abort startup.
    pub fn new(secret_key: SecretString, algorithm: &str) -> Result<Self> {
        if secret_key.expose_secret().trim().is_empty() {
            bail!("signing secret key must not be empty");
        }

        let algorithm = Algorithm::from_str(algorithm.trim())
            .map_err(|_| anyhow!("unknown signing algorithm: {algorithm}"))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            bail!("signing algorithm must be HS256, HS384 or HS512, got {algorithm:?}");
        }

        Ok(Self {
            secret_key,
            algorithm,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_MINUTES * 60),
        })
    }

    /// Override the token lifetime.
    ///
    /// # Errors
    /// Returns an error if `minutes` is zero, since every token would be
    /// expired on issue.
    pub fn with_token_ttl_minutes(mut self, minutes: u64) -> Result<Self> {
        if minutes == 0 {
            bail!("token lifetime must be at least one minute");
        }
        self.token_ttl = Duration::from_secs(minutes.saturating_mul(60));
        Ok(self)
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub(super) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret_key.expose_secret().as_bytes())
    }

    pub(super) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret_key.expose_secret().as_bytes())
    }
}
