//! Authentication core.
//!
//! Flow Overview:
//! 1) `POST /token` runs [`CredentialVerifier::authenticate`] on a handle and
//!    secret, then [`TokenIssuer::issue`] signs `{sub, exp}` into a JWT.
//! 2) Protected routes hand the bearer token to [`IdentityResolver`], which
//!    checks signature and expiry, reads the subject, and loads the live user.
//!
//! Sessions are stateless: nothing about a token is stored server side, so a
//! token stays valid until `exp` even if the user changes afterwards.
//!
//! Every failure keeps a distinct internal cause ([`TokenError`]) for logs, but
//! the HTTP boundary collapses them into one generic response so callers cannot
//! tell an unknown user from a bad signature.

mod config;
mod credentials;
mod error;
pub mod password;
mod resolver;
mod state;
mod token;

pub use config::{AuthConfig, DEFAULT_ALGORITHM, DEFAULT_TOKEN_TTL_MINUTES};
pub use credentials::CredentialVerifier;
pub use error::{AuthError, TokenError};
pub use resolver::IdentityResolver;
pub use state::AuthState;
pub use token::{Claims, TokenIssuer, TokenVerifier, DEFAULT_TOKEN_TTL};
