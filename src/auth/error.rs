use thiserror::Error;

/// Why a bearer token was rejected. Only used for logging.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing bearer token")]
    MissingBearer,
    #[error("malformed token")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("unexpected signing algorithm")]
    InvalidAlgorithm,
    #[error("token expired")]
    Expired,
    #[error("missing subject claim")]
    MissingSubject,
    #[error("unknown subject: {0}")]
    UnknownSubject(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm => Self::InvalidAlgorithm,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] TokenError),
    #[error("inactive user")]
    Forbidden,
    #[error("storage failure")]
    Storage(#[source] anyhow::Error),
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}
