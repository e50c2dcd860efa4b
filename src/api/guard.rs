//! Bearer-token guard for the `/user/*` routes.
//!
//! Flow Overview:
//! 1) Read `Authorization: Bearer <token>`.
//! 2) Resolve it to an active user with [`IdentityResolver::resolve_active`].
//! 3) Insert the [`Principal`] into request extensions, or answer with the
//!    mapped [`AuthError`] before the handler runs.
//!
//! [`IdentityResolver::resolve_active`]: crate::auth::IdentityResolver::resolve_active

use crate::{
    auth::{AuthError, AuthState, TokenError},
    storage::User,
};
use axum::{
    extract::Request,
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The resolved user for the current request.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user: User,
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// `{"detail": message}` with the given status.
pub(crate) fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn with_bearer_challenge(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidCredentials => with_bearer_challenge(detail(
                StatusCode::UNAUTHORIZED,
                "Incorrect username or password",
            )),
            Self::Unauthorized(cause) => {
                debug!(%cause, "rejected bearer token");
                with_bearer_challenge(detail(
                    StatusCode::UNAUTHORIZED,
                    "Could not validate credentials",
                ))
            }
            Self::Forbidden => detail(StatusCode::BAD_REQUEST, "Inactive user"),
            Self::Storage(err) => {
                error!("Storage failure during authentication: {err:#}");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            Self::Signing(err) => {
                error!("Failed to sign token: {err}");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

/// Middleware that only lets requests from active users through.
pub async fn require_active_user(mut request: Request, next: Next) -> Response {
    let Some(auth) = request.extensions().get::<Arc<AuthState>>().cloned() else {
        warn!("AuthState extension missing");
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    };

    let Some(token) = extract_bearer_token(request.headers()) else {
        return AuthError::Unauthorized(TokenError::MissingBearer).into_response();
    };

    match auth.resolver().resolve_active(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(Principal { user });
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(
            extract_bearer_token(&headers_with("Bearer abc.def.ghi")),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(
            extract_bearer_token(&headers_with("bearer  abc ")),
            Some("abc".to_string())
        );
    }

    #[test]
    fn rejects_other_schemes_and_blanks() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
        assert_eq!(extract_bearer_token(&headers_with("Basic dXNlcjpwdw==")), None);
        assert_eq!(extract_bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer_token(&headers_with("abc.def.ghi")), None);
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED, true),
            (
                AuthError::Unauthorized(TokenError::Expired),
                StatusCode::UNAUTHORIZED,
                true,
            ),
            (AuthError::Forbidden, StatusCode::BAD_REQUEST, false),
            (
                AuthError::Storage(anyhow::anyhow!("down")),
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
            ),
        ];

        for (err, status, challenge) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), status);
            assert_eq!(
                response.headers().get(WWW_AUTHENTICATE).is_some(),
                challenge
            );
        }
    }

    #[test]
    fn token_causes_share_one_response() {
        let expired = AuthError::Unauthorized(TokenError::Expired).into_response();
        let unknown =
            AuthError::Unauthorized(TokenError::UnknownSubject("ghost".to_string())).into_response();
        assert_eq!(expired.status(), unknown.status());
        assert_eq!(
            expired.headers().get(WWW_AUTHENTICATE),
            unknown.headers().get(WWW_AUTHENTICATE)
        );
    }
}
