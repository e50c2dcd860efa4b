//! Session endpoint: trade a username and password for a bearer token.

use crate::auth::{AuthError, AuthState, Claims};
use axum::{
    extract::{Extension, Form},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[utoipa::path(
    post,
    path = "/token",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Bearer token issued", body = Token),
        (status = 401, description = "Incorrect username or password"),
    ),
    tag = "token"
)]
#[instrument(skip_all, fields(username = %form.username))]
pub async fn token(
    Extension(auth): Extension<Arc<AuthState>>,
    Form(form): Form<TokenRequest>,
) -> Response {
    let user = match auth
        .credentials()
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    let ttl = auth.config().token_ttl();
    match auth.issuer().issue(Claims::subject(user.username), Some(ttl)) {
        Ok(access_token) => {
            info!("issued bearer token");
            Json(Token {
                access_token,
                token_type: "bearer".to_string(),
            })
            .into_response()
        }
        Err(err) => AuthError::Signing(err).into_response(),
    }
}
