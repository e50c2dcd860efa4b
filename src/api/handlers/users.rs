//! Endpoints for the authenticated user.
//!
//! Every route here sits behind [`require_active_user`], so the
//! [`Principal`] extension is always present.
//!
//! [`require_active_user`]: crate::api::guard::require_active_user

use super::{valid_email, Message, UserOut};
use crate::{
    api::guard::{detail, Principal},
    storage::{UpdateOutcome, UserPatch, UserStore},
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

/// Profile fields a user may change. The username is fixed at registration.
#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[utoipa::path(
    get,
    path = "/user/all",
    responses(
        (status = 200, description = "All registered users", body = [UserOut]),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn all_users(
    Extension(_principal): Extension<Principal>,
    Extension(users): Extension<Arc<dyn UserStore>>,
) -> Response {
    match users.list().await {
        Ok(list) => {
            let list: Vec<UserOut> = list.into_iter().map(UserOut::from).collect();
            (StatusCode::OK, Json(list)).into_response()
        }
        Err(err) => {
            error!("Failed to list users: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/user/me",
    responses(
        (status = 200, description = "Current user", body = UserOut),
        (status = 400, description = "Inactive user"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn me(Extension(principal): Extension<Principal>) -> Json<UserOut> {
    Json(UserOut::from(principal.user))
}

#[utoipa::path(
    patch,
    path = "/user/update",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated user", body = UserOut),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 409, description = "Email already in use"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update(
    Extension(principal): Extension<Principal>,
    Extension(users): Extension<Arc<dyn UserStore>>,
    payload: Option<Json<UserUpdate>>,
) -> Response {
    let Some(Json(update)) = payload else {
        return detail(StatusCode::BAD_REQUEST, "Invalid update payload");
    };

    let email = update.email.map(|email| email.trim().to_lowercase());
    if email.as_deref().is_some_and(|email| !valid_email(email)) {
        return detail(StatusCode::BAD_REQUEST, "Invalid email");
    }

    let patch = UserPatch {
        first_name: update.first_name,
        last_name: update.last_name,
        email,
        disabled: None,
    };

    if patch.is_empty() {
        return Json(UserOut::from(principal.user)).into_response();
    }

    match users.update_fields(principal.user.id, patch).await {
        Ok(UpdateOutcome::Updated(user)) => {
            info!(username = %user.username, "user updated");
            Json(UserOut::from(user)).into_response()
        }
        Ok(UpdateOutcome::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Ok(UpdateOutcome::Conflict) => {
            detail(StatusCode::CONFLICT, "user with that email already exists")
        }
        Err(err) => {
            error!("Failed to update user: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/user/me/remove",
    responses(
        (status = 200, description = "User deleted", body = Message),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn remove_me(
    Extension(principal): Extension<Principal>,
    Extension(users): Extension<Arc<dyn UserStore>>,
) -> Response {
    match users.delete(principal.user.id).await {
        Ok(true) => {
            info!(username = %principal.user.username, "user deleted");
            Json(Message {
                message: "user deleted".to_string(),
            })
            .into_response()
        }
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete user: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
