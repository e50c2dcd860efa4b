use super::{valid_email, UserOut};
use crate::{
    api::guard::detail,
    auth::password,
    storage::{avatar_uri, InsertOutcome, NewUser, UserFilter, UserStore},
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct UserIn {
    email: String,
    username: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/user/register",
    request_body = UserIn,
    responses(
        (status = 201, description = "Registration successful", body = UserOut),
        (status = 400, description = "Invalid email or username"),
        (status = 409, description = "User with that email or username already exists"),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn register(
    Extension(users): Extension<Arc<dyn UserStore>>,
    payload: Option<Json<UserIn>>,
) -> Response {
    let Some(Json(user)) = payload else {
        return detail(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let email = user.email.trim().to_lowercase();
    let username = user.username.trim().to_string();

    if !valid_email(&email) {
        return detail(StatusCode::BAD_REQUEST, "Invalid email");
    }

    if username.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "Invalid username");
    }

    match users.find_one(UserFilter::Email(email.clone())).await {
        Ok(Some(_)) => {
            return detail(StatusCode::CONFLICT, "user with that email already exists");
        }
        Ok(None) => (),
        Err(err) => {
            error!("Error checking email: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match users.find_one(UserFilter::Username(username.clone())).await {
        Ok(Some(_)) => {
            return detail(
                StatusCode::CONFLICT,
                "user with that username already exists",
            );
        }
        Ok(None) => (),
        Err(err) => {
            error!("Error checking username: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let password_hash = match password::hash(&user.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Error hashing password: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let new_user = NewUser {
        avatar_uri: avatar_uri(&username),
        username,
        email,
        password_hash,
    };

    match users.insert(new_user).await {
        Ok(InsertOutcome::Created(user)) => {
            info!(username = %user.username, "user registered");
            (StatusCode::CREATED, Json(UserOut::from(user))).into_response()
        }
        // Lost a race with a concurrent registration.
        Ok(InsertOutcome::Conflict) => detail(StatusCode::CONFLICT, "User already exists"),
        Err(err) => {
            error!("Error inserting user: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
