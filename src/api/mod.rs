//! HTTP surface: router, middleware stack and server loop.

use crate::{
    auth::AuthState,
    storage::{ThingStore, UserStore},
};
use anyhow::{bail, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{delete, get, patch, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod guard;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

use handlers::{health, root, things, token, user_register, users};

/// Build the application router with every route and layer attached.
///
/// # Errors
/// Returns an error if an allowed origin is not a valid header value.
pub fn router(
    users: Arc<dyn UserStore>,
    things: Arc<dyn ThingStore>,
    auth_state: Arc<AuthState>,
    allowed_origins: &[String],
) -> Result<Router> {
    let cors = cors_layer(allowed_origins)?;

    let protected = Router::new()
        .route("/user/add_thing", post(things::add_thing))
        .route("/user/all", get(users::all_users))
        .route("/user/me", get(users::me))
        .route("/user/my_things", get(things::my_things))
        .route("/user/update", patch(users::update))
        .route("/user/me/remove", delete(users::remove_me))
        .route_layer(middleware::from_fn(guard::require_active_user));

    let app = Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route("/token", post(token::token))
        .route("/user/register", post(user_register::register))
        .merge(protected)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(users))
                .layer(Extension(things)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    users: Arc<dyn UserStore>,
    things: Arc<dyn ThingStore>,
    auth_state: Arc<AuthState>,
    allowed_origins: &[String],
) -> Result<()> {
    let app = router(users, things, auth_state, allowed_origins)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Gracefully shutdown");
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    // credentials are allowed, which rules out a wildcard origin
    if allowed_origins.iter().any(|origin| origin.trim() == "*") {
        bail!("Wildcard CORS origin is not allowed, list origins explicitly");
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_default_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:8000".to_string(),
        ];
        assert!(cors_layer(&origins).is_ok());
    }

    #[test]
    fn cors_rejects_invalid_origin() {
        let origins = vec!["http://bad\norigin".to_string()];
        assert!(cors_layer(&origins).is_err());

        let wildcard = vec!["http://localhost:3000".to_string(), " * ".to_string()];
        assert!(cors_layer(&wildcard).is_err());
    }
}
