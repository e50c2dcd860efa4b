use super::Message;
use axum::Json;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Welcome message", body = Message)
    ),
    tag = "root"
)]
pub async fn root() -> Json<Message> {
    Json(Message {
        message: format!(
            "Welcome to {}. Browse /docs to explore the API.",
            env!("CARGO_PKG_NAME")
        ),
    })
}
