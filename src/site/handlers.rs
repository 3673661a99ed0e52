use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::AppResult,
    site::dto::ContactRequest,
    state::AppState,
};

pub const GREETING: &str = "Hello World!";
pub const MESSAGE_RECEIVED: &str = "Message received successfully!";

pub fn site_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { GREETING }))
        .route("/submit", post(submit_contact))
        .route("/profile", get(profile))
}

pub fn api_site_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/profile", get(profile))
}

#[instrument(skip_all)]
pub async fn submit_contact(
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> AppResult<&'static str> {
    let Json(payload) = payload?;
    let contact = payload.into_message()?;
    info!(name = %contact.name, message = %contact.message, "contact message received");
    Ok(MESSAGE_RECEIVED)
}

#[instrument(skip_all)]
pub async fn profile(AuthUser(principal): AuthUser) -> Json<MessageResponse> {
    Json(MessageResponse::new(format!("Welcome {}", principal.email)))
}
