mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::Router;

/// Routes mounted at the root of the server.
pub fn router() -> Router<AppState> {
    handlers::site_routes()
}

/// Routes mounted under `/api`.
pub fn api_router() -> Router<AppState> {
    handlers::api_site_routes()
}
