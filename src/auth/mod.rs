use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod repo;
pub mod strategy;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
