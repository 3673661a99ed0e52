use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MessageResponse, PublicUser, RegisterRequest,
            RoleUpdateRequest,
        },
        extractors::{AdminUser, AuthUser},
        jwt::JwtKeys,
        strategy::{AuthOutcome, PasswordCredentials, PasswordStrategy, Strategy},
    },
    db::Persisted,
    error::{AppError, AppResult},
    state::AppState,
    validation::{is_valid_email, normalize_email, Violations},
};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const BAD_CREDENTIALS: &str = "Incorrect email or password.";
pub const USER_CREATED: &str = "User created successfully.";
pub const REGISTRATION_PROCESSED: &str = "Registration request processed.";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
        .route("/auth/users/:id/role", put(update_role))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let Json(mut payload) = payload?;
    payload.email = normalize_email(&payload.email);

    Violations::new()
        .check(is_valid_email(&payload.email), "email", "A valid email is required.")
        .check(
            payload.password.chars().count() >= MIN_PASSWORD_LEN,
            "password",
            "Password must be at least 8 characters long.",
        )
        .finish()?;

    // Same answer for an existing account so registration cannot be used to
    // probe which emails are known.
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "registration for existing email");
        return Ok((StatusCode::OK, Json(MessageResponse::new(REGISTRATION_PROCESSED))));
    }

    let hash = state.hasher.hash(&payload.password).await?;

    match state.users.create(&payload.email, &hash).await? {
        Persisted::Saved(user) => {
            info!(user_id = %user.id, role = %user.role, "user registered");
            Ok((StatusCode::CREATED, Json(MessageResponse::new(USER_CREATED))))
        }
        Persisted::Duplicate => {
            warn!(email = %payload.email, "concurrent registration for same email");
            Ok((StatusCode::OK, Json(MessageResponse::new(REGISTRATION_PROCESSED))))
        }
    }
}

#[instrument(skip(strategy, keys, payload))]
pub async fn login(
    State(strategy): State<PasswordStrategy>,
    State(keys): State<JwtKeys>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);

    Violations::new()
        .check(is_valid_email(&email), "email", "A valid email is required.")
        .check(!payload.password.is_empty(), "password", "Password is required.")
        .finish()?;

    let credentials = PasswordCredentials {
        email,
        password: payload.password,
    };
    let principal = match strategy.authenticate(credentials).await? {
        AuthOutcome::Authenticated(principal) => principal,
        AuthOutcome::Rejected(reason) => {
            warn!(?reason, "login rejected");
            return Err(AppError::unauthorized(BAD_CREDENTIALS));
        }
    };

    let token = keys.issue(&principal)?;
    info!(user_id = %principal.id, "user logged in");
    Ok(Json(LoginResponse {
        token,
        user: principal.into(),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(principal): AuthUser) -> Json<PublicUser> {
    Json(principal.into())
}

#[instrument(skip(state, admin, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RoleUpdateRequest>, JsonRejection>,
) -> AppResult<Json<PublicUser>> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let user = state
        .users
        .set_role(id, payload.role)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(admin_id = %admin.id, user_id = %user.id, role = %user.role, "user role updated");
    Ok(Json(user.principal().into()))
}
