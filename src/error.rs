use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::{state::AppState, validation::FieldError};

pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error chain of a 500. Stays out of the body unless [`with_internal_detail`]
/// adds it.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            AppError::Validation(errors) => {
                (status, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::Unauthorized(message)
            | AppError::Forbidden(message)
            | AppError::NotFound(message)
            | AppError::Conflict(message) => {
                (status, Json(MessageBody { message: &message })).into_response()
            }
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                let mut res = (status, Json(MessageBody { message: INTERNAL_MESSAGE })).into_response();
                res.extensions_mut().insert(InternalDetail(format!("{e:#}")));
                res
            }
        }
    }
}

/// Response mapper: in development, 500 bodies also carry the error chain.
pub async fn with_internal_detail(State(state): State<AppState>, mut res: Response) -> Response {
    let Some(InternalDetail(detail)) = res.extensions_mut().remove::<InternalDetail>() else {
        return res;
    };
    if !state.config.environment.is_development() {
        return res;
    }
    let status = res.status();
    (status, Json(json!({ "message": INTERNAL_MESSAGE, "detail": detail }))).into_response()
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::invalid("id", rejection.body_text())
    }
}
