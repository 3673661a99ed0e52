use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::{
    auth::{
        principal::{Principal, Role},
        strategy::{AuthOutcome, BearerToken, Strategy, TokenStrategy},
    },
    error::AppError,
};

pub const INVALID_TOKEN: &str = "Invalid or expired token.";
pub const MISSING_TOKEN: &str = "Missing or malformed Authorization header.";
pub const ADMINS_ONLY: &str = "Forbidden: Admins only";

/// Allow only principals holding `role`. Callers must already be authenticated.
pub fn require_role(principal: &Principal, role: Role) -> Result<(), AppError> {
    if principal.role == role {
        Ok(())
    } else {
        warn!(user_id = %principal.id, have = %principal.role, need = %role, "role check failed");
        Err(AppError::Forbidden(ADMINS_ONLY.into()))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Principal resolved from the `Authorization: Bearer` header.
pub struct AuthUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenStrategy: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::unauthorized(MISSING_TOKEN))?;

        let strategy = TokenStrategy::from_ref(state);
        match strategy.authenticate(BearerToken(token.to_owned())).await? {
            AuthOutcome::Authenticated(principal) => Ok(AuthUser(principal)),
            AuthOutcome::Rejected(reason) => {
                warn!(?reason, "bearer authentication rejected");
                Err(AppError::unauthorized(INVALID_TOKEN))
            }
        }
    }
}

/// Authenticated principal that also passed the admin role check.
pub struct AdminUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    TokenStrategy: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        require_role(&principal, Role::Admin)?;
        Ok(AdminUser(principal))
    }
}
