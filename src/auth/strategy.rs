//! Credential strategies.
//!
//! Each strategy turns one kind of credential into an [`AuthOutcome`]. A
//! rejection is a normal outcome; `Err` is reserved for store or hashing
//! faults, which must surface as internal errors rather than bad credentials.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRef;
use tracing::debug;

use crate::{
    auth::{
        jwt::{JwtKeys, TokenRejection},
        password::PasswordHasher,
        principal::Principal,
        repo::UserStore,
    },
    state::AppState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoSuchUser,
    BadPassword,
    InvalidToken(TokenRejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    Rejected(Rejection),
}

#[async_trait]
pub trait Strategy: Send + Sync {
    type Credentials: Send;

    async fn authenticate(&self, credentials: Self::Credentials) -> anyhow::Result<AuthOutcome>;
}

pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

/// Email + password checked against the stored bcrypt hash.
#[derive(Clone)]
pub struct PasswordStrategy {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl PasswordStrategy {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }
}

impl FromRef<AppState> for PasswordStrategy {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.hasher)
    }
}

#[async_trait]
impl Strategy for PasswordStrategy {
    type Credentials = PasswordCredentials;

    async fn authenticate(&self, credentials: PasswordCredentials) -> anyhow::Result<AuthOutcome> {
        let Some(user) = self.users.find_by_email(&credentials.email).await? else {
            return Ok(AuthOutcome::Rejected(Rejection::NoSuchUser));
        };
        if !self.hasher.verify(&credentials.password, &user.password_hash).await? {
            return Ok(AuthOutcome::Rejected(Rejection::BadPassword));
        }
        Ok(AuthOutcome::Authenticated(user.principal()))
    }
}

pub struct BearerToken(pub String);

/// Signed bearer token, re-resolved against the store on every request so
/// the principal always carries the current role.
#[derive(Clone)]
pub struct TokenStrategy {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl TokenStrategy {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }
}

impl FromRef<AppState> for TokenStrategy {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.keys.clone())
    }
}

#[async_trait]
impl Strategy for TokenStrategy {
    type Credentials = BearerToken;

    async fn authenticate(&self, BearerToken(token): BearerToken) -> anyhow::Result<AuthOutcome> {
        let claims = match self.keys.verify(&token) {
            Ok(claims) => claims,
            Err(rejection) => {
                debug!(reason = %rejection, "token rejected");
                return Ok(AuthOutcome::Rejected(Rejection::InvalidToken(rejection)));
            }
        };
        match self.users.find_by_id(claims.sub).await? {
            Some(user) => Ok(AuthOutcome::Authenticated(user.principal())),
            None => Ok(AuthOutcome::Rejected(Rejection::NoSuchUser)),
        }
    }
}
