use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::PasswordHasher,
        repo::{PgUserStore, UserStore},
    },
    config::AppConfig,
    customers::repo::{CustomerStore, PgCustomerStore},
    posts::repo::{PgPostStore, PostStore},
};

/// Everything a request handler may reach. Strategies and keys are derived
/// from it through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub hasher: PasswordHasher,
    pub keys: JwtKeys,
}

impl AppState {
    pub fn with_postgres(config: Arc<AppConfig>, db: PgPool) -> Self {
        Self::from_parts(
            config,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgPostStore::new(db.clone())),
            Arc::new(PgCustomerStore::new(db)),
        )
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
        customers: Arc<dyn CustomerStore>,
    ) -> Self {
        let hasher = PasswordHasher::new(config.password_cost);
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            config,
            users,
            posts,
            customers,
            hasher,
            keys,
        }
    }
}
