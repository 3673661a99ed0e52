use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}

/// Result of a write guarded by a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persisted<T> {
    Saved(T),
    Duplicate,
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

/// Map a unique-constraint violation to `Persisted::Duplicate`.
pub fn on_unique_violation<T>(
    result: Result<T, sqlx::Error>,
    what: &'static str,
) -> anyhow::Result<Persisted<T>> {
    match result {
        Ok(v) => Ok(Persisted::Saved(v)),
        Err(e) if is_unique_violation(&e) => Ok(Persisted::Duplicate),
        Err(e) => Err(anyhow::Error::new(e).context(what)),
    }
}
