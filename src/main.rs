use std::sync::Arc;

mod app;
mod auth;
mod config;
mod customers;
mod db;
mod error;
mod posts;
mod site;
mod state;
mod validation;

#[cfg(test)]
mod testing;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "woodwardian=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = match AppConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(e);
        }
    };
    tracing::info!(environment = %config.environment, "starting");

    let db = db::connect(&config).await?;
    db::migrate(&db).await?;

    let state = AppState::with_postgres(config, db.clone());
    let (host, port) = (state.config.host.clone(), state.config.port);
    app::serve(app::build_app(state), &host, port).await?;

    db.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}
