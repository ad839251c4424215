use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, ServerConfig};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes::{self, AppState};
use service::{
    account::{AccountConfig, AccountStore},
    rating::RatingStore,
    runtime,
    storage::{FileStorage, KeyValueStorage},
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn load_bind_addr(server: &ServerConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", server.host, server.port).parse()?)
}

fn account_config(cfg: &AppConfig) -> AccountConfig {
    AccountConfig {
        memory_kib: cfg.auth.argon2_memory_kib,
        iterations: cfg.auth.argon2_iterations,
        parallelism: cfg.auth.argon2_parallelism,
    }
}

/// Open both stores over `storage`; the rating store reads the session from the account store.
pub async fn build_state(storage: Arc<dyn KeyValueStorage>, cfg: &AppConfig) -> anyhow::Result<AppState> {
    let accounts = AccountStore::open(Arc::clone(&storage), account_config(cfg)).await?;
    let ratings = RatingStore::open(storage, accounts.clone()).await?;
    Ok(AppState { accounts, ratings, site: Arc::new(cfg.site.clone()) })
}

/// Build the router for `cfg` over `storage`.
pub async fn build_app(storage: Arc<dyn KeyValueStorage>, cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = build_state(storage, cfg).await?;
    Ok(routes::build_router(state, build_cors()))
}

/// Serve the site for an already loaded `cfg` until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    runtime::ensure_env(&cfg.site.static_dir, &cfg.storage.data_dir).await?;

    let storage = FileStorage::new(&cfg.storage.data_dir).await?;
    info!(data_dir = %storage.root().display(), games = cfg.site.games.len(), "stores opening");
    let app = build_app(storage, &cfg).await?;

    let addr = load_bind_addr(&cfg.server)?;
    info!(%addr, "starting gamerate server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    // every mutation is persisted before it returns, so there is nothing to flush
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await
        }
    }
}
