use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use configs::SiteConfig;
use service::account::AccountStore;
use service::errors::ServiceError;
use service::notice::Notice;
use service::rating::RatingStore;

use crate::errors::ApiError;

pub mod auth;
pub mod ratings;

/// Shared handler state: the two stores and the site settings.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountStore>,
    pub ratings: Arc<RatingStore>,
    pub site: Arc<SiteConfig>,
}

impl AppState {
    pub fn notice(&self, notice: Notice) -> Notice {
        notice.dismiss_after(self.site.notice_dismiss_ms)
    }

    pub fn reject(&self, err: ServiceError) -> ApiError {
        ApiError::from(err).dismiss_after(self.site.notice_dismiss_ms)
    }
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: health, API routes and the static site fallback
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let static_root = state.site.static_dir.clone();
    let static_dir = ServeDir::new(&static_root)
        .fallback(ServeFile::new(format!("{static_root}/index.html")));

    let api = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/games", get(ratings::list_games))
        .route("/api/games/:game_id/ratings", get(ratings::game_summary).post(ratings::add_rating))
        .route("/api/games/:game_id/ratings/me", get(ratings::my_rating))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .fallback_service(static_dir)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
