use axum::extract::DefaultBodyLimit;
use axum::{routing::delete, routing::get, routing::post, Router};
use tower_http::limit::RequestBodyLimitLayer;

use crate::domain::vacation::MAX_IMAGE_BYTES;

use crate::http::{handlers, stats_handlers};
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route(
            "/api/auth/me",
            get(handlers::get_current_user).patch(handlers::update_current_user),
        )
        .route("/api/auth/me/likes", get(handlers::list_my_likes))
}

pub fn vacations() -> Router<AppState> {
    Router::new()
        .route(
            "/api/vacations",
            get(handlers::list_vacations).post(handlers::create_vacation),
        )
        .route(
            "/api/vacations/:id",
            get(handlers::get_vacation)
                .put(handlers::update_vacation)
                .delete(handlers::delete_vacation),
        )
        .route("/api/vacations/:id/toggle-like", post(handlers::toggle_like))
        .route(
            "/api/vacations/:id/like",
            post(handlers::like_vacation).delete(handlers::unlike_vacation),
        )
}

/// Room for multipart framing around the largest accepted image.
const MAX_UPLOAD_BODY_BYTES: usize = MAX_IMAGE_BYTES + 64 * 1024;

pub fn vacation_images() -> Router<AppState> {
    Router::new()
        .route(
            "/api/vacations/:id/image",
            post(handlers::upload_vacation_image).delete(handlers::remove_vacation_image),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BODY_BYTES))
}

pub fn countries() -> Router<AppState> {
    Router::new()
        .route(
            "/api/countries",
            get(handlers::list_countries).post(handlers::create_country),
        )
        .route("/api/countries/:id", delete(handlers::delete_country))
}

pub fn stats() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(stats_handlers::health))
        .route("/api/login", post(stats_handlers::login))
        .route("/api/logout", post(stats_handlers::logout))
        .route("/api/stats/vacations", get(stats_handlers::vacation_stats))
        .route("/api/stats/summary", get(stats_handlers::summary))
        .route("/api/users/total", get(stats_handlers::total_users))
        .route("/api/likes/total", get(stats_handlers::total_likes))
        .route(
            "/api/likes/distribution",
            get(stats_handlers::like_distribution),
        )
}
