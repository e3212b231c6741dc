use anyhow::{anyhow, Result};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::AppState;

mod auth;
mod error;
mod extract;
mod handlers;
mod routes;
mod stats_handlers;

pub use auth::{AuthUser, StaffUser};
pub use error::AppError;
pub use extract::JsonBody;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Public vacations API: accounts, vacations, likes and countries, plus the
/// uploaded images under `/media`.
pub fn content_router(state: AppState) -> Router {
    let media = ServeDir::new(state.media.root());

    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::vacations())
        .merge(routes::countries())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        // uploads carry their own, larger limit
        .merge(routes::vacation_images())
        .nest_service("/media", media)
        .with_state(state)
}

/// Internal statistics API for staff dashboards.
pub fn stats_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::stats())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|err| anyhow!("invalid CORS origin {}: {}", origin, err))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}
