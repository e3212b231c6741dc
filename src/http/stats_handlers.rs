//! Handlers for the internal statistics dashboard. Every endpoint except
//! health and login needs a staff bearer token, and failures carry the raw
//! error text.

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::app::auth::StaffLogin;
use crate::app::stats::StatsService;
use crate::domain::stats::{DestinationLikes, StatsSummary, VacationCounts};
use crate::domain::user::UserSummary;
use crate::domain::vacation::today_utc;
use crate::http::handlers::MessageResponse;
use crate::http::{AppError, StaffUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct StatsHealthResponse {
    status: &'static str,
    service: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<StatsHealthResponse> {
    let status = match state.db.ping().await {
        Ok(()) => "healthy",
        Err(err) => {
            tracing::warn!(error = ?err, "statistics database ping failed");
            "degraded"
        }
    };

    Json(StatsHealthResponse {
        status,
        service: "stats-api",
    })
}

#[derive(Default, Deserialize)]
pub struct StatsLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct StatsLoginResponse {
    pub access_token: String,
    pub user: UserSummary,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<StatsLoginRequest>, JsonRejection>,
) -> Result<Json<StatsLoginResponse>, AppError> {
    // An unreadable body is treated the same as one without credentials.
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "unreadable statistics login body");
            StatsLoginRequest::default()
        }
    };
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::bad_request("Email and password required"));
    }

    let outcome = state
        .auth_service()
        .login_staff(&email, &password)
        .await
        .map_err(AppError::exposed)?;

    match outcome {
        StaffLogin::Authenticated(session) => {
            tracing::info!(user_id = session.user.id, "staff login");
            Ok(Json(StatsLoginResponse {
                access_token: session.token.token,
                user: UserSummary::from(&session.user),
            }))
        }
        StaffLogin::NotStaff => Err(AppError::unauthorized(
            "Invalid credentials or not an admin",
        )),
        StaffLogin::BadPassword => Err(AppError::unauthorized("Invalid credentials")),
    }
}

pub async fn logout(
    staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .auth_service()
        .logout(staff.jti, staff.expires_at)
        .await
        .map_err(AppError::exposed)?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

pub async fn vacation_stats(
    _staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<VacationCounts>, AppError> {
    let service = StatsService::new(state.db.clone());
    let counts = service
        .vacation_counts(today_utc())
        .await
        .map_err(AppError::exposed)?;

    Ok(Json(counts))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalUsersResponse {
    pub total_users: i64,
}

pub async fn total_users(
    _staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<TotalUsersResponse>, AppError> {
    let service = StatsService::new(state.db.clone());
    let total_users = service
        .non_staff_user_count()
        .await
        .map_err(AppError::exposed)?;

    Ok(Json(TotalUsersResponse { total_users }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalLikesResponse {
    pub total_likes: i64,
}

pub async fn total_likes(
    _staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<TotalLikesResponse>, AppError> {
    let service = StatsService::new(state.db.clone());
    let total_likes = service.total_likes().await.map_err(AppError::exposed)?;

    Ok(Json(TotalLikesResponse { total_likes }))
}

pub async fn like_distribution(
    _staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DestinationLikes>>, AppError> {
    let service = StatsService::new(state.db.clone());
    let distribution = service
        .like_distribution(None)
        .await
        .map_err(AppError::exposed)?;

    Ok(Json(distribution))
}

pub async fn summary(
    _staff: StaffUser,
    State(state): State<AppState>,
) -> Result<Json<StatsSummary>, AppError> {
    let service = StatsService::new(state.db.clone());
    let summary = service
        .summary(today_utc())
        .await
        .map_err(AppError::exposed)?;

    Ok(Json(summary))
}
