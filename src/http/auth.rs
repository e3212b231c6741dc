use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthSession;
use crate::app::policy::Principal;
use crate::app::tokens::Audience;
use crate::http::AppError;
use crate::AppState;

/// Caller of the content service, resolved from a `vacations-content` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub is_staff: bool,
    pub jti: Uuid,
    pub expires_at: OffsetDateTime,
}

impl AuthUser {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            is_staff: self.is_staff,
        }
    }
}

/// Staff caller of the statistics service, resolved from a `vacations-stats` token.
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub user_id: i64,
    pub jti: Uuid,
    pub expires_at: OffsetDateTime,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = authenticate(parts, state, Audience::Content).await?;
        Ok(AuthUser {
            user_id: session.principal.user_id,
            is_staff: session.principal.is_staff,
            jti: session.jti,
            expires_at: session.expires_at,
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = authenticate(parts, state, Audience::Stats).await?;
        Ok(StaffUser {
            user_id: session.principal.user_id,
            jti: session.jti,
            expires_at: session.expires_at,
        })
    }
}

async fn authenticate(
    parts: &Parts,
    state: &AppState,
    audience: Audience,
) -> Result<AuthSession, AppError> {
    let token = bearer_token(parts)?;

    let session = state
        .auth_service()
        .authenticate(audience, token)
        .await
        .map_err(|err| AppError::from_service(err, "authenticate"))?;

    session.ok_or_else(|| AppError::unauthorized("invalid token"))
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))
}
