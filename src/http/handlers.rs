use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::app::auth::{SignupInput, MAX_PASSWORD_LEN};
use crate::app::countries::CountryService;
use crate::app::likes::LikeService;
use crate::app::policy;
use crate::app::users::UserService;
use crate::domain::country::Country;
use crate::domain::like::{Like, LikeOutcome};
use crate::domain::user::User;
use crate::domain::vacation::{today_utc, Vacation, VacationInput};
use crate::http::{AppError, AuthUser, JsonBody};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 30;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub(crate) struct MessageResponse {
    pub message: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, i64)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let (timestamp, id) = cursor
        .rsplit_once('/')
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = id
        .parse::<i64>()
        .map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, i64)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }

    let user = state
        .auth_service()
        .signup(SignupInput {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await
        .map_err(|err| AppError::from_service(err, "create user"))?;

    tracing::info!(user_id = user.id, "user signed up");
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: User,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let session = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await
        .map_err(|err| AppError::from_service(err, "login"))?;

    match session {
        Some(session) => Ok(Json(LoginResponse {
            access_token: session.token.token,
            expires_at: session.token.expires_at,
            user: session.user,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

pub async fn logout(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .auth_service()
        .logout(auth.jti, auth.expires_at)
        .await
        .map_err(|err| AppError::from_service(err, "logout"))?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let service = UserService::new(state.db.clone());
    let user = service
        .get_user(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "fetch user"))?;

    user.map(Json)
        .ok_or_else(|| AppError::not_found("user not found"))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn update_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    const MAX_NAME_LEN: usize = 150;

    for name in [&payload.first_name, &payload.last_name].into_iter().flatten() {
        if name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::bad_request("names must be at most 150 characters"));
        }
    }

    let service = UserService::new(state.db.clone());
    let user = service
        .update_profile(auth.user_id, payload.first_name, payload.last_name)
        .await
        .map_err(|err| AppError::from_service(err, "update profile"))?;

    user.map(Json)
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn list_my_likes(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Like>>, AppError> {
    let service = LikeService::new(state.db.clone());
    let likes = service
        .list_for_user(auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "list likes"))?;

    Ok(Json(likes))
}

pub async fn list_vacations(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Vacation>>, AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::view_vacations(caller).into_result()?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    let cursor = parse_cursor(query.cursor)?;

    let service = state.vacation_service();
    let mut vacations = service
        .list(caller.map(|principal| principal.user_id), cursor, limit + 1)
        .await
        .map_err(|err| AppError::from_service(err, "list vacations"))?;

    let next_cursor = if vacations.len() > limit as usize {
        vacations.truncate(limit as usize);
        vacations.last().map(|last| (last.created_at, last.id))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: vacations,
        next_cursor: encode_cursor(next_cursor),
    }))
}

pub async fn get_vacation(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<Vacation>, AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::view_vacations(caller).into_result()?;

    let service = state.vacation_service();
    let vacation = service
        .get(id, caller.map(|principal| principal.user_id))
        .await
        .map_err(|err| AppError::from_service(err, "fetch vacation"))?;

    Ok(Json(vacation))
}

fn read_vacation(body: Value) -> Result<VacationInput, AppError> {
    VacationInput::from_json(body).map_err(|err| AppError::validation(err.field, err.message))
}

pub async fn create_vacation(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Vacation>), AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::manage_vacations(caller).into_result()?;
    let payload = read_vacation(body)?;

    let service = state.vacation_service();
    let vacation = service
        .create(&payload, today_utc())
        .await
        .map_err(|err| AppError::from_service(err, "create vacation"))?;

    tracing::info!(vacation_id = vacation.id, "vacation created");
    Ok((StatusCode::CREATED, Json(vacation)))
}

pub async fn update_vacation(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Vacation>, AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::manage_vacations(caller).into_result()?;
    let payload = read_vacation(body)?;

    let service = state.vacation_service();
    let vacation = service
        .update(id, &payload, today_utc())
        .await
        .map_err(|err| AppError::from_service(err, "update vacation"))?;

    Ok(Json(vacation))
}

/// Multipart upload with the file in an `image` field. Replaces any current
/// image.
pub async fn upload_vacation_image(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vacation>, AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::manage_vacations(caller).into_result()?;
    let mut multipart = multipart?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let Some(bytes) = upload else {
        return Err(AppError::validation("image", "No file was submitted."));
    };

    let service = state.vacation_service();
    service
        .attach_image(id, &bytes)
        .await
        .map_err(|err| AppError::from_service(err, "store image"))?;

    let vacation = service
        .get(id, caller.map(|principal| principal.user_id))
        .await
        .map_err(|err| AppError::from_service(err, "fetch vacation"))?;
    Ok(Json(vacation))
}

pub async fn remove_vacation_image(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::manage_vacations(caller).into_result()?;

    state
        .vacation_service()
        .clear_image(id)
        .await
        .map_err(|err| AppError::from_service(err, "remove image"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct DeleteVacationResponse {
    pub status: &'static str,
    pub message: String,
}

pub async fn delete_vacation(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<DeleteVacationResponse>, AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::manage_vacations(caller).into_result()?;

    let service = state.vacation_service();
    let country = service
        .delete(id)
        .await
        .map_err(|err| AppError::from_service(err, "delete vacation"))?;

    tracing::info!(vacation_id = id, "vacation deleted");
    Ok(Json(DeleteVacationResponse {
        status: "success",
        message: format!("\"{}\" was deleted successfully", country),
    }))
}

#[derive(Serialize)]
pub struct ToggleLikeResponse {
    pub status: &'static str,
    pub liked: bool,
    pub likes_count: i64,
}

pub async fn toggle_like(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<ToggleLikeResponse>, AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::like_vacations(caller).into_result()?;
    let Some(auth) = auth else {
        return Err(AppError::unauthorized("Not authenticated"));
    };

    let service = LikeService::new(state.db.clone());
    let outcome = service
        .toggle(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "toggle like"))?;
    let likes_count = service
        .count(id)
        .await
        .map_err(|err| AppError::from_service(err, "count likes"))?;

    Ok(Json(ToggleLikeResponse {
        status: "success",
        liked: outcome.is_liked(),
        likes_count,
    }))
}

#[derive(Serialize)]
pub struct LikeStatusResponse {
    pub status: &'static str,
}

pub async fn like_vacation(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<LikeStatusResponse>), AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::like_vacations(caller).into_result()?;
    let Some(auth) = auth else {
        return Err(AppError::unauthorized("Not authenticated"));
    };

    let service = LikeService::new(state.db.clone());
    let outcome = service
        .like(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "like vacation"))?;

    let status = match outcome {
        LikeOutcome::Liked => StatusCode::CREATED,
        LikeOutcome::AlreadyLiked => StatusCode::OK,
    };
    Ok((
        status,
        Json(LikeStatusResponse {
            status: outcome.as_str(),
        }),
    ))
}

pub async fn unlike_vacation(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let caller = auth.as_ref().map(AuthUser::principal);
    policy::like_vacations(caller).into_result()?;
    let Some(auth) = auth else {
        return Err(AppError::unauthorized("Not authenticated"));
    };

    let service = LikeService::new(state.db.clone());
    let removed = service
        .unlike(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "unlike vacation"))?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("not liked"))
    }
}

pub async fn list_countries(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Country>>, AppError> {
    policy::view_countries(auth.as_ref().map(AuthUser::principal)).into_result()?;

    let service = CountryService::new(state.db.clone());
    let countries = service
        .list()
        .await
        .map_err(|err| AppError::from_service(err, "list countries"))?;

    Ok(Json(countries))
}

#[derive(Deserialize)]
pub struct CreateCountryRequest {
    #[serde(default)]
    pub name: String,
}

pub async fn create_country(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateCountryRequest>,
) -> Result<(StatusCode, Json<Country>), AppError> {
    policy::create_country(auth.as_ref().map(AuthUser::principal)).into_result()?;

    let service = CountryService::new(state.db.clone());
    let country = service
        .create(&payload.name)
        .await
        .map_err(|err| AppError::from_service(err, "create country"))?;

    Ok((StatusCode::CREATED, Json(country)))
}

pub async fn delete_country(
    Path(id): Path<i64>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    policy::delete_country(auth.as_ref().map(AuthUser::principal)).into_result()?;

    let service = CountryService::new(state.db.clone());
    service
        .delete(id)
        .await
        .map_err(|err| AppError::from_service(err, "delete country"))?;

    tracing::info!(country_id = id, "country deleted");
    Ok(StatusCode::NO_CONTENT)
}
