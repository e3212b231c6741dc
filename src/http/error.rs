use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app::error::ServiceError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    field: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            field: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            ..Self::bad_request(message)
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Maps a service failure to a response. Storage and internal failures are
    /// logged and reported as "failed to <action>".
    pub fn from_service(err: ServiceError, action: &str) -> Self {
        match err {
            ServiceError::Validation { field, message } => Self::validation(field, message),
            ServiceError::NotFound(entity) => Self::not_found(format!("{} not found", entity)),
            ServiceError::Unauthenticated(reason) => Self::unauthorized(reason),
            ServiceError::PermissionDenied(reason) => Self::forbidden(reason),
            ServiceError::Conflict(message) => Self::conflict(message),
            other => {
                tracing::error!(error = ?other, "failed to {}", action);
                Self::internal(format!("failed to {}", action))
            }
        }
    }

    /// Like [`AppError::from_service`] but keeps the raw failure text in the
    /// body. Only used by the internal statistics surface.
    pub fn exposed(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(_) | ServiceError::Internal(_) => {
                tracing::error!(error = ?err, "statistics request failed");
                Self::internal(err.to_string())
            }
            other => Self::from_service(other, "process request"),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        Self::from_service(err, "process request")
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                Self::bad_request("Content-Type must be application/json")
            }
            JsonRejection::JsonSyntaxError(_) => Self::bad_request("malformed JSON body"),
            JsonRejection::JsonDataError(err) => Self::bad_request(err.body_text()),
            // oversized or unreadable bodies keep their own status
            other => Self::new(other.status(), other.body_text()),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        // 413 when the upload is over the body limit
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            field: self.field,
        });
        (self.status, body).into_response()
    }
}
