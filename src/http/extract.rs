use axum::extract::FromRequest;

use crate::http::AppError;

/// JSON request body whose rejections render as `{error}` like every other
/// failure, with 400 for anything the client sent wrong.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
