use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for every engine operation, mapped 1:1 onto HTTP statuses.
/// Internal variants never leak detail to the client; they are logged and
/// surfaced as a uniform generic message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("Too many requests. Please wait a moment.")]
    RateLimited,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("This squad room is full.")]
    RoomFull,

    #[error("That email is already verified on another account.")]
    EmailTaken,

    #[error("That email is already verified. It can no longer be changed.")]
    AlreadyVerified,

    #[error("That member is not part of your squad.")]
    NotSquadMember,

    /// Ten straight share-code collisions. Practically unreachable with an
    /// 8-char alphabet; failing beats inserting a conflicting code.
    #[error("Could not allocate a share code")]
    ShareCodeExhausted,

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RoomFull | ApiError::EmailTaken | ApiError::AlreadyVerified => {
                StatusCode::CONFLICT
            }
            ApiError::NotSquadMember => StatusCode::FORBIDDEN,
            ApiError::ShareCodeExhausted | ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error: {self}");
            "Something went wrong. Please try again.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
