use crate::model::AudioStatus;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Errors that can occur across the transcription pipeline.
///
/// Precondition failures (`NotFound`, `InvalidInput`, `Unauthorized`) surface
/// to the HTTP caller synchronously. Everything that happens after a job has
/// been acknowledged is only observable through the asset's status field.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing or invalid identity header")]
    Unauthorized,

    #[error("illegal status transition: {0:?} -> {1:?}")]
    Conflict(AudioStatus, AudioStatus),

    #[error("transcription provider error: {0}")]
    Provider(String),

    #[error("translation provider error: {0}")]
    Translation(String),

    #[error("transcription timed out after {0}s")]
    Timeout(u64),

    #[error("recovery could not resolve job state: {0}")]
    Recovery(String),

    #[error("requested range is not satisfiable")]
    RangeNotSatisfiable,

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Conflict(_, _) => StatusCode::CONFLICT,
            Error::Provider(_) | Error::Translation(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
            Error::Recovery(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NOT_FOUND",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Unauthorized => "UNAUTHORIZED",
            Error::Conflict(_, _) => "CONFLICT",
            Error::Provider(_) => "PROVIDER_ERROR",
            Error::Translation(_) => "TRANSLATION_ERROR",
            Error::Timeout(_) => "TIMEOUT",
            Error::Recovery(_) => "RECOVERY_ERROR",
            Error::RangeNotSatisfiable => "RANGE_NOT_SATISFIABLE",
            Error::Io(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (self.status_code(), body).into_response()
    }
}
