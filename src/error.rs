//! Error types for the store layer and the HTTP surface.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::protocol::ErrorOut;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("Course {course_id} not found for user {ocid}")]
    EnrollmentNotFound { ocid: String, course_id: String },

    #[error("NFT has already been minted for course {0}")]
    AlreadyMinted(String),

    #[error("Snapshot IO error: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures reported to HTTP callers. Internal details stay in the log.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal Server Error")]
    Internal(#[source] StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound("User not found".into()),
            StoreError::EnrollmentNotFound { .. } => {
                ApiError::NotFound("Course not found for this user".into())
            }
            StoreError::AlreadyExists(_) => ApiError::Conflict("User already exists".into()),
            StoreError::AlreadyMinted(_) => {
                ApiError::Conflict("NFT has already been minted for this course".into())
            }
            other => ApiError::Internal(other),
        }
    }
}

/// Unreadable or mistyped request bodies are validation failures like any other.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(source) = &self {
            error!(target: "sensaylabs", error = %source, "Store failure");
        }
        let body = ErrorOut { success: false, error: self.to_string() };
        (self.status(), Json(body)).into_response()
    }
}
