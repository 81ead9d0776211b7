use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Every command failure the core can produce. Commands reject before they
/// mutate, so a returned error always means the session was left untouched.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// Command issued from a session state that does not permit it.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("already voted in this round")]
    DuplicateVote,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl QuizError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QuizError::InvalidTransition(_) => StatusCode::CONFLICT,
            QuizError::NotFound(_) => StatusCode::NOT_FOUND,
            QuizError::Unauthorized(_) => StatusCode::FORBIDDEN,
            QuizError::DuplicateVote => StatusCode::CONFLICT,
            QuizError::BadRequest(_) => StatusCode::BAD_REQUEST,
            QuizError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        QuizError::InvalidTransition(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        QuizError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        QuizError::Unauthorized(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        QuizError::BadRequest(message.into())
    }
}

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }
        let body = json!({
            "message": self.to_string(),
            "status": status.as_u16()
        });
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for QuizError {
    fn from(errors: validator::ValidationErrors) -> Self {
        QuizError::BadRequest(errors.to_string())
    }
}
