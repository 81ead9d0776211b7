use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::QuizError;
use crate::models::Identity;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const GUEST_TOKEN_HEADER: &str = "x-guest-token";

/// Custom JSON extractor that returns JSON error responses instead of HTML
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = format!("Failed to parse JSON request body: {}", rejection);
                tracing::warn!("{}", message);
                let error_response = json!({
                    "message": message,
                    "status": 400
                });
                Err((StatusCode::BAD_REQUEST, Json(error_response)).into_response())
            }
        }
    }
}

fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    // Authentication itself happens upstream; the user header is trusted.
    // A user id always wins over a guest token sent alongside it.
    if let Some(user) = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(Identity::User(user.to_string()));
    }
    headers
        .get(GUEST_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|token| Identity::Guest(token.to_string()))
}

/// The caller's identity, if they presented one. Used by `join`, which can
/// mint a guest token for anonymous callers.
pub struct OptionalIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalIdentity(identity_from_headers(&parts.headers)))
    }
}

/// The caller's identity, required. Every core operation takes this as an
/// explicit parameter; there is no ambient current-user state.
pub struct ParticipantIdentity(pub Identity);

impl<S> FromRequestParts<S> for ParticipantIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match identity_from_headers(&parts.headers) {
            Some(identity) => Ok(ParticipantIdentity(identity)),
            None => Err(QuizError::unauthorized(
                "missing x-user-id or x-guest-token header",
            )
            .into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn user_header_wins_over_guest_token() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("teacher-1"));
        headers.insert(GUEST_TOKEN_HEADER, HeaderValue::from_static("tok"));
        assert_eq!(
            identity_from_headers(&headers),
            Some(Identity::User("teacher-1".to_string()))
        );
    }

    #[test]
    fn empty_headers_yield_no_identity() {
        let headers = HeaderMap::new();
        assert_eq!(identity_from_headers(&headers), None);
    }
}
