use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::QuizError,
    extractors::{AppJson, ParticipantIdentity},
    models::{CastVoteRequest, SubmitResponseRequest},
    services::{attempt_service::AttemptService, vote_service::VoteService, AppState},
};

pub async fn submit_response(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(identity): ParticipantIdentity,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<SubmitResponseRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let service = AttemptService::new(state.store.clone(), state.questions.clone());
    let response = service.submit_response(&session_id, &identity, req).await?;
    Ok(Json(response))
}

pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(identity): ParticipantIdentity,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<CastVoteRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let service = VoteService::new(state.store.clone());
    service.cast_vote(&session_id, &identity, &req.option_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn vote_results(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    let service = VoteService::new(state.store.clone());
    let results = service.results(&session_id).await?;
    Ok(Json(results))
}
