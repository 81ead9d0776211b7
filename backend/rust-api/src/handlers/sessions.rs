use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::QuizError,
    extractors::{AppJson, OptionalIdentity, ParticipantIdentity},
    models::{CreateSessionRequest, SessionStatus},
    services::{
        aggregator_service::AggregatorService, attempt_service::AttemptService,
        session_service::SessionService, AppState,
    },
};

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(host): ParticipantIdentity,
    AppJson(req): AppJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, QuizError> {
    tracing::info!("Creating session {:?}", req.name);

    let service = SessionService::new(
        state.store.clone(),
        state.questions.clone(),
        state.config.default_wait_time,
    );
    let response = service.create_session(&host, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    let service = SessionService::new(
        state.store.clone(),
        state.questions.clone(),
        state.config.default_wait_time,
    );
    let session = service.overview(&session_id).await?;
    Ok(Json(session))
}

pub async fn join_session(
    State(state): State<Arc<AppState>>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    let service = AttemptService::new(state.store.clone(), state.questions.clone());
    let response = service.join(&session_id, identity).await?;
    Ok(Json(response))
}

pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    let service = SessionService::new(
        state.store.clone(),
        state.questions.clone(),
        state.config.default_wait_time,
    );
    let mut status = service.status(&session_id).await?;
    // While reviewing, pollers get the aggregated results inline instead of
    // making a second round trip.
    if status.status == SessionStatus::Reviewing && status.slot > 0 {
        let aggregator = AggregatorService::new(state.store.clone(), state.questions.clone());
        status.results = Some(aggregator.question_results(&session_id, status.slot).await?);
    }
    Ok(Json(status))
}
