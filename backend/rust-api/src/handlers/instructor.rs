use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::QuizError,
    extractors::{AppJson, ParticipantIdentity},
    models::{MergeRequest, RunVotingRequest, StartQuestionRequest, UndoMergeRequest},
    services::{
        aggregator_service::AggregatorService, attempt_service::AttemptService,
        export_service::ExportService, session_service::SessionService, AppState,
    },
};

const DEFAULT_KEYWORD_COUNT: usize = 20;

fn session_service(state: &AppState) -> SessionService {
    SessionService::new(
        state.store.clone(),
        state.questions.clone(),
        state.config.default_wait_time,
    )
}

pub async fn start_quiz(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    session_service(&state).start_quiz(&session_id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_question(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<StartQuestionRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let response = session_service(&state)
        .start_question(&session_id, &caller, req)
        .await?;
    Ok(Json(response))
}

pub async fn end_question(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    session_service(&state).end_question(&session_id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn run_voting(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<RunVotingRequest>,
) -> Result<impl IntoResponse, QuizError> {
    session_service(&state)
        .run_voting(&session_id, &caller, req)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn close_session(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    session_service(&state).close_session(&session_id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub slot: Option<u32>,
    pub top_k: Option<usize>,
}

/// Defaults to the current slot when the query names none.
async fn resolve_slot(
    state: &AppState,
    session_id: &str,
    requested: Option<u32>,
) -> Result<u32, QuizError> {
    match requested {
        Some(slot) => Ok(slot),
        None => {
            let overview = session_service(state).overview(session_id).await?;
            Ok(overview.slot)
        }
    }
}

pub async fn question_results(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<impl IntoResponse, QuizError> {
    let slot = resolve_slot(&state, &session_id, query.slot).await?;
    let service = AggregatorService::new(state.store.clone(), state.questions.clone());
    let results = service.question_results(&session_id, slot).await?;
    Ok(Json(results))
}

pub async fn keywords(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<impl IntoResponse, QuizError> {
    let slot = resolve_slot(&state, &session_id, query.slot).await?;
    let service = AggregatorService::new(state.store.clone(), state.questions.clone());
    let words = service
        .keywords(&session_id, slot, query.top_k.unwrap_or(DEFAULT_KEYWORD_COUNT))
        .await?;
    Ok(Json(words))
}

pub async fn merge_responses(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<MergeRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let service = AggregatorService::new(state.store.clone(), state.questions.clone());
    service
        .merge(&session_id, &caller, req.slot, req.from, req.into)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn undo_merge(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<UndoMergeRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let service = AggregatorService::new(state.store.clone(), state.questions.clone());
    service.undo_merge(&session_id, &caller, req.slot).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attendance(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    let service = AttemptService::new(state.store.clone(), state.questions.clone());
    let entries = service.attendance(&session_id, &caller).await?;
    Ok(Json(entries))
}

pub async fn export_session(
    State(state): State<Arc<AppState>>,
    ParticipantIdentity(caller): ParticipantIdentity,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    let service = ExportService::new(state.store.clone(), state.questions.clone());
    let (filename, body) = service.export_csv(&session_id, &caller).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}
