use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // Pollers run from arbitrary course pages, so CORS stays open
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(extractors::USER_ID_HEADER),
            HeaderName::from_static(extractors::GUEST_TOKEN_HEADER),
        ])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api/v1/sessions", sessions_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}

fn sessions_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", post(handlers::sessions::create_session))
        .route("/{id}", get(handlers::sessions::get_session))
        .route("/{id}/join", post(handlers::sessions::join_session))
        .route("/{id}/status", get(handlers::sessions::session_status))
        .route("/{id}/start", post(handlers::instructor::start_quiz))
        .route("/{id}/questions", post(handlers::instructor::start_question))
        .route("/{id}/end", post(handlers::instructor::end_question))
        .route("/{id}/close", post(handlers::instructor::close_session))
        .route("/{id}/results", get(handlers::instructor::question_results))
        .route("/{id}/keywords", get(handlers::instructor::keywords))
        .route("/{id}/merge", post(handlers::instructor::merge_responses))
        .route("/{id}/merge/undo", post(handlers::instructor::undo_merge))
        .route("/{id}/attendance", get(handlers::instructor::attendance))
        .route("/{id}/export", get(handlers::instructor::export_session))
        .route("/{id}/voting", post(handlers::instructor::run_voting))
        .route("/{id}/voting/cast", post(handlers::student::cast_vote))
        .route("/{id}/voting/results", get(handlers::student::vote_results))
        .route("/{id}/responses", post(handlers::student::submit_response))
}
