use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Projects (thin collaborator surface)
        .route("/api/v1/projects", post(handlers::create_project))
        // Uploads
        .route(
            "/api/v1/projects/:project_id/audio",
            get(handlers::list_project_audio).post(handlers::upload_audio),
        )
        .route(
            "/api/v1/projects/:project_id/audio/transcribe",
            post(handlers::upload_and_transcribe),
        )
        // Audio assets
        .route("/api/v1/audio/:audio_id", get(handlers::get_audio))
        .route("/api/v1/audio/:audio_id", delete(handlers::delete_audio))
        .route(
            "/api/v1/audio/:audio_id/transcribe",
            post(handlers::start_transcription),
        )
        // Byte streaming: intentionally unauthenticated so the provider can
        // fetch by URL and the player can seek
        .route("/api/v1/audio/:audio_id/file", get(handlers::stream_audio))
        .route(
            "/api/v1/audio/:audio_id/transcripts",
            get(handlers::list_transcripts),
        )
        // Transcripts
        .route(
            "/api/v1/transcripts/:transcript_id",
            get(handlers::get_transcript),
        )
        .route(
            "/api/v1/transcripts/:transcript_id/export",
            get(handlers::export_transcript),
        )
        .route(
            "/api/v1/segments/:segment_id",
            patch(handlers::update_segment),
        )
        .route(
            "/api/v1/speakers/:speaker_id",
            patch(handlers::rename_speaker),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
