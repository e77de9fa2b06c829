//! HTTP API for uploads, transcription jobs, transcripts, and audio streaming
//!
//! This module provides the REST surface of the service:
//! - POST /api/v1/projects - create a project
//! - POST /api/v1/projects/:id/audio - upload an audio file
//! - POST /api/v1/projects/:id/audio/transcribe - upload and transcribe in one call
//! - POST /api/v1/audio/:id/transcribe - start transcription of an uploaded file
//! - GET /api/v1/audio/:id/file - range-capable audio byte stream
//! - GET /api/v1/transcripts/:id - transcript with segments and speakers
//! - GET /health - health check
//!
//! Identity arrives as a trusted `x-user-id` header set by the upstream
//! gateway; the audio byte stream is deliberately reachable without it so
//! the transcription provider can fetch files by URL.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
