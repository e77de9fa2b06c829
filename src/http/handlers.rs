use super::state::AppState;
use crate::cue::{self, Cue};
use crate::error::{Error, Result};
use crate::model::{
    AudioAsset, AudioStatus, Project, Speaker, Transcript, TranscriptDetail, TranscriptSegment,
};
use crate::orchestrator::{Task, TranscriptionRequest};
use crate::provider::{AudioLocator, SpeakerCount};
use crate::storage::FileStorage;
use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeBody {
    /// "transcribe" (default) or "translate"
    pub task: Option<String>,

    /// Source language hint; omitted means provider auto-detect
    pub language: Option<String>,

    /// Required when task is "translate"
    pub target_language: Option<String>,

    /// Exact diarization speaker count; exclusive with min/max
    pub num_speakers: Option<u32>,
    pub min_speakers: Option<u32>,
    pub max_speakers: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionStartedResponse {
    pub audio_id: Uuid,
    pub status: AudioStatus,
}

#[derive(Debug, Serialize)]
pub struct UploadAndTranscribeResponse {
    pub audio_asset: AudioAsset,
    pub status: AudioStatus,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// "txt" (default) or "srt"
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSegmentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSpeakerRequest {
    pub name: String,
}

// ============================================================================
// Identity
// ============================================================================

/// Extract the caller identity installed by the upstream gateway.
fn require_user(headers: &HeaderMap) -> Result<Uuid> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(Error::Unauthorized)
}

// ============================================================================
// Projects
// ============================================================================

/// POST /api/v1/projects
pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>)> {
    let user_id = require_user(&headers)?;
    if req.name.trim().is_empty() {
        return Err(Error::InvalidInput("project name must not be empty".into()));
    }

    let project = state.store.create_project(user_id, req.name).await;
    info!("Created project {} for user {}", project.id, user_id);
    Ok((StatusCode::CREATED, Json(project)))
}

// ============================================================================
// Uploads
// ============================================================================

/// One file plus any text fields pulled out of a multipart body.
struct UploadForm {
    filename: String,
    mime_type: String,
    bytes: Bytes,
    task: Option<String>,
    language: Option<String>,
    target_language: Option<String>,
    num_speakers: Option<u32>,
    min_speakers: Option<u32>,
    max_speakers: Option<u32>,
}

async fn parse_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut task = None;
    let mut language = None;
    let mut target_language = None;
    let mut num_speakers = None;
    let mut min_speakers = None;
    let mut max_speakers = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| Error::InvalidInput("file field has no filename".into()))?;
                let mime_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::InvalidInput(format!("could not read upload: {e}")))?;
                file = Some((filename, mime_type, bytes));
            }
            "task" => task = Some(read_text_field(field).await?),
            "language" => language = Some(read_text_field(field).await?),
            "target_language" => target_language = Some(read_text_field(field).await?),
            "num_speakers" => num_speakers = Some(read_u32_field(field, "num_speakers").await?),
            "min_speakers" => min_speakers = Some(read_u32_field(field, "min_speakers").await?),
            "max_speakers" => max_speakers = Some(read_u32_field(field, "max_speakers").await?),
            _ => {}
        }
    }

    let (filename, mime_type, bytes) =
        file.ok_or_else(|| Error::InvalidInput("no file uploaded".into()))?;

    Ok(UploadForm {
        filename,
        mime_type,
        bytes,
        task,
        language,
        target_language,
        num_speakers,
        min_speakers,
        max_speakers,
    })
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::InvalidInput(format!("malformed multipart field: {e}")))
}

async fn read_u32_field(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<u32> {
    read_text_field(field)
        .await?
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{name} must be a positive integer")))
}

/// Store the upload bytes and create the asset record.
async fn store_upload(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
    form: &UploadForm,
) -> Result<AudioAsset> {
    if !FileStorage::is_allowed(&form.filename, &form.mime_type) {
        return Err(Error::InvalidInput(
            "invalid file type; allowed: .mp3, .wav, .m4a, .flac".into(),
        ));
    }

    // Ownership check happens before bytes hit the disk
    state.store.get_project(project_id, user_id).await?;

    let stored_filename = FileStorage::stored_filename(&form.filename);
    state.storage.save(&stored_filename, &form.bytes).await?;

    let asset = state
        .store
        .create_asset(
            project_id,
            user_id,
            form.filename.clone(),
            stored_filename,
            form.bytes.len() as u64,
            form.mime_type.clone(),
        )
        .await?;

    info!(
        "Uploaded {} ({} bytes) as asset {}",
        asset.original_filename, asset.size_bytes, asset.id
    );
    Ok(asset)
}

/// POST /api/v1/projects/:project_id/audio
/// Upload an audio file; transcription is started separately.
pub async fn upload_audio(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AudioAsset>)> {
    let user_id = require_user(&headers)?;
    let form = parse_upload_form(multipart).await?;
    let asset = store_upload(&state, project_id, user_id, &form).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// POST /api/v1/projects/:project_id/audio/transcribe
/// Upload and start transcription in one call. The audio bytes are already
/// in hand, so they are submitted inline rather than by URL.
pub async fn upload_and_transcribe(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadAndTranscribeResponse>)> {
    let user_id = require_user(&headers)?;
    let form = parse_upload_form(multipart).await?;
    let request = build_transcription_request(
        form.task.as_deref(),
        form.language.clone(),
        form.target_language.clone(),
        form.num_speakers,
        form.min_speakers,
        form.max_speakers,
    )?;

    let asset = store_upload(&state, project_id, user_id, &form).await?;

    let audio = AudioLocator::Inline {
        bytes: form.bytes.to_vec(),
        mime_type: form.mime_type.clone(),
    };
    state
        .orchestrator
        .start(asset.id, user_id, request, audio)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadAndTranscribeResponse {
            audio_asset: asset,
            status: AudioStatus::Processing,
        }),
    ))
}

// ============================================================================
// Audio assets
// ============================================================================

/// GET /api/v1/projects/:project_id/audio
pub async fn list_project_audio(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Vec<AudioAsset>>> {
    let user_id = require_user(&headers)?;
    let assets = state.store.list_assets(project_id, user_id).await?;
    Ok(Json(assets))
}

/// GET /api/v1/audio/:audio_id
pub async fn get_audio(
    State(state): State<AppState>,
    Path(audio_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<AudioAsset>> {
    let user_id = require_user(&headers)?;
    let asset = state.store.get_asset(audio_id, Some(user_id)).await?;
    Ok(Json(asset))
}

/// DELETE /api/v1/audio/:audio_id
/// Soft-deletes the record; the stored bytes are purged best-effort.
pub async fn delete_audio(
    State(state): State<AppState>,
    Path(audio_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<DeleteResponse>> {
    let user_id = require_user(&headers)?;
    let asset = state.store.soft_delete_asset(audio_id, user_id).await?;

    if let Err(e) = state.storage.delete(&asset.stored_filename).await {
        error!("Failed to purge stored file {}: {}", asset.stored_filename, e);
    }

    Ok(Json(DeleteResponse { success: true }))
}

/// POST /api/v1/audio/:audio_id/transcribe
/// Returns 202 as soon as the asset is marked processing; progress is
/// observed by polling the asset's status.
pub async fn start_transcription(
    State(state): State<AppState>,
    Path(audio_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<TranscribeBody>,
) -> Result<(StatusCode, Json<TranscriptionStartedResponse>)> {
    let user_id = require_user(&headers)?;
    let request = build_transcription_request(
        body.task.as_deref(),
        body.language,
        body.target_language,
        body.num_speakers,
        body.min_speakers,
        body.max_speakers,
    )?;

    let asset = state.store.get_asset(audio_id, Some(user_id)).await?;
    if !state.storage.exists(&asset.stored_filename).await {
        return Err(Error::NotFound("stored audio file"));
    }

    // The provider fetches the bytes back through our unauthenticated
    // streaming endpoint
    let audio = AudioLocator::Url(format!(
        "{}/api/v1/audio/{}/file",
        state.public_url, asset.id
    ));
    state
        .orchestrator
        .start(asset.id, user_id, request, audio)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TranscriptionStartedResponse {
            audio_id: asset.id,
            status: AudioStatus::Processing,
        }),
    ))
}

fn build_transcription_request(
    task: Option<&str>,
    language: Option<String>,
    target_language: Option<String>,
    num_speakers: Option<u32>,
    min_speakers: Option<u32>,
    max_speakers: Option<u32>,
) -> Result<TranscriptionRequest> {
    let task = match task {
        None | Some("transcribe") => Task::Transcribe,
        Some("translate") => Task::Translate,
        Some(other) => {
            return Err(Error::InvalidInput(format!(
                "unknown task {other:?}; expected \"transcribe\" or \"translate\""
            )))
        }
    };

    Ok(TranscriptionRequest {
        task,
        language_hint: language,
        target_language,
        speaker_count: SpeakerCount::from_fields(num_speakers, min_speakers, max_speakers)?,
    })
}

// ============================================================================
// Audio streaming
// ============================================================================

/// GET /api/v1/audio/:audio_id/file
/// Range-capable byte stream. No identity check: the transcription provider
/// fetches this URL, and the in-browser player seeks against it.
pub async fn stream_audio(
    State(state): State<AppState>,
    Path(audio_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response> {
    let asset = state.store.get_asset(audio_id, None).await?;
    if !state.storage.exists(&asset.stored_filename).await {
        return Err(Error::NotFound("stored audio file"));
    }

    let total = state.storage.size(&asset.stored_filename).await?;
    let mut file = tokio::fs::File::open(state.storage.path(&asset.stored_filename)).await?;

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|raw| parse_range(raw, total))
        .transpose()?;

    let disposition = format!("inline; filename=\"{}\"", asset.original_filename);

    match range {
        Some((start, end)) => {
            file.seek(SeekFrom::Start(start)).await?;
            let window = end - start + 1;
            let body = Body::from_stream(ReaderStream::new(file.take(window)));

            Ok((
                StatusCode::PARTIAL_CONTENT,
                AppendHeaders(vec![
                    (header::CONTENT_TYPE, asset.mime_type.clone()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, window.to_string()),
                    (
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{}", start, end, total),
                    ),
                    (header::CONTENT_DISPOSITION, disposition),
                ]),
                body,
            )
                .into_response())
        }
        None => {
            let body = Body::from_stream(ReaderStream::new(file));

            Ok((
                StatusCode::OK,
                AppendHeaders(vec![
                    (header::CONTENT_TYPE, asset.mime_type.clone()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_LENGTH, total.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ]),
                body,
            )
                .into_response())
        }
    }
}

/// Parse a `bytes=start-end` range header. The end is optional and defaults
/// to the last byte.
fn parse_range(raw: &str, total: u64) -> Result<(u64, u64)> {
    let spec = raw
        .strip_prefix("bytes=")
        .ok_or(Error::RangeNotSatisfiable)?;
    let (start_raw, end_raw) = spec.split_once('-').ok_or(Error::RangeNotSatisfiable)?;

    let start: u64 = start_raw
        .trim()
        .parse()
        .map_err(|_| Error::RangeNotSatisfiable)?;
    let end: u64 = if end_raw.trim().is_empty() {
        total.saturating_sub(1)
    } else {
        end_raw
            .trim()
            .parse()
            .map_err(|_| Error::RangeNotSatisfiable)?
    };

    if total == 0 || start > end || end >= total {
        return Err(Error::RangeNotSatisfiable);
    }
    Ok((start, end))
}

// ============================================================================
// Transcripts
// ============================================================================

/// GET /api/v1/audio/:audio_id/transcripts
/// Transcripts in creation order; the first is the original language.
pub async fn list_transcripts(
    State(state): State<AppState>,
    Path(audio_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transcript>>> {
    let user_id = require_user(&headers)?;
    let transcripts = state
        .store
        .list_transcripts(audio_id, Some(user_id))
        .await?;
    Ok(Json(transcripts))
}

/// GET /api/v1/transcripts/:transcript_id
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(transcript_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<TranscriptDetail>> {
    let user_id = require_user(&headers)?;
    let detail = state
        .store
        .transcript_detail(transcript_id, Some(user_id))
        .await?;
    Ok(Json(detail))
}

/// GET /api/v1/transcripts/:transcript_id/export?format=txt|srt
pub async fn export_transcript(
    State(state): State<AppState>,
    Path(transcript_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let user_id = require_user(&headers)?;
    let detail = state
        .store
        .transcript_detail(transcript_id, Some(user_id))
        .await?;

    let cues: Vec<Cue> = detail
        .segments
        .iter()
        .map(|view| Cue {
            start_secs: view.segment.start_secs,
            end_secs: view.segment.end_secs.unwrap_or(view.segment.start_secs),
            text: view.segment.text.clone(),
            speaker: view.speaker.as_ref().map(|s| s.name.clone()),
        })
        .collect();

    let format = query.format.as_deref().unwrap_or("txt");
    let (content, content_type, extension) = match format {
        "txt" => (
            cue::to_plain_text(&cues),
            "text/plain; charset=utf-8",
            "txt",
        ),
        "srt" => (
            cue::to_subtitle_text(&cues),
            "application/x-subrip; charset=utf-8",
            "srt",
        ),
        other => {
            return Err(Error::InvalidInput(format!(
                "unknown export format {other:?}; expected \"txt\" or \"srt\""
            )))
        }
    };

    Ok((
        StatusCode::OK,
        AppendHeaders(vec![
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"transcript-{transcript_id}.{extension}\""),
            ),
        ]),
        content,
    )
        .into_response())
}

/// PATCH /api/v1/segments/:segment_id
pub async fn update_segment(
    State(state): State<AppState>,
    Path(segment_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpdateSegmentRequest>,
) -> Result<Json<TranscriptSegment>> {
    let user_id = require_user(&headers)?;
    let segment = state
        .store
        .update_segment_text(segment_id, Some(user_id), req.text)
        .await?;
    Ok(Json(segment))
}

/// PATCH /api/v1/speakers/:speaker_id
/// The new name is visible on every referencing segment through the
/// relation; nothing is copied.
pub async fn rename_speaker(
    State(state): State<AppState>,
    Path(speaker_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<RenameSpeakerRequest>,
) -> Result<Json<Speaker>> {
    let user_id = require_user(&headers)?;
    let speaker = state
        .store
        .rename_speaker(speaker_id, Some(user_id), req.name)
        .await?;
    Ok(Json(speaker))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
