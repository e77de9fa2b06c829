use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an uploaded audio file with respect to transcription.
///
/// Transitions only move forward: `Uploaded -> Processing -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl AudioStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AudioStatus::Completed | AudioStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(self, next: AudioStatus) -> bool {
        matches!(
            (self, next),
            (AudioStatus::Uploaded, AudioStatus::Processing)
                | (AudioStatus::Processing, AudioStatus::Completed)
                | (AudioStatus::Processing, AudioStatus::Failed)
        )
    }
}

/// Minimal project record: the ownership boundary every asset lookup is
/// scoped by. Full project CRUD lives outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One uploaded audio file and its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioAsset {
    pub id: Uuid,
    pub project_id: Uuid,
    pub original_filename: String,
    pub stored_filename: String,
    pub size_bytes: u64,
    pub mime_type: String,

    /// Filled after processing, from the last cue's end time
    pub duration_secs: Option<f64>,

    pub status: AudioStatus,
    pub uploaded_at: DateTime<Utc>,

    /// Set exactly once, when status first becomes terminal
    pub processed_at: Option<DateTime<Utc>>,

    pub expires_at: Option<DateTime<Utc>>,

    /// Opaque provider job id, stored as soon as submit returns so a crash
    /// before polling leaves something the recovery sweep can resolve
    pub job_handle: Option<String>,

    pub deleted_at: Option<DateTime<Utc>>,
}

/// One completed transcription or translation run for an audio asset.
///
/// An asset may own several transcripts; the earliest by `created_at` is the
/// original-language one, later ones are translations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub language: String,
    pub word_count: usize,
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
}

/// One timed cue of text within a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: Uuid,
    pub transcript_id: Uuid,

    /// Zero-based, contiguous within a transcript, in provider-output order
    pub segment_index: usize,

    pub start_secs: f64,
    pub end_secs: Option<f64>,
    pub text: String,
    pub speaker_id: Option<Uuid>,
    pub confidence: Option<f32>,
    pub is_edited: bool,
}

/// One diarized voice identity within a single transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Speaker {
    pub id: Uuid,
    pub transcript_id: Uuid,

    /// User-editable display name, defaults to `Speaker N`
    pub name: String,

    /// 1-based, assigned in first-seen order while parsing
    pub display_order: u32,

    /// Cached count of segments referencing this speaker
    pub segment_count: usize,
}

/// A segment joined with its speaker, as returned by transcript queries.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentView {
    #[serde(flatten)]
    pub segment: TranscriptSegment,
    pub speaker: Option<Speaker>,
}

/// A transcript with its ordered segments and speakers.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptDetail {
    pub transcript: Transcript,
    pub segments: Vec<SegmentView>,
    pub speakers: Vec<Speaker>,
}
