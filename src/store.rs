use crate::error::{Error, Result};
use crate::model::{
    AudioAsset, AudioStatus, Project, SegmentView, Speaker, Transcript, TranscriptDetail,
    TranscriptSegment,
};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// How long an uploaded file is retained before it is eligible for expiry
const UPLOAD_TTL_HOURS: i64 = 1;

/// A transcript with its children, persisted in one store write so a reader
/// never observes a half-populated transcript.
#[derive(Debug, Clone)]
pub struct TranscriptBundle {
    pub transcript: Transcript,
    pub segments: Vec<TranscriptSegment>,
    pub speakers: Vec<Speaker>,
}

/// In-memory record store standing in for the relational collaborator.
///
/// All access goes through this narrow interface; callers that act on behalf
/// of a user pass `Some(user_id)` and only see records whose owning project
/// belongs to that user. Internal callers (orchestrator, recovery) pass
/// `None`.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    projects: HashMap<Uuid, Project>,
    assets: HashMap<Uuid, AudioAsset>,
    transcripts: HashMap<Uuid, Transcript>,
    segments: HashMap<Uuid, TranscriptSegment>,
    speakers: HashMap<Uuid, Speaker>,
}

impl Tables {
    fn visible_asset(&self, asset_id: Uuid, owner: Option<Uuid>) -> Result<&AudioAsset> {
        let asset = self
            .assets
            .get(&asset_id)
            .filter(|a| a.deleted_at.is_none())
            .ok_or(Error::NotFound("audio file"))?;

        if let Some(user_id) = owner {
            let project = self
                .projects
                .get(&asset.project_id)
                .filter(|p| p.deleted_at.is_none())
                .ok_or(Error::NotFound("audio file"))?;
            if project.owner_id != user_id {
                return Err(Error::NotFound("audio file"));
            }
        }

        Ok(asset)
    }

    fn visible_transcript(&self, transcript_id: Uuid, owner: Option<Uuid>) -> Result<&Transcript> {
        let transcript = self
            .transcripts
            .get(&transcript_id)
            .ok_or(Error::NotFound("transcript"))?;
        // Ownership is resolved through the owning asset's project
        self.visible_asset(transcript.asset_id, owner)
            .map_err(|_| Error::NotFound("transcript"))?;
        Ok(transcript)
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Projects
    // ========================================================================

    pub async fn create_project(&self, owner_id: Uuid, name: String) -> Project {
        let project = Project {
            id: Uuid::new_v4(),
            owner_id,
            name,
            created_at: Utc::now(),
            deleted_at: None,
        };

        let mut tables = self.inner.write().await;
        tables.projects.insert(project.id, project.clone());
        project
    }

    pub async fn get_project(&self, project_id: Uuid, owner_id: Uuid) -> Result<Project> {
        let tables = self.inner.read().await;
        tables
            .projects
            .get(&project_id)
            .filter(|p| p.deleted_at.is_none() && p.owner_id == owner_id)
            .cloned()
            .ok_or(Error::NotFound("project"))
    }

    // ========================================================================
    // Audio assets
    // ========================================================================

    /// Create an asset record for a freshly stored upload. The file expires
    /// one hour after upload unless processing extends its life.
    pub async fn create_asset(
        &self,
        project_id: Uuid,
        owner_id: Uuid,
        original_filename: String,
        stored_filename: String,
        size_bytes: u64,
        mime_type: String,
    ) -> Result<AudioAsset> {
        let mut tables = self.inner.write().await;

        tables
            .projects
            .get(&project_id)
            .filter(|p| p.deleted_at.is_none() && p.owner_id == owner_id)
            .ok_or(Error::NotFound("project"))?;

        let now = Utc::now();
        let asset = AudioAsset {
            id: Uuid::new_v4(),
            project_id,
            original_filename,
            stored_filename,
            size_bytes,
            mime_type,
            duration_secs: None,
            status: AudioStatus::Uploaded,
            uploaded_at: now,
            processed_at: None,
            expires_at: Some(now + Duration::hours(UPLOAD_TTL_HOURS)),
            job_handle: None,
            deleted_at: None,
        };

        tables.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    pub async fn get_asset(&self, asset_id: Uuid, owner: Option<Uuid>) -> Result<AudioAsset> {
        let tables = self.inner.read().await;
        tables.visible_asset(asset_id, owner).cloned()
    }

    /// List a project's assets, newest upload first.
    pub async fn list_assets(&self, project_id: Uuid, owner_id: Uuid) -> Result<Vec<AudioAsset>> {
        let tables = self.inner.read().await;

        tables
            .projects
            .get(&project_id)
            .filter(|p| p.deleted_at.is_none() && p.owner_id == owner_id)
            .ok_or(Error::NotFound("project"))?;

        let mut assets: Vec<AudioAsset> = tables
            .assets
            .values()
            .filter(|a| a.project_id == project_id && a.deleted_at.is_none())
            .cloned()
            .collect();
        assets.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(assets)
    }

    /// Soft-delete an asset. Returns the record so the caller can purge the
    /// underlying bytes as a side effect.
    pub async fn soft_delete_asset(&self, asset_id: Uuid, owner_id: Uuid) -> Result<AudioAsset> {
        let mut tables = self.inner.write().await;
        tables.visible_asset(asset_id, Some(owner_id))?;

        let asset = tables
            .assets
            .get_mut(&asset_id)
            .ok_or(Error::NotFound("audio file"))?;
        asset.deleted_at = Some(Utc::now());
        Ok(asset.clone())
    }

    /// Advance an asset's status. Illegal transitions are rejected, and
    /// `processed_at` is stamped exactly once, on the first terminal move.
    pub async fn set_status(&self, asset_id: Uuid, status: AudioStatus) -> Result<AudioAsset> {
        let mut tables = self.inner.write().await;
        let asset = tables
            .assets
            .get_mut(&asset_id)
            .filter(|a| a.deleted_at.is_none())
            .ok_or(Error::NotFound("audio file"))?;

        if !asset.status.can_transition_to(status) {
            return Err(Error::Conflict(asset.status, status));
        }

        asset.status = status;
        if status.is_terminal() && asset.processed_at.is_none() {
            asset.processed_at = Some(Utc::now());
        }
        Ok(asset.clone())
    }

    pub async fn set_job_handle(&self, asset_id: Uuid, handle: &str) -> Result<()> {
        let mut tables = self.inner.write().await;
        let asset = tables
            .assets
            .get_mut(&asset_id)
            .ok_or(Error::NotFound("audio file"))?;
        asset.job_handle = Some(handle.to_string());
        Ok(())
    }

    pub async fn set_duration(&self, asset_id: Uuid, duration_secs: f64) -> Result<()> {
        let mut tables = self.inner.write().await;
        let asset = tables
            .assets
            .get_mut(&asset_id)
            .ok_or(Error::NotFound("audio file"))?;
        asset.duration_secs = Some(duration_secs);
        Ok(())
    }

    /// Assets the recovery sweep must reconcile: everything left `Processing`.
    pub async fn list_processing_assets(&self) -> Vec<AudioAsset> {
        let tables = self.inner.read().await;
        tables
            .assets
            .values()
            .filter(|a| a.status == AudioStatus::Processing && a.deleted_at.is_none())
            .cloned()
            .collect()
    }

    // ========================================================================
    // Transcripts
    // ========================================================================

    /// Insert a transcript with all of its segments and speakers under one
    /// write-lock acquisition, so the bundle is either fully visible or not
    /// at all.
    pub async fn insert_transcript(&self, bundle: TranscriptBundle) -> Result<Transcript> {
        let mut tables = self.inner.write().await;

        tables
            .assets
            .get(&bundle.transcript.asset_id)
            .ok_or(Error::NotFound("audio file"))?;

        let transcript = bundle.transcript.clone();
        tables
            .transcripts
            .insert(transcript.id, bundle.transcript);
        for speaker in bundle.speakers {
            tables.speakers.insert(speaker.id, speaker);
        }
        for segment in bundle.segments {
            tables.segments.insert(segment.id, segment);
        }
        Ok(transcript)
    }

    /// An asset's transcripts in creation order; the first is the
    /// original-language run, any later ones are translations.
    pub async fn list_transcripts(
        &self,
        asset_id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<Vec<Transcript>> {
        let tables = self.inner.read().await;
        tables.visible_asset(asset_id, owner)?;

        let mut transcripts: Vec<Transcript> = tables
            .transcripts
            .values()
            .filter(|t| t.asset_id == asset_id)
            .cloned()
            .collect();
        transcripts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(transcripts)
    }

    /// Full transcript view: segments in index order with their speakers
    /// embedded, speakers in display order.
    pub async fn transcript_detail(
        &self,
        transcript_id: Uuid,
        owner: Option<Uuid>,
    ) -> Result<TranscriptDetail> {
        let tables = self.inner.read().await;
        let transcript = tables.visible_transcript(transcript_id, owner)?.clone();

        let mut segments: Vec<SegmentView> = tables
            .segments
            .values()
            .filter(|s| s.transcript_id == transcript_id)
            .map(|s| SegmentView {
                segment: s.clone(),
                speaker: s.speaker_id.and_then(|id| tables.speakers.get(&id).cloned()),
            })
            .collect();
        segments.sort_by_key(|v| v.segment.segment_index);

        let mut speakers: Vec<Speaker> = tables
            .speakers
            .values()
            .filter(|s| s.transcript_id == transcript_id)
            .cloned()
            .collect();
        speakers.sort_by_key(|s| s.display_order);

        Ok(TranscriptDetail {
            transcript,
            segments,
            speakers,
        })
    }

    /// Replace a segment's text and flag it as user-edited.
    pub async fn update_segment_text(
        &self,
        segment_id: Uuid,
        owner: Option<Uuid>,
        text: String,
    ) -> Result<TranscriptSegment> {
        let mut tables = self.inner.write().await;

        let transcript_id = tables
            .segments
            .get(&segment_id)
            .map(|s| s.transcript_id)
            .ok_or(Error::NotFound("segment"))?;
        tables
            .visible_transcript(transcript_id, owner)
            .map_err(|_| Error::NotFound("segment"))?;

        let segment = tables
            .segments
            .get_mut(&segment_id)
            .ok_or(Error::NotFound("segment"))?;
        segment.text = text;
        segment.is_edited = true;
        Ok(segment.clone())
    }

    /// Rename a speaker. Segments reference speakers by id, so the new name
    /// is visible on every segment without touching them.
    pub async fn rename_speaker(
        &self,
        speaker_id: Uuid,
        owner: Option<Uuid>,
        name: String,
    ) -> Result<Speaker> {
        let mut tables = self.inner.write().await;

        let transcript_id = tables
            .speakers
            .get(&speaker_id)
            .map(|s| s.transcript_id)
            .ok_or(Error::NotFound("speaker"))?;
        tables
            .visible_transcript(transcript_id, owner)
            .map_err(|_| Error::NotFound("speaker"))?;

        let speaker = tables
            .speakers
            .get_mut(&speaker_id)
            .ok_or(Error::NotFound("speaker"))?;
        speaker.name = name;
        Ok(speaker.clone())
    }
}
