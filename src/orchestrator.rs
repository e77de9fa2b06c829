//! The transcription job state machine.
//!
//! One orchestration drives one audio asset through
//! `submit -> poll -> parse -> persist -> (optional translation) -> finalize`.
//! The caller-facing half (`start`) runs synchronously: preconditions, the
//! flip to `Processing`, and nothing slow. Everything after that executes in
//! a detached task whose outcome is only observable through the asset's
//! status field.

use crate::cue::{self, Cue};
use crate::error::{Error, Result};
use crate::model::{AudioStatus, Speaker, Transcript, TranscriptSegment};
use crate::provider::{
    AudioLocator, JobStatus, ProviderOutput, SpeakerCount, SubmitOptions, TranscriptionProvider,
    TranslationProvider,
};
use crate::store::{Store, TranscriptBundle};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

/// What kind of result the caller ultimately wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Task {
    #[default]
    Transcribe,
    /// Transcribe first, then chain a translation pass over the result
    Translate,
}

/// A validated request to process one audio asset.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionRequest {
    pub task: Task,
    pub language_hint: Option<String>,
    /// Required when `task` is `Translate`
    pub target_language: Option<String>,
    pub speaker_count: SpeakerCount,
}

/// Polling behavior for the detached drive: exponential backoff between
/// polls, bounded by a total elapsed deadline.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Store,
    transcriber: Arc<dyn TranscriptionProvider>,
    translator: Arc<dyn TranslationProvider>,
    poll: PollSettings,
}

impl Orchestrator {
    pub fn new(
        store: Store,
        transcriber: Arc<dyn TranscriptionProvider>,
        translator: Arc<dyn TranslationProvider>,
        poll: PollSettings,
    ) -> Self {
        Self {
            store,
            transcriber,
            translator,
            poll,
        }
    }

    /// Kick off processing of one asset.
    ///
    /// Validates the request, flips the asset to `Processing` (persisted
    /// before any slow call, so a crash leaves a marker for recovery), then
    /// detaches the rest of the pipeline and returns. Errors returned here
    /// reach the caller; errors after this point resolve to a `Failed`
    /// status instead.
    pub async fn start(
        &self,
        asset_id: Uuid,
        user_id: Uuid,
        request: TranscriptionRequest,
        audio: AudioLocator,
    ) -> Result<()> {
        if request.task == Task::Translate && request.target_language.is_none() {
            return Err(Error::InvalidInput(
                "target_language is required when task is translate".to_string(),
            ));
        }

        // Ownership and existence checks happen before any state change
        self.store.get_asset(asset_id, Some(user_id)).await?;

        self.store
            .set_status(asset_id, AudioStatus::Processing)
            .await?;

        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.drive(asset_id, request, audio).await {
                error!("Transcription of asset {} failed: {}", asset_id, e);
                if let Err(e) = this.store.set_status(asset_id, AudioStatus::Failed).await {
                    error!("Could not mark asset {} as failed: {}", asset_id, e);
                }
            }
        });

        Ok(())
    }

    /// The detached part of the pipeline. Any error returned from here is
    /// caught by the spawn wrapper and resolves the asset to `Failed`;
    /// translation failures are contained inside and never unwind the
    /// already-persisted original transcript.
    async fn drive(
        &self,
        asset_id: Uuid,
        request: TranscriptionRequest,
        audio: AudioLocator,
    ) -> Result<()> {
        let options = SubmitOptions {
            language_hint: request.language_hint.clone(),
            diarize: true,
            speaker_count: request.speaker_count,
        };

        let handle = self.transcriber.submit(audio, &options).await?;
        // Persist the handle immediately so recovery can resolve the job
        // even if we die before the first poll
        self.store.set_job_handle(asset_id, &handle).await?;
        info!("Asset {}: submitted as job {}", asset_id, handle);

        let output = self.poll_until_terminal(&handle).await?;

        let transcript = self.persist_output(asset_id, &output).await?;
        self.store
            .set_status(asset_id, AudioStatus::Completed)
            .await?;
        info!(
            "Asset {}: transcription completed, {} segments, language {}",
            asset_id,
            output.segments.len(),
            transcript.language
        );

        if request.task == Task::Translate {
            // Validated in start()
            let target = request.target_language.as_deref().unwrap_or_default();
            match self.translate_transcript(asset_id, transcript.id, target).await {
                Ok(translated) => info!(
                    "Asset {}: translation to {} completed as transcript {}",
                    asset_id, target, translated.id
                ),
                Err(e) => warn!(
                    "Asset {}: translation to {} failed, original transcript kept: {}",
                    asset_id, target, e
                ),
            }
        }

        Ok(())
    }

    /// Poll the job until the provider reports a terminal state, backing off
    /// exponentially. Hitting the elapsed deadline is a distinct `Timeout`
    /// failure, not a provider-reported one.
    async fn poll_until_terminal(&self, handle: &str) -> Result<ProviderOutput> {
        let deadline = Instant::now() + self.poll.max_elapsed;
        let mut interval = self.poll.initial_interval;

        loop {
            let poll = self.transcriber.poll(handle).await?;

            match poll.status {
                JobStatus::Succeeded => {
                    return poll.output.ok_or_else(|| {
                        Error::Provider(format!("job {handle} succeeded but has no output"))
                    });
                }
                JobStatus::Failed | JobStatus::Canceled => {
                    let message = poll
                        .error
                        .unwrap_or_else(|| format!("provider reported {:?}", poll.status));
                    return Err(Error::Provider(message));
                }
                JobStatus::Pending | JobStatus::Running => {}
            }

            if Instant::now() + interval > deadline {
                return Err(Error::Timeout(self.poll.max_elapsed.as_secs()));
            }
            sleep(interval).await;
            interval = (interval * 2).min(self.poll.max_interval);
        }
    }

    /// Parse provider output and persist the transcript bundle in one store
    /// write, then record the audio duration learned from the last cue.
    async fn persist_output(&self, asset_id: Uuid, output: &ProviderOutput) -> Result<Transcript> {
        let bundle = bundle_from_output(asset_id, output);
        let duration = bundle
            .segments
            .iter()
            .filter_map(|s| s.end_secs)
            .fold(None::<f64>, |acc, end| Some(acc.map_or(end, |a| a.max(end))));

        let transcript = self.store.insert_transcript(bundle).await?;
        if let Some(duration) = duration {
            self.store.set_duration(asset_id, duration).await?;
        }
        Ok(transcript)
    }

    /// The translation sub-pipeline: serialize the finished segments to cue
    /// text, translate, parse the result back, and persist a second
    /// transcript with its own copied speaker set.
    async fn translate_transcript(
        &self,
        asset_id: Uuid,
        transcript_id: Uuid,
        target_language: &str,
    ) -> Result<Transcript> {
        let detail = self.store.transcript_detail(transcript_id, None).await?;

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

        let serialized = cue::to_subtitle_text(&cues);
        let translated_text = self
            .translator
            .translate(&serialized, target_language)
            .await?;
        let translated_cues = cue::parse_subtitle_text(&translated_text)?;

        if translated_cues.len() != detail.segments.len() {
            warn!(
                "Translation returned {} cues for {} segments; extra cues are dropped",
                translated_cues.len(),
                detail.segments.len()
            );
        }

        let new_transcript_id = Uuid::new_v4();

        // Fresh speaker identities for the translated transcript, preserving
        // name, order, and cached counts
        let mut speaker_map: HashMap<Uuid, Uuid> = HashMap::new();
        let speakers: Vec<Speaker> = detail
            .speakers
            .iter()
            .map(|s| {
                let copied = Speaker {
                    id: Uuid::new_v4(),
                    transcript_id: new_transcript_id,
                    name: s.name.clone(),
                    display_order: s.display_order,
                    segment_count: s.segment_count,
                };
                speaker_map.insert(s.id, copied.id);
                copied
            })
            .collect();

        let segments: Vec<TranscriptSegment> = translated_cues
            .iter()
            .zip(detail.segments.iter())
            .enumerate()
            .map(|(index, (cue, original))| TranscriptSegment {
                id: Uuid::new_v4(),
                transcript_id: new_transcript_id,
                segment_index: index,
                start_secs: cue.start_secs,
                end_secs: Some(cue.end_secs),
                text: cue.text.clone(),
                speaker_id: original
                    .segment
                    .speaker_id
                    .and_then(|id| speaker_map.get(&id).copied()),
                confidence: None,
                is_edited: false,
            })
            .collect();

        let word_count = segments
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum();

        let transcript = Transcript {
            id: new_transcript_id,
            asset_id,
            language: target_language.to_string(),
            word_count,
            confidence: None,
            created_at: Utc::now(),
        };

        self.store
            .insert_transcript(TranscriptBundle {
                transcript,
                segments,
                speakers,
            })
            .await
    }
}

/// Convert provider output into a persistable bundle.
///
/// Speaker labels are deduplicated in first-seen order via a map local to
/// this one parsing pass; speakers get `Speaker N` names and 1-based display
/// order, and their cached segment counts are recomputed once all segments
/// exist.
pub fn bundle_from_output(asset_id: Uuid, output: &ProviderOutput) -> TranscriptBundle {
    let transcript_id = Uuid::new_v4();

    let transcript = Transcript {
        id: transcript_id,
        asset_id,
        language: output
            .language
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        word_count: output.text.split_whitespace().count(),
        confidence: None,
        created_at: Utc::now(),
    };

    let mut speakers: Vec<Speaker> = Vec::new();
    let mut label_to_speaker: HashMap<String, Uuid> = HashMap::new();

    let segments: Vec<TranscriptSegment> = output
        .segments
        .iter()
        .enumerate()
        .map(|(index, cue)| {
            let speaker_id = cue.speaker.as_ref().map(|label| {
                *label_to_speaker.entry(label.clone()).or_insert_with(|| {
                    let speaker = Speaker {
                        id: Uuid::new_v4(),
                        transcript_id,
                        name: format!("Speaker {}", speakers.len() + 1),
                        display_order: speakers.len() as u32 + 1,
                        segment_count: 0,
                    };
                    let id = speaker.id;
                    speakers.push(speaker);
                    id
                })
            });

            TranscriptSegment {
                id: Uuid::new_v4(),
                transcript_id,
                segment_index: index,
                start_secs: cue.start,
                end_secs: cue.end,
                text: cue.text.trim().to_string(),
                speaker_id,
                confidence: None,
                is_edited: false,
            }
        })
        .collect();

    for speaker in &mut speakers {
        speaker.segment_count = segments
            .iter()
            .filter(|s| s.speaker_id == Some(speaker.id))
            .count();
    }

    TranscriptBundle {
        transcript,
        segments,
        speakers,
    }
}
