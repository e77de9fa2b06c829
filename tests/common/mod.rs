// Shared test fixtures: scripted provider mocks and store seeding helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use audioscribe::error::{Error, Result};
use audioscribe::model::{AudioAsset, AudioStatus};
use audioscribe::provider::{
    AudioLocator, JobHandle, JobPoll, JobStatus, ProviderCue, ProviderOutput, SubmitOptions,
    TranscriptionProvider, TranslationProvider,
};
use audioscribe::store::Store;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// A transcription provider that replays a scripted sequence of polls and
/// records what was submitted.
pub struct MockTranscriber {
    polls: Mutex<VecDeque<JobPoll>>,
    /// Served once the scripted polls run out
    default_poll: Option<JobPoll>,
    /// When true, every poll fails as a provider/network error
    fail_polls: bool,
    pub submits: Mutex<Vec<SubmitOptions>>,
    pub poll_count: AtomicUsize,
}

impl MockTranscriber {
    pub fn scripted(polls: Vec<JobPoll>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
            default_poll: None,
            fail_polls: false,
            submits: Mutex::new(Vec::new()),
            poll_count: AtomicUsize::new(0),
        }
    }

    /// Always reports the job as still running.
    pub fn never_finishes() -> Self {
        Self {
            polls: Mutex::new(VecDeque::new()),
            default_poll: Some(running()),
            fail_polls: false,
            submits: Mutex::new(Vec::new()),
            poll_count: AtomicUsize::new(0),
        }
    }

    /// Every poll errors out, as if the provider were unreachable.
    pub fn unreachable() -> Self {
        Self {
            polls: Mutex::new(VecDeque::new()),
            default_poll: None,
            fail_polls: true,
            submits: Mutex::new(Vec::new()),
            poll_count: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for MockTranscriber {
    async fn submit(&self, _audio: AudioLocator, options: &SubmitOptions) -> Result<JobHandle> {
        self.submits.lock().unwrap().push(options.clone());
        Ok("job-mock-1".to_string())
    }

    async fn poll(&self, _handle: &str) -> Result<JobPoll> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_polls {
            return Err(Error::Provider("connection refused".to_string()));
        }
        if let Some(poll) = self.polls.lock().unwrap().pop_front() {
            return Ok(poll);
        }
        self.default_poll
            .clone()
            .ok_or_else(|| Error::Provider("mock poll script exhausted".to_string()))
    }

    fn name(&self) -> &str {
        "mock-stt"
    }
}

/// A translation provider that either echoes its input, returns a canned
/// response, or fails.
pub enum MockTranslator {
    Echo,
    Fixed(String),
    Fail,
}

#[async_trait]
impl TranslationProvider for MockTranslator {
    async fn translate(&self, cue_text: &str, _target_language: &str) -> Result<String> {
        match self {
            MockTranslator::Echo => Ok(cue_text.to_string()),
            MockTranslator::Fixed(response) => Ok(response.clone()),
            MockTranslator::Fail => Err(Error::Translation("model overloaded".to_string())),
        }
    }

    fn name(&self) -> &str {
        "mock-translate"
    }
}

// ============================================================================
// Scripted poll builders
// ============================================================================

pub fn pending() -> JobPoll {
    JobPoll {
        status: JobStatus::Pending,
        output: None,
        error: None,
    }
}

pub fn running() -> JobPoll {
    JobPoll {
        status: JobStatus::Running,
        output: None,
        error: None,
    }
}

pub fn succeeded(output: ProviderOutput) -> JobPoll {
    JobPoll {
        status: JobStatus::Succeeded,
        output: Some(output),
        error: None,
    }
}

pub fn succeeded_without_output() -> JobPoll {
    JobPoll {
        status: JobStatus::Succeeded,
        output: None,
        error: None,
    }
}

pub fn failed(message: &str) -> JobPoll {
    JobPoll {
        status: JobStatus::Failed,
        output: None,
        error: Some(message.to_string()),
    }
}

pub fn canceled() -> JobPoll {
    JobPoll {
        status: JobStatus::Canceled,
        output: None,
        error: None,
    }
}

/// Three cues with speaker labels [A, B, A]: two distinct speakers, the
/// first owning segments 0 and 2.
pub fn diarized_output() -> ProviderOutput {
    ProviderOutput {
        text: "Hello there. Hi. How are you?".to_string(),
        language: Some("en".to_string()),
        segments: vec![
            ProviderCue {
                start: 0.0,
                end: Some(1.5),
                text: "Hello there.".to_string(),
                speaker: Some("SPEAKER_A".to_string()),
            },
            ProviderCue {
                start: 1.5,
                end: Some(2.25),
                text: "Hi.".to_string(),
                speaker: Some("SPEAKER_B".to_string()),
            },
            ProviderCue {
                start: 2.5,
                end: Some(4.0),
                text: "How are you?".to_string(),
                speaker: Some("SPEAKER_A".to_string()),
            },
        ],
    }
}

// ============================================================================
// Store seeding
// ============================================================================

pub struct Seeded {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub asset: AudioAsset,
}

/// Create a user/project/asset chain ready for orchestration.
pub async fn seed_asset(store: &Store) -> Seeded {
    let user_id = Uuid::new_v4();
    let project = store.create_project(user_id, "test project".to_string()).await;
    let asset = store
        .create_asset(
            project.id,
            user_id,
            "meeting.wav".to_string(),
            "1700000000000-abc-meeting.wav".to_string(),
            1000,
            "audio/wav".to_string(),
        )
        .await
        .expect("seeding asset should succeed");

    Seeded {
        user_id,
        project_id: project.id,
        asset,
    }
}

/// Poll the store until the asset reaches a terminal status.
pub async fn wait_for_terminal(store: &Store, asset_id: Uuid) -> AudioAsset {
    for _ in 0..400 {
        let asset = store
            .get_asset(asset_id, None)
            .await
            .expect("asset should exist");
        if asset.status.is_terminal() {
            return asset;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("asset never reached a terminal status");
}

/// Poll the store until the asset owns `count` transcripts.
pub async fn wait_for_transcripts(store: &Store, asset_id: Uuid, count: usize) {
    for _ in 0..400 {
        let transcripts = store
            .list_transcripts(asset_id, None)
            .await
            .expect("asset should exist");
        if transcripts.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("asset never reached {count} transcripts");
}

/// Fast polling for tests: millisecond intervals, short deadline.
pub fn fast_poll_settings() -> audioscribe::PollSettings {
    audioscribe::PollSettings {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(4),
        max_elapsed: Duration::from_millis(250),
    }
}

pub fn expect_status(asset: &AudioAsset, status: AudioStatus) {
    assert_eq!(
        asset.status, status,
        "asset {} should be {:?}",
        asset.id, status
    );
}
