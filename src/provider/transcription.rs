use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Opaque provider-side job identifier, stored on the asset for later polls.
pub type JobHandle = String;

/// Where the provider should get the audio bytes from.
#[derive(Debug, Clone)]
pub enum AudioLocator {
    /// A URL the provider can fetch without authentication
    Url(String),
    /// Inline bytes, sent as a base64 data URI
    Inline { bytes: Vec<u8>, mime_type: String },
}

impl AudioLocator {
    fn to_wire(&self) -> String {
        match self {
            AudioLocator::Url(url) => url.clone(),
            AudioLocator::Inline { bytes, mime_type } => format!(
                "data:{};base64,{}",
                mime_type,
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        }
    }
}

/// Diarization speaker-count hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeakerCount {
    /// Let the provider decide; no speaker fields are sent at all
    #[default]
    Auto,
    Exact(u32),
    Range { min: Option<u32>, max: Option<u32> },
}

impl SpeakerCount {
    /// Build a hint from raw request fields. An exact count and a range
    /// bound are mutually exclusive.
    pub fn from_fields(num: Option<u32>, min: Option<u32>, max: Option<u32>) -> Result<Self> {
        match (num, min, max) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(Error::InvalidInput(
                "num_speakers cannot be combined with min_speakers/max_speakers".to_string(),
            )),
            (Some(n), None, None) => Ok(SpeakerCount::Exact(n)),
            (None, None, None) => Ok(SpeakerCount::Auto),
            (None, min, max) => Ok(SpeakerCount::Range { min, max }),
        }
    }
}

/// Options forwarded to the provider on submit. The task is always the base
/// transcribe operation; translation is a separate pass over the finished
/// transcript.
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Source language hint; `None` lets the provider auto-detect
    pub language_hint: Option<String>,
    pub diarize: bool,
    pub speaker_count: SpeakerCount,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            language_hint: None,
            diarize: true,
            speaker_count: SpeakerCount::Auto,
        }
    }
}

/// Provider-reported job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

/// One poll of a submitted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPoll {
    pub status: JobStatus,
    pub output: Option<ProviderOutput>,
    pub error: Option<String>,
}

/// One timed cue in provider output. The speaker label is an opaque
/// provider-assigned token (for example `SPEAKER_00`), not a display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCue {
    pub start: f64,
    pub end: Option<f64>,
    pub text: String,
    pub speaker: Option<String>,
}

/// Raw transcription result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOutput {
    pub text: String,
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<ProviderCue>,
}

/// Speech-to-text job API.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Submit a transcription job and return its handle. Must not mutate
    /// local state.
    async fn submit(&self, audio: AudioLocator, options: &SubmitOptions) -> Result<JobHandle>;

    /// Poll a previously submitted job once.
    async fn poll(&self, handle: &str) -> Result<JobPoll>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Build the provider input document. Speaker-count policy: an exact count
/// is sent alone, otherwise only the range bounds actually present are sent,
/// and auto sends no speaker field at all.
pub fn build_submit_input(audio: &AudioLocator, options: &SubmitOptions) -> Value {
    let mut input = json!({
        "audio": audio.to_wire(),
        "task": "transcribe",
        "diarise_audio": options.diarize,
    });

    if let Some(lang) = &options.language_hint {
        input["language"] = json!(lang);
    }

    match options.speaker_count {
        SpeakerCount::Auto => {}
        SpeakerCount::Exact(n) => {
            input["num_speakers"] = json!(n);
        }
        SpeakerCount::Range { min, max } => {
            if let Some(min) = min {
                input["min_speakers"] = json!(min);
            }
            if let Some(max) = max {
                input["max_speakers"] = json!(max);
            }
        }
    }

    input
}

/// HTTP implementation against the job-based STT service.
pub struct HttpTranscriptionProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

impl HttpTranscriptionProvider {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for HttpTranscriptionProvider {
    async fn submit(&self, audio: AudioLocator, options: &SubmitOptions) -> Result<JobHandle> {
        let input = build_submit_input(&audio, options);

        let response = self
            .client
            .post(format!("{}/v1/jobs", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "submit rejected with {status}: {body}"
            )));
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;

        info!("Submitted transcription job {}", submitted.id);
        Ok(submitted.id)
    }

    async fn poll(&self, handle: &str) -> Result<JobPoll> {
        let response = self
            .client
            .get(format!("{}/v1/jobs/{}", self.base_url, handle))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "poll of job {handle} rejected with {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Provider(e.to_string()))
    }

    fn name(&self) -> &str {
        "http-stt"
    }
}
