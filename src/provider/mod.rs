//! Clients for the external speech providers.
//!
//! Both services are opaque HTTP collaborators: speech-to-text is an
//! asynchronous job API (submit, then poll a job handle), translation is a
//! synchronous text-in/text-out call. Neither client retries or mutates
//! local state; retry, backoff, and persistence policy live in the
//! orchestrator.

mod transcription;
mod translation;

pub use transcription::{
    build_submit_input, AudioLocator, HttpTranscriptionProvider, JobHandle, JobPoll, JobStatus,
    ProviderCue, ProviderOutput, SpeakerCount, SubmitOptions, TranscriptionProvider,
};
pub use translation::{HttpTranslationProvider, TranslationProvider};
