pub mod config;
pub mod cue;
pub mod error;
pub mod http;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod recovery;
pub mod storage;
pub mod store;

pub use config::Config;
pub use cue::Cue;
pub use error::Error;
pub use http::{create_router, AppState};
pub use model::{
    AudioAsset, AudioStatus, Project, Speaker, Transcript, TranscriptDetail, TranscriptSegment,
};
pub use orchestrator::{Orchestrator, PollSettings, Task, TranscriptionRequest};
pub use provider::{
    AudioLocator, HttpTranscriptionProvider, HttpTranslationProvider, JobPoll, JobStatus,
    ProviderCue, ProviderOutput, SpeakerCount, SubmitOptions, TranscriptionProvider,
    TranslationProvider,
};
pub use recovery::sweep_stuck_assets;
pub use storage::FileStorage;
pub use store::{Store, TranscriptBundle};
