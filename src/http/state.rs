use crate::orchestrator::Orchestrator;
use crate::storage::FileStorage;
use crate::store::Store;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub storage: FileStorage,
    pub orchestrator: Orchestrator,

    /// Base URL the transcription provider uses to fetch audio back from us
    pub public_url: String,

    /// Upload size cap, enforced on request bodies
    pub max_upload_bytes: usize,
}
