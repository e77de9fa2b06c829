//! Startup reconciliation of jobs that were in flight when the process died.
//!
//! A crash between the `Processing` flip and the terminal transition leaves
//! an asset that nothing will ever resume. This sweep runs once at startup
//! and resolves each such asset against the provider's authoritative job
//! state. It only touches assets already `Processing`, so running it twice
//! with no provider-side change writes nothing the second time.

use crate::error::{Error, Result};
use crate::model::AudioStatus;
use crate::orchestrator::bundle_from_output;
use crate::provider::{JobStatus, TranscriptionProvider};
use crate::store::Store;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reconcile every asset stuck in `Processing`. Returns how many assets were
/// moved to a terminal state.
pub async fn sweep_stuck_assets(
    store: &Store,
    transcriber: &Arc<dyn TranscriptionProvider>,
) -> Result<usize> {
    let stuck = store.list_processing_assets().await;
    if stuck.is_empty() {
        info!("Recovery: no assets stuck in processing");
        return Ok(0);
    }

    warn!("Recovery: found {} asset(s) stuck in processing", stuck.len());
    let mut resolved = 0;

    for asset in stuck {
        let Some(handle) = asset.job_handle.clone() else {
            // Never submitted (or died before the handle was stored); there
            // is nothing external left to resolve it against
            warn!(
                "Recovery: asset {} has no job handle, marking failed",
                asset.id
            );
            store.set_status(asset.id, AudioStatus::Failed).await?;
            resolved += 1;
            continue;
        };

        match transcriber.poll(&handle).await {
            Ok(poll) => match poll.status {
                JobStatus::Succeeded => {
                    recover_succeeded(store, &asset.id, &handle, poll.output).await?;
                    resolved += 1;
                }
                JobStatus::Failed | JobStatus::Canceled => {
                    warn!(
                        "Recovery: job {} ended {:?}, marking asset {} failed",
                        handle, poll.status, asset.id
                    );
                    store.set_status(asset.id, AudioStatus::Failed).await?;
                    resolved += 1;
                }
                JobStatus::Pending | JobStatus::Running => {
                    info!(
                        "Recovery: job {} still {:?}, leaving asset {} as processing",
                        handle, poll.status, asset.id
                    );
                }
            },
            Err(e) => {
                // Fail safe: a visible failure beats an indefinitely stuck job
                let err = Error::Recovery(format!("job {handle}: {e}"));
                error!("Recovery: {} - marking asset {} failed", err, asset.id);
                store.set_status(asset.id, AudioStatus::Failed).await?;
                resolved += 1;
            }
        }
    }

    Ok(resolved)
}

/// A job the provider finished while we were down. Re-runs the full parse
/// and persistence so the asset ends up `Completed` *with* its transcript,
/// unless the crash already persisted one.
async fn recover_succeeded(
    store: &Store,
    asset_id: &uuid::Uuid,
    handle: &str,
    output: Option<crate::provider::ProviderOutput>,
) -> Result<()> {
    let asset_id = *asset_id;

    if !store.list_transcripts(asset_id, None).await?.is_empty() {
        // Crash happened between persisting the transcript and flipping the
        // status; the content is already there
        store.set_status(asset_id, AudioStatus::Completed).await?;
        info!(
            "Recovery: asset {} already had its transcript, marked completed",
            asset_id
        );
        return Ok(());
    }

    match output {
        Some(output) => {
            let bundle = bundle_from_output(asset_id, &output);
            let segment_count = bundle.segments.len();
            store.insert_transcript(bundle).await?;
            store.set_status(asset_id, AudioStatus::Completed).await?;
            info!(
                "Recovery: asset {} completed from job {} output ({} segments)",
                asset_id, handle, segment_count
            );
        }
        None => {
            // Succeeded but the output is gone; a completed asset with no
            // transcript would be worse than a visible failure
            warn!(
                "Recovery: job {} succeeded but its output is unavailable, marking asset {} failed",
                handle, asset_id
            );
            store.set_status(asset_id, AudioStatus::Failed).await?;
        }
    }

    Ok(())
}
