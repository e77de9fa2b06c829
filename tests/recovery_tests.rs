// Tests for the startup sweep that reconciles assets left in `processing`
// by a crash.

mod common;

use anyhow::Result;
use audioscribe::model::AudioStatus;
use audioscribe::orchestrator::bundle_from_output;
use audioscribe::provider::TranscriptionProvider;
use audioscribe::recovery::sweep_stuck_assets;
use audioscribe::store::Store;
use common::*;
use std::sync::Arc;
use uuid::Uuid;

fn provider(mock: MockTranscriber) -> Arc<dyn TranscriptionProvider> {
    Arc::new(mock)
}

/// Seed an asset that looks like an in-flight job at crash time.
async fn seed_stuck(store: &Store, handle: Option<&str>) -> Uuid {
    let seeded = seed_asset(store).await;
    store
        .set_status(seeded.asset.id, AudioStatus::Processing)
        .await
        .expect("uploaded -> processing");
    if let Some(handle) = handle {
        store
            .set_job_handle(seeded.asset.id, handle)
            .await
            .expect("asset exists");
    }
    seeded.asset.id
}

#[tokio::test]
async fn test_sweep_with_nothing_stuck_is_a_no_op() -> Result<()> {
    let store = Store::new();
    seed_asset(&store).await; // Uploaded, not Processing

    let transcriber = provider(MockTranscriber::unreachable());
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_asset_without_handle_is_marked_failed() -> Result<()> {
    let store = Store::new();
    let asset_id = seed_stuck(&store, None).await;

    let transcriber = provider(MockTranscriber::unreachable());
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 1);

    let asset = store.get_asset(asset_id, None).await?;
    expect_status(&asset, AudioStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn test_succeeded_job_is_fully_recovered() -> Result<()> {
    let store = Store::new();
    let asset_id = seed_stuck(&store, Some("job-crashed-1")).await;

    let transcriber = provider(MockTranscriber::scripted(vec![succeeded(
        diarized_output(),
    )]));
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 1);

    // Completed with a fresh terminal timestamp and the transcript persisted
    let asset = store.get_asset(asset_id, None).await?;
    expect_status(&asset, AudioStatus::Completed);
    assert!(asset.processed_at.is_some());

    let transcripts = store.list_transcripts(asset_id, None).await?;
    assert_eq!(transcripts.len(), 1);
    let detail = store.transcript_detail(transcripts[0].id, None).await?;
    assert_eq!(detail.segments.len(), 3);
    assert_eq!(detail.speakers.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_job_marks_asset_failed() -> Result<()> {
    let store = Store::new();
    let asset_id = seed_stuck(&store, Some("job-crashed-2")).await;

    let transcriber = provider(MockTranscriber::scripted(vec![failed("out of memory")]));
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 1);

    let asset = store.get_asset(asset_id, None).await?;
    expect_status(&asset, AudioStatus::Failed);
    assert!(store.list_transcripts(asset_id, None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_still_running_job_is_left_alone() -> Result<()> {
    let store = Store::new();
    let asset_id = seed_stuck(&store, Some("job-crashed-3")).await;

    let transcriber = provider(MockTranscriber::never_finishes());
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 0);

    let asset = store.get_asset(asset_id, None).await?;
    expect_status(&asset, AudioStatus::Processing);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_provider_fails_the_asset() -> Result<()> {
    let store = Store::new();
    let asset_id = seed_stuck(&store, Some("job-crashed-4")).await;

    let transcriber = provider(MockTranscriber::unreachable());
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 1);

    let asset = store.get_asset(asset_id, None).await?;
    expect_status(&asset, AudioStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn test_succeeded_job_with_missing_output_fails_the_asset() -> Result<()> {
    let store = Store::new();
    let asset_id = seed_stuck(&store, Some("job-crashed-5")).await;

    let transcriber = provider(MockTranscriber::scripted(vec![succeeded_without_output()]));
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 1);

    let asset = store.get_asset(asset_id, None).await?;
    expect_status(&asset, AudioStatus::Failed);
    assert!(store.list_transcripts(asset_id, None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_crash_after_persist_flips_status_without_duplicating() -> Result<()> {
    let store = Store::new();
    let asset_id = seed_stuck(&store, Some("job-crashed-6")).await;

    // Simulate a crash between persisting the transcript and the status flip
    store
        .insert_transcript(bundle_from_output(asset_id, &diarized_output()))
        .await?;

    let transcriber = provider(MockTranscriber::scripted(vec![succeeded(
        diarized_output(),
    )]));
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 1);

    let asset = store.get_asset(asset_id, None).await?;
    expect_status(&asset, AudioStatus::Completed);
    // Still exactly one transcript
    assert_eq!(store.list_transcripts(asset_id, None).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_sweep_is_idempotent() -> Result<()> {
    let store = Store::new();
    let asset_id = seed_stuck(&store, Some("job-crashed-7")).await;

    let transcriber = provider(MockTranscriber::scripted(vec![succeeded(
        diarized_output(),
    )]));
    assert_eq!(sweep_stuck_assets(&store, &transcriber).await?, 1);

    // Everything is terminal now, so a second sweep finds nothing
    let again = provider(MockTranscriber::unreachable());
    assert_eq!(sweep_stuck_assets(&store, &again).await?, 0);
    assert_eq!(store.list_transcripts(asset_id, None).await?.len(), 1);
    Ok(())
}
