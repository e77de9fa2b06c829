use anyhow::Result;
use audioscribe::{
    create_router, sweep_stuck_assets, AppState, Config, FileStorage, HttpTranscriptionProvider,
    HttpTranslationProvider, Orchestrator, PollSettings, Store, TranscriptionProvider,
    TranslationProvider,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "audioscribe", about = "Audio transcription and translation service")]
struct Args {
    /// Config file base name, as understood by the config crate
    #[arg(long, default_value = "config/audioscribe")]
    config: String,

    /// Run the recovery sweep and exit without serving HTTP
    #[arg(long)]
    recover_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);

    let store = Store::new();
    let storage = FileStorage::new(&cfg.storage.upload_dir).await?;

    let transcriber: Arc<dyn TranscriptionProvider> = Arc::new(HttpTranscriptionProvider::new(
        cfg.transcription.base_url.clone(),
        cfg.transcription.api_token.clone(),
    ));
    let translator: Arc<dyn TranslationProvider> = Arc::new(HttpTranslationProvider::new(
        cfg.translation.base_url.clone(),
        cfg.translation.api_token.clone(),
    ));

    info!(
        "Providers: transcription={}, translation={}",
        transcriber.name(),
        translator.name()
    );

    let orchestrator = Orchestrator::new(
        store.clone(),
        Arc::clone(&transcriber),
        translator,
        PollSettings {
            initial_interval: Duration::from_secs(cfg.transcription.poll_interval_secs),
            max_interval: Duration::from_secs(cfg.transcription.poll_max_interval_secs),
            max_elapsed: Duration::from_secs(cfg.transcription.poll_timeout_secs),
        },
    );

    // Repair anything a previous run left in flight before taking traffic
    let resolved = sweep_stuck_assets(&store, &transcriber).await?;
    if resolved > 0 {
        info!("Recovery sweep resolved {} asset(s)", resolved);
    }
    if args.recover_only {
        return Ok(());
    }

    let state = AppState {
        store,
        storage,
        orchestrator,
        public_url: cfg.service.http.public_url.clone(),
        max_upload_bytes: (cfg.storage.max_file_size_mb * 1024 * 1024) as usize,
    };

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, create_router(state)).await?;

    Ok(())
}
