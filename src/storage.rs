use crate::error::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

/// Upload types the transcription provider accepts
const ALLOWED_MIME_TYPES: &[&str] = &[
    "audio/mpeg",   // MP3
    "audio/wav",    // WAV
    "audio/x-wav",  // WAV (alternative)
    "audio/mp4",    // M4A
    "audio/x-m4a",  // M4A (alternative)
    "audio/flac",   // FLAC
    "audio/x-flac", // FLAC (alternative)
];

const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac"];

/// Durable byte storage for uploaded audio, rooted at one upload directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (and create if missing) the upload directory.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).await?;
            info!("Created upload directory: {}", root.display());
        }
        Ok(Self { root })
    }

    /// Whether an upload is acceptable, by MIME type or file extension.
    pub fn is_allowed(original_filename: &str, mime_type: &str) -> bool {
        if ALLOWED_MIME_TYPES.contains(&mime_type) {
            return true;
        }
        extension(original_filename)
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Generate a unique on-disk name: `timestamp-uuid-sanitized.ext`.
    pub fn stored_filename(original_filename: &str) -> String {
        let ext = extension(original_filename).unwrap_or_else(|| "bin".to_string());
        let stem = Path::new(original_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");
        let sanitized: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        format!(
            "{}-{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            sanitized,
            ext
        )
    }

    pub fn path(&self, stored_filename: &str) -> PathBuf {
        self.root.join(stored_filename)
    }

    pub async fn save(&self, stored_filename: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.path(stored_filename), bytes).await?;
        Ok(())
    }

    pub async fn read(&self, stored_filename: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path(stored_filename)).await?)
    }

    pub async fn exists(&self, stored_filename: &str) -> bool {
        fs::try_exists(self.path(stored_filename))
            .await
            .unwrap_or(false)
    }

    pub async fn size(&self, stored_filename: &str) -> Result<u64> {
        Ok(fs::metadata(self.path(stored_filename)).await?.len())
    }

    pub async fn delete(&self, stored_filename: &str) -> Result<()> {
        let path = self.path(stored_filename);
        if fs::try_exists(&path).await.unwrap_or(false) {
            fs::remove_file(&path).await?;
            info!("Deleted stored file: {}", stored_filename);
        }
        Ok(())
    }
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
