use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Text-to-text translation API. Input and output are subtitle-formatted
/// cue text (see [`crate::cue`]); the provider is expected to preserve the
/// cue structure and translate only the text lines.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(&self, cue_text: &str, target_language: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// HTTP implementation against the translation service.
pub struct HttpTranslationProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    text: String,
}

impl HttpTranslationProvider {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }
}

#[async_trait]
impl TranslationProvider for HttpTranslationProvider {
    async fn translate(&self, cue_text: &str, target_language: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/translate", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&json!({
                "text": cue_text,
                "target_language": target_language,
            }))
            .send()
            .await
            .map_err(|e| Error::Translation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Translation(format!(
                "translate rejected with {status}: {body}"
            )));
        }

        let translated: TranslateResponse = response
            .json()
            .await
            .map_err(|e| Error::Translation(e.to_string()))?;
        Ok(translated.text)
    }

    fn name(&self) -> &str {
        "http-translate"
    }
}
