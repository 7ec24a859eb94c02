use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use super::interface::{TranslateRequest, TranslateResponse, Translator};
use crate::config::TranslationConfig;
use crate::error::{SpeechError, SpeechResult};

/// Client for a Lingva-compatible translation endpoint:
/// `GET {base}/api/v1/{source}/{target}/{text}`.
#[derive(Debug, Clone)]
pub struct LingvaTranslator {
    client: Client,
    base_url: String,
}

impl LingvaTranslator {
    pub fn new(config: &TranslationConfig) -> SpeechResult<Self> {
        Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> SpeechResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpeechError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_url(&self, request: &TranslateRequest) -> String {
        format!(
            "{}/api/v1/{}/{}/{}",
            self.base_url,
            urlencoding::encode(&request.source_lang),
            urlencoding::encode(&request.target_lang),
            urlencoding::encode(&request.text),
        )
    }

    async fn fetch(&self, request: &TranslateRequest) -> SpeechResult<String> {
        let url = self.endpoint_url(request);
        debug!(
            "Sending translation request: {} -> {}, {} chars",
            request.source_lang,
            request.target_lang,
            request.text.chars().count()
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SpeechError::from_reqwest(&e, "Translation"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::http_status(
                status.as_u16(),
                format!("HTTP {}: Translation request failed", status.as_u16()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SpeechError::from_reqwest(&e, "Translation"))?;

        let parsed: TranslateResponse = serde_json::from_slice(&body).map_err(|e| {
            SpeechError::transport(format!("Malformed translation response: {}", e))
        })?;

        match parsed {
            TranslateResponse {
                translation: Some(translation),
                ..
            } if !translation.is_empty() => Ok(translation),
            TranslateResponse {
                error: Some(message),
                ..
            } => Err(SpeechError::TranslationService(message)),
            _ => Err(SpeechError::TranslationService(
                "No translation received".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Translator for LingvaTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SpeechResult<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SpeechError::invalid_argument("Text cannot be empty"));
        }
        if source_lang.trim().is_empty() || target_lang.trim().is_empty() {
            return Err(SpeechError::invalid_argument(
                "Source and target languages are required",
            ));
        }

        if source_lang == target_lang {
            debug!("Source and target are both '{}', skipping translation", source_lang);
            return Ok(text.to_string());
        }

        let request = TranslateRequest {
            text: trimmed.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        };

        self.fetch(&request).await.map_err(|e| {
            error!("Translation error ({} -> {}): {}", source_lang, target_lang, e);
            e
        })
    }
}
