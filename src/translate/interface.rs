use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SpeechResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

/// Body returned by the translation endpoint: either a translation or a service error.
#[derive(Debug, Default, Deserialize)]
pub struct TranslateResponse {
    pub translation: Option<String>,
    pub error: Option<String>,
}

/// Remote text translation.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` into `target_lang`.
    ///
    /// Identical language codes return `text` unchanged without a network call.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SpeechResult<String>;
}
