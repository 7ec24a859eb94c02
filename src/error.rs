use thiserror::Error;

pub type SpeechResult<T> = Result<T, SpeechError>;

/// Failures surfaced by the translation, playback and synthesis layers.
///
/// Validation variants (`InvalidArgument`, `UnsupportedLanguage`) are always
/// produced before any I/O is attempted.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpeechError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported language: {code}")]
    UnsupportedLanguage { code: String },

    #[error("Network error: {message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Translation service error: {0}")]
    TranslationService(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Speech synthesizer error: {0}")]
    Synthesizer(String),
}

impl SpeechError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn unsupported_language(code: impl Into<String>) -> Self {
        Self::UnsupportedLanguage { code: code.into() }
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Classify a reqwest failure. Body decoding problems count as transport
    /// failures here; callers that treat them as payload errors check first.
    pub fn from_reqwest(err: &reqwest::Error, what: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{} request timed out", what))
        } else if let Some(status) = err.status() {
            Self::http_status(status.as_u16(), format!("{} request failed: {}", what, err))
        } else {
            Self::transport(format!("{} request failed: {}", what, err))
        }
    }

    /// Stable identifier used in logs and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnsupportedLanguage { .. } => "unsupported_language",
            Self::Network { .. } => "network_error",
            Self::Timeout(_) => "timeout_error",
            Self::Decode(_) => "decode_error",
            Self::TranslationService(_) => "translation_service_error",
            Self::Playback(_) => "playback_error",
            Self::Synthesizer(_) => "synthesizer_error",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::UnsupportedLanguage { .. }
        )
    }
}
