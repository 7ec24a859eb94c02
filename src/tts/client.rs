use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error, warn};

use super::interface::{AudioBackend, AudioClip};
use super::playback::PlaybackHandle;
use crate::config::SpeechConfig;
use crate::error::{SpeechError, SpeechResult};

const INVALID_AUDIO: &str = "Invalid audio data received from server";

/// Fetches synthesized speech from a Lingva-compatible audio endpoint
/// (`GET {base}/api/v1/audio/{lang}/{text}`) and plays it through an [`AudioBackend`].
pub struct RemoteAudioClient {
    client: Client,
    base_url: String,
    user_agent: String,
    backend: Arc<dyn AudioBackend>,
}

impl RemoteAudioClient {
    pub fn new(config: &SpeechConfig, backend: Arc<dyn AudioBackend>) -> SpeechResult<Self> {
        Self::with_timeout(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
            backend,
        )
    }

    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        user_agent: &str,
        backend: Arc<dyn AudioBackend>,
    ) -> SpeechResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpeechError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            backend,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Fetch audio for `text`, start playing it and return the live handle.
    ///
    /// The handle releases itself when playback finishes; callers may stop it earlier.
    pub async fn play_remote_audio(
        &self,
        language_code: &str,
        text: &str,
    ) -> SpeechResult<PlaybackHandle> {
        let language = language_code.trim();
        let text = text.trim();
        if language.is_empty() || text.is_empty() {
            return Err(SpeechError::invalid_argument("Language and text are required"));
        }

        self.play(language, text).await.map_err(|e| {
            error!("Remote audio playback error ({}): {}", language, e);
            e
        })
    }

    async fn play(&self, language: &str, text: &str) -> SpeechResult<PlaybackHandle> {
        let clip = self.fetch_audio(language, text).await?;
        let sound = self.backend.load(clip).await.map_err(into_playback_error)?;
        let handle = PlaybackHandle::new(language, sound);

        if let Err(e) = handle.start().await {
            if let Err(cleanup) = handle.release().await {
                warn!("Error cleaning up sound {}: {}", handle.id(), cleanup);
            }
            return Err(into_playback_error(e));
        }

        debug!("Started playback {} ({})", handle.id(), language);
        Ok(handle)
    }

    async fn fetch_audio(&self, language: &str, text: &str) -> SpeechResult<AudioClip> {
        let url = format!(
            "{}/api/v1/audio/{}/{}",
            self.base_url,
            urlencoding::encode(language),
            urlencoding::encode(text),
        );
        debug!("Requesting speech audio: lang={}, {} chars", language, text.chars().count());

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| SpeechError::from_reqwest(&e, "Audio"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::http_status(
                status.as_u16(),
                format!("HTTP {}: Failed to fetch audio", status.as_u16()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SpeechError::from_reqwest(&e, "Audio"))?;

        decode_audio_payload(&body)
    }

    /// Stop a playback and release it. Already-released handles are ignored.
    pub async fn stop(&self, handle: &PlaybackHandle) -> SpeechResult<()> {
        handle.stop().await
    }
}

/// Decode `{"audio": [byte, ...]}` into an MPEG clip.
pub fn decode_audio_payload(body: &[u8]) -> SpeechResult<AudioClip> {
    let payload: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| SpeechError::Decode(INVALID_AUDIO.to_string()))?;

    let values = payload
        .get("audio")
        .and_then(|v| v.as_array())
        .ok_or_else(|| SpeechError::Decode(INVALID_AUDIO.to_string()))?;

    let bytes = values
        .iter()
        .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| SpeechError::Decode(INVALID_AUDIO.to_string()))?;

    if bytes.is_empty() {
        return Err(SpeechError::Decode(INVALID_AUDIO.to_string()));
    }

    Ok(AudioClip::mpeg(bytes))
}

fn into_playback_error(err: SpeechError) -> SpeechError {
    match err {
        SpeechError::Playback(_)
        | SpeechError::Decode(_)
        | SpeechError::Network { .. }
        | SpeechError::Timeout(_) => err,
        other => SpeechError::Playback(other.to_string()),
    }
}
