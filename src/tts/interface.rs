use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::SpeechResult;
use crate::languages::DEFAULT_SOURCE_LANGUAGE;

/// Encoded audio received from the speech endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl AudioClip {
    pub fn mpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "audio/mpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type {
            "audio/mpeg" => "mp3",
            "audio/wav" | "audio/x-wav" => "wav",
            "audio/ogg" => "ogg",
            _ => "bin",
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Resolves once playback of a sound has ended, naturally or because it was stopped.
pub type PlaybackCompletion = oneshot::Receiver<()>;

/// A decoded, loaded audio resource owned by exactly one playback handle.
#[async_trait]
pub trait Sound: Send {
    /// Start playback and hand back the completion notification.
    async fn play(&mut self) -> SpeechResult<PlaybackCompletion>;

    async fn stop(&mut self) -> SpeechResult<()>;

    /// Free the underlying resource. Must be safe to call more than once.
    async fn unload(&mut self) -> SpeechResult<()>;
}

/// Turns encoded audio into playable sounds.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn load(&self, clip: AudioClip) -> SpeechResult<Box<dyn Sound>>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceQuality {
    #[default]
    Default,
    Enhanced,
}

/// Options for the on-device synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOptions {
    pub language: String,
    pub pitch: f32,
    pub rate: f32,
    pub quality: VoiceQuality,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_SOURCE_LANGUAGE.to_string(),
            pitch: 1.0,
            rate: 0.9,
            quality: VoiceQuality::Default,
        }
    }
}

impl SpeechOptions {
    pub fn for_language(language: &str) -> Self {
        Self {
            language: language.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub identifier: String,
    pub name: String,
    pub language: String,
    pub quality: VoiceQuality,
}

/// On-device text-to-speech; no network involved.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Begin speaking `text`, replacing any utterance in progress.
    async fn speak(&self, text: &str, options: &SpeechOptions) -> SpeechResult<()>;

    async fn stop(&self) -> SpeechResult<()>;

    /// Suspend the current utterance. Nothing happens when nothing is speaking.
    async fn pause(&self) -> SpeechResult<()>;

    async fn resume(&self) -> SpeechResult<()>;

    async fn is_speaking(&self) -> SpeechResult<bool>;

    async fn voices(&self) -> SpeechResult<Vec<Voice>>;
}
