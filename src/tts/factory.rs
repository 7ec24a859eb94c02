use std::sync::Arc;

use tracing::info;

use super::command::CommandAudioBackend;
use super::interface::{AudioBackend, SpeechSynthesizer};
use super::local::CommandSynthesizer;
use super::silent::{SilentAudioBackend, SilentSynthesizer};
use crate::config::{BackendKind, LocalSpeechConfig, PlaybackConfig};

/// Factory for the audio output and on-device speech engines
pub struct TTSFactory;

impl TTSFactory {
    /// Create the backend that plays remote speech clips.
    ///
    /// # Arguments
    /// * `playback_config` - Playback section of the configuration
    /// * `cache_dir` - Directory for clip files used by command players
    pub fn create_audio_backend(
        playback_config: &PlaybackConfig,
        cache_dir: &str,
    ) -> Arc<dyn AudioBackend> {
        match playback_config.backend {
            BackendKind::Command => {
                info!(
                    "Initializing audio backend: {} {:?}",
                    playback_config.program, playback_config.args
                );
                Arc::new(CommandAudioBackend::new(
                    playback_config.program.clone(),
                    playback_config.args.clone(),
                    cache_dir,
                ))
            }
            BackendKind::Silent => {
                info!("Initializing audio backend: silent");
                Arc::new(SilentAudioBackend::new())
            }
        }
    }

    /// Create the on-device synthesizer used for local speech and fallback.
    pub fn create_synthesizer(local_config: &LocalSpeechConfig) -> Arc<dyn SpeechSynthesizer> {
        match local_config.backend {
            BackendKind::Command => {
                info!("Initializing local speech synthesizer: {}", local_config.program);
                Arc::new(CommandSynthesizer::new(
                    local_config.program.clone(),
                    local_config.args.clone(),
                    local_config.enhanced_args.clone(),
                    local_config.voices_args.clone(),
                ))
            }
            BackendKind::Silent => {
                info!("Initializing local speech synthesizer: silent");
                Arc::new(SilentSynthesizer::new())
            }
        }
    }
}
