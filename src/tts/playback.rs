use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use super::interface::{PlaybackCompletion, Sound};
use crate::error::{SpeechError, SpeechResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Loaded,
    Playing,
    Released,
}

struct HandleInner {
    id: Uuid,
    language: String,
    sound: Mutex<Option<Box<dyn Sound>>>,
    state: watch::Sender<PlaybackState>,
}

/// Shared reference to one loaded sound.
///
/// Every clone points at the same resource. Once released the sound is gone
/// and further `stop`/`release` calls are no-ops.
#[derive(Clone)]
pub struct PlaybackHandle {
    inner: Arc<HandleInner>,
}

impl PlaybackHandle {
    pub(crate) fn new(language: &str, sound: Box<dyn Sound>) -> Self {
        let (state, _) = watch::channel(PlaybackState::Loaded);
        Self {
            inner: Arc::new(HandleInner {
                id: Uuid::new_v4(),
                language: language.to_string(),
                sound: Mutex::new(Some(sound)),
                state,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn language(&self) -> &str {
        &self.inner.language
    }

    pub fn state(&self) -> PlaybackState {
        *self.inner.state.borrow()
    }

    pub fn is_released(&self) -> bool {
        self.state() == PlaybackState::Released
    }

    /// Start playback. The resource is released automatically when playback ends.
    pub(crate) async fn start(&self) -> SpeechResult<()> {
        let completion = {
            let mut guard = self.inner.sound.lock().await;
            let sound = guard
                .as_mut()
                .ok_or_else(|| SpeechError::Playback("Sound has already been released".to_string()))?;
            sound.play().await?
        };
        self.inner.state.send_replace(PlaybackState::Playing);
        self.release_on_completion(completion);
        Ok(())
    }

    fn release_on_completion(&self, completion: PlaybackCompletion) {
        let handle = self.clone();
        tokio::spawn(async move {
            // A dropped sender also means the sound is done
            let _ = completion.await;
            debug!("Playback {} finished", handle.id());
            if let Err(e) = handle.release().await {
                warn!("Failed to release finished playback {}: {}", handle.id(), e);
            }
        });
    }

    /// Unload the sound. Returns `false` if it had already been released.
    pub async fn release(&self) -> SpeechResult<bool> {
        let sound = self.inner.sound.lock().await.take();
        match sound {
            Some(mut sound) => {
                let result = sound.unload().await;
                self.inner.state.send_replace(PlaybackState::Released);
                result.map(|_| true)
            }
            None => Ok(false),
        }
    }

    /// Stop playback and release the sound; tolerant of repeated calls.
    pub async fn stop(&self) -> SpeechResult<()> {
        let sound = self.inner.sound.lock().await.take();
        let Some(mut sound) = sound else {
            debug!("Playback {} already released", self.id());
            return Ok(());
        };

        if let Err(e) = sound.stop().await {
            warn!("Error stopping playback {}: {}", self.id(), e);
        }
        let result = sound.unload().await;
        self.inner.state.send_replace(PlaybackState::Released);
        result
    }

    /// Wait until the sound has been released, by completion or by `stop`.
    pub async fn finished(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|state| *state == PlaybackState::Released).await;
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("id", &self.inner.id)
            .field("language", &self.inner.language)
            .field("state", &self.state())
            .finish()
    }
}
