use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use super::decode::decode_clip;
use super::interface::{AudioBackend, AudioClip, PlaybackCompletion, Sound};
use crate::error::{SpeechError, SpeechResult};

/// Plays clips through an external player process (`ffplay`, `mpg123`, ...).
///
/// Clips are decoded once in-process so unplayable audio fails at load time.
/// Each clip is then written to the cache directory; the file lives until the sound is unloaded.
#[derive(Debug, Clone)]
pub struct CommandAudioBackend {
    program: String,
    args: Vec<String>,
    cache_dir: PathBuf,
}

impl CommandAudioBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cache_dir: cache_dir.into(),
        }
    }
}

#[async_trait]
impl AudioBackend for CommandAudioBackend {
    async fn load(&self, clip: AudioClip) -> SpeechResult<Box<dyn Sound>> {
        let clip = std::sync::Arc::new(clip);
        let probe = clip.clone();
        let decoded = tokio::task::spawn_blocking(move || decode_clip(&probe))
            .await
            .map_err(|e| SpeechError::Playback(format!("Audio decode task failed: {}", e)))??;
        debug!(
            "Decoded clip: {:.2}s, {} Hz, {} channel(s)",
            decoded.duration().as_secs_f32(),
            decoded.sample_rate,
            decoded.channels
        );

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| SpeechError::Playback(format!("Failed to create audio cache: {}", e)))?;

        let path = self
            .cache_dir
            .join(format!("{}.{}", Uuid::new_v4().as_simple(), clip.extension()));
        tokio::fs::write(&path, &clip.bytes)
            .await
            .map_err(|e| SpeechError::Playback(format!("Failed to write audio clip: {}", e)))?;
        debug!("Wrote {} audio bytes to {:?}", clip.len(), path);

        Ok(Box::new(CommandSound {
            program: self.program.clone(),
            args: self.args.clone(),
            path,
            kill_tx: None,
            unloaded: false,
        }))
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

struct CommandSound {
    program: String,
    args: Vec<String>,
    path: PathBuf,
    kill_tx: Option<oneshot::Sender<()>>,
    unloaded: bool,
}

#[async_trait]
impl Sound for CommandSound {
    async fn play(&mut self) -> SpeechResult<PlaybackCompletion> {
        if self.unloaded {
            return Err(SpeechError::Playback("Sound has been unloaded".to_string()));
        }
        if self.kill_tx.is_some() {
            return Err(SpeechError::Playback("Sound is already playing".to_string()));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SpeechError::Playback(format!(
                    "Failed to start audio player '{}': {}",
                    self.program, e
                ))
            })?;

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel();
        let program = self.program.clone();

        tokio::spawn(async move {
            let killed = tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) if !status.success() => {
                            warn!("Audio player '{}' exited with {}", program, status);
                        }
                        Err(e) => warn!("Failed waiting on audio player '{}': {}", program, e),
                        _ => {}
                    }
                    false
                }
                _ = kill_rx => true,
            };
            if killed {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill audio player '{}': {}", program, e);
                }
            }
            let _ = done_tx.send(());
        });

        self.kill_tx = Some(kill_tx);
        Ok(done_rx)
    }

    async fn stop(&mut self) -> SpeechResult<()> {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
        Ok(())
    }

    async fn unload(&mut self) -> SpeechResult<()> {
        self.stop().await?;
        if self.unloaded {
            return Ok(());
        }
        self.unloaded = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed audio clip: {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SpeechError::Playback(format!(
                "Failed to remove audio clip {:?}: {}",
                self.path, e
            ))),
        }
    }
}

impl Drop for CommandSound {
    fn drop(&mut self) {
        if !self.unloaded {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
