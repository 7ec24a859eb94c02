use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;

use super::interface::{
    AudioBackend, AudioClip, PlaybackCompletion, Sound, SpeechOptions, SpeechSynthesizer, Voice,
    VoiceQuality,
};
use crate::error::SpeechResult;

/// Counters shared by a silent backend and every sound it produced.
#[derive(Debug, Default)]
pub struct SilentStats {
    loaded: AtomicUsize,
    playing: AtomicUsize,
    released: AtomicUsize,
}

impl SilentStats {
    pub fn loaded(&self) -> usize {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Sounds currently playing.
    pub fn playing(&self) -> usize {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// Audio backend for headless hosts: sounds "play" for a fixed duration without output.
#[derive(Debug, Clone, Default)]
pub struct SilentAudioBackend {
    clip_duration: Duration,
    stats: Arc<SilentStats>,
}

impl SilentAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip_duration(clip_duration: Duration) -> Self {
        Self {
            clip_duration,
            stats: Arc::new(SilentStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SilentStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl AudioBackend for SilentAudioBackend {
    async fn load(&self, clip: AudioClip) -> SpeechResult<Box<dyn Sound>> {
        debug!("Silent backend loaded {} bytes of {}", clip.len(), clip.mime_type);
        self.stats.loaded.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SilentSound {
            duration: self.clip_duration,
            stats: self.stats.clone(),
            stop_tx: None,
            playing: Arc::new(AtomicBool::new(false)),
            unloaded: false,
        }))
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

struct SilentSound {
    duration: Duration,
    stats: Arc<SilentStats>,
    stop_tx: Option<oneshot::Sender<()>>,
    playing: Arc<AtomicBool>,
    unloaded: bool,
}

fn mark_stopped(playing: &AtomicBool, stats: &SilentStats) {
    if playing.swap(false, Ordering::SeqCst) {
        stats.playing.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Sound for SilentSound {
    async fn play(&mut self) -> SpeechResult<PlaybackCompletion> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);
        self.playing.store(true, Ordering::SeqCst);
        self.stats.playing.fetch_add(1, Ordering::SeqCst);

        let duration = self.duration;
        let playing = self.playing.clone();
        let stats = self.stats.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = stop_rx => {}
            }
            mark_stopped(&playing, &stats);
            let _ = done_tx.send(());
        });

        Ok(done_rx)
    }

    async fn stop(&mut self) -> SpeechResult<()> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        mark_stopped(&self.playing, &self.stats);
        Ok(())
    }

    async fn unload(&mut self) -> SpeechResult<()> {
        self.stop().await?;
        if !self.unloaded {
            self.unloaded = true;
            self.stats.released.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Synthesizer that records utterances instead of speaking them.
#[derive(Debug, Default)]
pub struct SilentSynthesizer {
    spoken: Mutex<Vec<(String, SpeechOptions)>>,
    paused: AtomicBool,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl SilentSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<(String, SpeechOptions)> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn speak(&self, text: &str, options: &SpeechOptions) -> SpeechResult<()> {
        debug!("Silent synthesizer speaking {} chars in {}", text.len(), options.language);
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push((text.to_string(), options.clone()));
        }
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> SpeechResult<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> SpeechResult<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> SpeechResult<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_speaking(&self) -> SpeechResult<bool> {
        Ok(false)
    }

    async fn voices(&self) -> SpeechResult<Vec<Voice>> {
        Ok(vec![Voice {
            identifier: "silent".to_string(),
            name: "Silent".to_string(),
            language: "en".to_string(),
            quality: VoiceQuality::Default,
        }])
    }
}
