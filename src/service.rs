use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{SpeechError, SpeechResult};
use crate::languages::{needs_translation, Language, LanguageTable};
use crate::reporting::{ErrorReport, ErrorReporter};
use crate::translate::{LingvaTranslator, Translator};
use crate::tts::{
    PlaybackHandle, RemoteAudioClient, SpeechOptions, SpeechSynthesizer, TTSFactory, Voice,
};

/// Result handed back to the chat UI after translating a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageTranslation {
    pub original: String,
    pub translated: String,
    pub target_language: String,
    pub target_language_name: String,
}

/// States of one user-initiated translate-and-speak interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    Idle,
    Translating,
    TranslationFailed,
    Translated,
    Speaking,
    SpeakFailed,
    LocalFallbackSpeaking,
    Spoken,
    LocalFallbackFailed,
}

impl InteractionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::TranslationFailed | Self::Spoken | Self::LocalFallbackFailed
        )
    }

    pub fn can_transition_to(self, next: InteractionState) -> bool {
        use InteractionState::*;
        matches!(
            (self, next),
            (Idle, Translating)
                | (Translating, TranslationFailed)
                | (Translating, Translated)
                | (Translated, Speaking)
                | (Speaking, Spoken)
                | (Speaking, SpeakFailed)
                | (SpeakFailed, LocalFallbackSpeaking)
                | (LocalFallbackSpeaking, Spoken)
                | (LocalFallbackSpeaking, LocalFallbackFailed)
        )
    }
}

#[derive(Debug, Clone)]
pub struct InteractionOutcome {
    pub state: InteractionState,
    /// Every state visited, starting at `Idle`.
    pub path: Vec<InteractionState>,
    pub translation: Option<String>,
    /// The failure that ended the interaction, if it ended in a failed state.
    pub error: Option<SpeechError>,
    /// Set when the remote audio path was used.
    pub playback: Option<PlaybackHandle>,
}

struct Interaction {
    path: Vec<InteractionState>,
}

impl Interaction {
    fn new() -> Self {
        Self {
            path: vec![InteractionState::Idle],
        }
    }

    fn state(&self) -> InteractionState {
        *self.path.last().unwrap_or(&InteractionState::Idle)
    }

    fn advance(&mut self, next: InteractionState) {
        debug_assert!(
            self.state().can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state(),
            next
        );
        debug!("Interaction {:?} -> {:?}", self.state(), next);
        self.path.push(next);
    }

    fn finish(
        self,
        translation: Option<String>,
        error: Option<SpeechError>,
        playback: Option<PlaybackHandle>,
    ) -> InteractionOutcome {
        InteractionOutcome {
            state: self.state(),
            path: self.path,
            translation,
            error,
            playback,
        }
    }
}

async fn stop_displaced(previous: &PlaybackHandle) {
    if !previous.is_released() {
        debug!("Stopping playback {} for a new request", previous.id());
    }
    if let Err(e) = previous.stop().await {
        warn!("Error stopping previous playback {}: {}", previous.id(), e);
    }
}

/// Facade over translation, remote speech playback and the on-device synthesizer.
pub struct TranslationService {
    languages: Arc<LanguageTable>,
    translator: Arc<dyn Translator>,
    audio: Arc<RemoteAudioClient>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    reporter: Arc<dyn ErrorReporter>,
    preempt_previous: bool,
    current: Mutex<Option<PlaybackHandle>>,
}

impl TranslationService {
    pub fn new(
        languages: Arc<LanguageTable>,
        translator: Arc<dyn Translator>,
        audio: Arc<RemoteAudioClient>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            languages,
            translator,
            audio,
            synthesizer,
            reporter,
            preempt_previous: true,
            current: Mutex::new(None),
        }
    }

    /// Whether starting a remote playback stops the one already playing.
    pub fn with_preemption(mut self, preempt_previous: bool) -> Self {
        self.preempt_previous = preempt_previous;
        self
    }

    pub fn from_config(
        config: &Config,
        languages: Arc<LanguageTable>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> SpeechResult<Self> {
        let translator = Arc::new(LingvaTranslator::new(&config.translation_config)?);
        let backend = TTSFactory::create_audio_backend(
            &config.playback_config,
            &config.system_config.cache_dir,
        );
        let audio = Arc::new(RemoteAudioClient::new(&config.speech_config, backend)?);
        let synthesizer = TTSFactory::create_synthesizer(&config.local_speech_config);

        info!(
            "Translation service ready: translate={}, speech={}, playback={}",
            config.translation_config.base_url,
            config.speech_config.base_url,
            audio.backend_name()
        );

        Ok(Self::new(languages, translator, audio, synthesizer, reporter)
            .with_preemption(config.playback_config.preempt_previous))
    }

    pub fn is_language_supported(&self, code: &str) -> bool {
        self.languages.is_supported(code)
    }

    pub fn language_name(&self, code: &str) -> &'static str {
        self.languages.name(code)
    }

    pub fn supported_language_codes(&self) -> Vec<&'static str> {
        self.languages.codes()
    }

    pub fn search_languages(&self, query: &str) -> Vec<Language> {
        self.languages.search(query)
    }

    pub fn needs_translation(&self, source_lang: &str, target_lang: &str) -> bool {
        needs_translation(source_lang, target_lang)
    }

    fn validate_translation(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SpeechResult<()> {
        if text.trim().is_empty() {
            return Err(SpeechError::invalid_argument("Text cannot be empty"));
        }
        if source_lang.is_empty() || target_lang.is_empty() {
            return Err(SpeechError::invalid_argument(
                "Source and target languages are required",
            ));
        }
        for code in [source_lang, target_lang] {
            if !self.languages.is_supported(code) {
                return Err(SpeechError::unsupported_language(code));
            }
        }
        Ok(())
    }

    /// Translate text between two supported languages.
    pub async fn translate_text(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SpeechResult<String> {
        self.validate_translation(text, source_lang, target_lang)?;
        self.translator
            .translate(text, source_lang, target_lang)
            .await
            .map_err(|e| {
                error!("Translation error: {}", e);
                e
            })
    }

    pub async fn get_translation_only(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SpeechResult<String> {
        self.translate_text(text, source_lang, target_lang).await
    }

    pub async fn translate_message(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SpeechResult<MessageTranslation> {
        let translated = self.translate_text(text, source_lang, target_lang).await?;
        Ok(MessageTranslation {
            original: text.to_string(),
            translated,
            target_language: target_lang.to_string(),
            target_language_name: self.language_name(target_lang).to_string(),
        })
    }

    /// Translate, then speak the result remotely.
    ///
    /// Only translation failures are returned. A playback failure is reported
    /// through the error reporter and the translation is still returned.
    pub async fn translate_and_speak(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SpeechResult<String> {
        let (translated, _) = self
            .translate_and_speak_with_handle(text, source_lang, target_lang)
            .await?;
        Ok(translated)
    }

    /// Like [`Self::translate_and_speak`], also returning the playback this call started.
    pub(crate) async fn translate_and_speak_with_handle(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> SpeechResult<(String, Option<PlaybackHandle>)> {
        let translated = self.translate_text(text, source_lang, target_lang).await?;

        match self.play(target_lang, &translated).await {
            Ok(handle) => Ok((translated, Some(handle))),
            Err(e) => {
                self.reporter.report(ErrorReport::new(
                    "translate_and_speak",
                    &e,
                    Some(target_lang),
                ));
                Ok((translated, None))
            }
        }
    }

    /// Speak already-translated text remotely. Playback errors are returned.
    pub async fn speak_translated_text(
        &self,
        translated_text: &str,
        target_lang: &str,
    ) -> SpeechResult<PlaybackHandle> {
        if translated_text.trim().is_empty() || target_lang.trim().is_empty() {
            return Err(SpeechError::invalid_argument(
                "Translated text and target language are required",
            ));
        }
        self.play(target_lang, translated_text).await
    }

    async fn play(&self, language: &str, text: &str) -> SpeechResult<PlaybackHandle> {
        if self.preempt_previous {
            let previous = self.current.lock().await.take();
            if let Some(previous) = previous {
                stop_displaced(&previous).await;
            }
        }

        // The slot is not locked during the fetch; another request may have
        // installed its handle in the meantime.
        let handle = self.audio.play_remote_audio(language, text).await?;
        let displaced = self.current.lock().await.replace(handle.clone());

        if self.preempt_previous {
            if let Some(other) = displaced.filter(|h| h.id() != handle.id()) {
                stop_displaced(&other).await;
            }
        }
        Ok(handle)
    }

    /// The most recent remote playback, if it is still live.
    pub async fn current_playback(&self) -> Option<PlaybackHandle> {
        self.current
            .lock()
            .await
            .as_ref()
            .filter(|h| !h.is_released())
            .cloned()
    }

    /// Stop the current remote playback. Returns whether anything was playing.
    pub async fn stop_playback(&self) -> SpeechResult<bool> {
        let handle = self.current.lock().await.take();
        match handle {
            Some(handle) if !handle.is_released() => {
                self.audio.stop(&handle).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Speak on-device, without any network call.
    pub async fn speak_local(&self, text: &str, options: &SpeechOptions) -> SpeechResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::invalid_argument("Text must be a non-empty string"));
        }
        self.synthesizer.speak(text, options).await
    }

    pub async fn stop_speaking(&self) {
        if let Err(e) = self.synthesizer.stop().await {
            error!("Error stopping speech: {}", e);
        }
    }

    pub async fn pause_speaking(&self) {
        if let Err(e) = self.synthesizer.pause().await {
            error!("Error pausing speech: {}", e);
        }
    }

    pub async fn resume_speaking(&self) {
        if let Err(e) = self.synthesizer.resume().await {
            error!("Error resuming speech: {}", e);
        }
    }

    pub async fn is_speaking(&self) -> bool {
        match self.synthesizer.is_speaking().await {
            Ok(speaking) => speaking,
            Err(e) => {
                error!("Error checking speech status: {}", e);
                false
            }
        }
    }

    pub async fn available_voices(&self) -> Vec<Voice> {
        match self.synthesizer.voices().await {
            Ok(voices) => voices,
            Err(e) => {
                error!("Error getting voices: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn voices_for_language(&self, language_code: &str) -> Vec<Voice> {
        let prefix = language_code.to_lowercase();
        self.available_voices()
            .await
            .into_iter()
            .filter(|v| v.language.to_lowercase().starts_with(&prefix))
            .collect()
    }

    /// Run a full interaction: translate, speak remotely, fall back to local speech.
    pub async fn run_interaction(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> InteractionOutcome {
        let mut interaction = Interaction::new();

        interaction.advance(InteractionState::Translating);
        let translated = match self.translate_text(text, source_lang, target_lang).await {
            Ok(translated) => translated,
            Err(e) => {
                interaction.advance(InteractionState::TranslationFailed);
                return interaction.finish(None, Some(e), None);
            }
        };
        interaction.advance(InteractionState::Translated);

        interaction.advance(InteractionState::Speaking);
        let remote_error = match self.play(target_lang, &translated).await {
            Ok(handle) => {
                interaction.advance(InteractionState::Spoken);
                return interaction.finish(Some(translated), None, Some(handle));
            }
            Err(e) => e,
        };

        interaction.advance(InteractionState::SpeakFailed);
        self.reporter
            .report(ErrorReport::new("run_interaction", &remote_error, Some(target_lang)));

        interaction.advance(InteractionState::LocalFallbackSpeaking);
        let options = SpeechOptions::for_language(target_lang);
        match self.speak_local(&translated, &options).await {
            Ok(()) => {
                interaction.advance(InteractionState::Spoken);
                interaction.finish(Some(translated), None, None)
            }
            Err(e) => {
                interaction.advance(InteractionState::LocalFallbackFailed);
                interaction.finish(Some(translated), Some(e), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::RecentErrors;
    use crate::tts::{SilentAudioBackend, SilentStats, SilentSynthesizer};
    use async_trait::async_trait;
    use std::time::Duration;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct MuteSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for MuteSynthesizer {
        async fn speak(&self, _text: &str, _options: &SpeechOptions) -> SpeechResult<()> {
            Err(SpeechError::Synthesizer("no speech engine".to_string()))
        }

        async fn stop(&self) -> SpeechResult<()> {
            Err(SpeechError::Synthesizer("no speech engine".to_string()))
        }

        async fn pause(&self) -> SpeechResult<()> {
            Err(SpeechError::Synthesizer("no speech engine".to_string()))
        }

        async fn resume(&self) -> SpeechResult<()> {
            Err(SpeechError::Synthesizer("no speech engine".to_string()))
        }

        async fn is_speaking(&self) -> SpeechResult<bool> {
            Err(SpeechError::Synthesizer("no speech engine".to_string()))
        }

        async fn voices(&self) -> SpeechResult<Vec<Voice>> {
            Err(SpeechError::Synthesizer("no speech engine".to_string()))
        }
    }

    struct Fixture {
        service: TranslationService,
        stats: Arc<SilentStats>,
        synth: Arc<SilentSynthesizer>,
        errors: Arc<RecentErrors>,
    }

    fn fixture(server: &MockServer) -> Fixture {
        let backend = SilentAudioBackend::with_clip_duration(Duration::from_secs(60));
        let stats = backend.stats();
        let synth = Arc::new(SilentSynthesizer::new());
        let errors = Arc::new(RecentErrors::default());
        let service = build(server, Arc::new(backend), synth.clone(), errors.clone());
        Fixture {
            service,
            stats,
            synth,
            errors,
        }
    }

    fn build(
        server: &MockServer,
        backend: Arc<SilentAudioBackend>,
        synth: Arc<dyn SpeechSynthesizer>,
        errors: Arc<RecentErrors>,
    ) -> TranslationService {
        let translator = LingvaTranslator::with_timeout(&server.uri(), Duration::from_secs(2)).unwrap();
        let audio =
            RemoteAudioClient::with_timeout(&server.uri(), Duration::from_secs(2), "test", backend)
                .unwrap();
        TranslationService::new(
            Arc::new(LanguageTable::new()),
            Arc::new(translator),
            Arc::new(audio),
            synth,
            errors,
        )
    }

    async fn mount_translation(server: &MockServer, route: &str, translation: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "translation": translation })),
            )
            .mount(server)
            .await;
    }

    async fn mount_audio(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/api/v1/audio/.+"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_unsupported_language_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let f = fixture(&server);

        let err = f.service.translate_text("Hello", "en", "zz").await.unwrap_err();
        assert_eq!(err, SpeechError::unsupported_language("zz"));

        let err = f.service.translate_text("Hello", "xx", "es").await.unwrap_err();
        assert_eq!(err, SpeechError::unsupported_language("xx"));

        let err = f.service.translate_text(" ", "en", "es").await.unwrap_err();
        assert!(matches!(err, SpeechError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_translate_message_record() {
        let server = MockServer::start().await;
        mount_translation(&server, "/api/v1/en/de/Good%20night", "Gute Nacht").await;
        let f = fixture(&server);

        let record = f.service.translate_message("Good night", "en", "de").await.unwrap();
        assert_eq!(
            record,
            MessageTranslation {
                original: "Good night".to_string(),
                translated: "Gute Nacht".to_string(),
                target_language: "de".to_string(),
                target_language_name: "German".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_translate_and_speak_plays_translation() {
        let server = MockServer::start().await;
        mount_translation(&server, "/api/v1/en/es/Hello", "Hola").await;
        mount_audio(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "audio": [1, 2, 3] })),
        )
        .await;
        let f = fixture(&server);

        let translated = f.service.translate_and_speak("Hello", "en", "es").await.unwrap();
        assert_eq!(translated, "Hola");
        assert_eq!(f.stats.playing(), 1);
        assert_eq!(f.errors.total(), 0);

        let current = f.service.current_playback().await.unwrap();
        assert_eq!(current.language(), "es");
        assert!(f.service.stop_playback().await.unwrap());
        assert!(!f.service.stop_playback().await.unwrap());
        assert_eq!(f.stats.playing(), 0);
    }

    #[tokio::test]
    async fn test_translate_and_speak_survives_playback_failure() {
        let server = MockServer::start().await;
        mount_translation(&server, "/api/v1/en/es/Hello", "Hola").await;
        mount_audio(&server, ResponseTemplate::new(500)).await;
        let f = fixture(&server);

        let translated = f.service.translate_and_speak("Hello", "en", "es").await.unwrap();
        assert_eq!(translated, "Hola");

        let reports = f.errors.recent();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].operation, "translate_and_speak");
        assert_eq!(reports[0].kind, "network_error");
        assert_eq!(reports[0].language.as_deref(), Some("es"));
    }

    #[tokio::test]
    async fn test_translate_and_speak_propagates_translation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/en/es/Hello"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let f = fixture(&server);

        let err = f.service.translate_and_speak("Hello", "en", "es").await.unwrap_err();
        assert!(matches!(err, SpeechError::Network { status: Some(502), .. }));
        assert_eq!(f.stats.loaded(), 0);
    }

    #[tokio::test]
    async fn test_speak_translated_text_surfaces_errors() {
        let server = MockServer::start().await;
        mount_audio(&server, ResponseTemplate::new(200).set_body_json(serde_json::json!({}))).await;
        let f = fixture(&server);

        let err = f.service.speak_translated_text("Hola", "es").await.unwrap_err();
        assert!(matches!(err, SpeechError::Decode(_)));
        assert_eq!(f.errors.total(), 0);

        let err = f.service.speak_translated_text("", "es").await.unwrap_err();
        assert!(matches!(err, SpeechError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_new_playback_preempts_previous() {
        let server = MockServer::start().await;
        mount_audio(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "audio": [7] })),
        )
        .await;
        let f = fixture(&server);

        let first = f.service.speak_translated_text("uno", "es").await.unwrap();
        let second = f.service.speak_translated_text("dos", "es").await.unwrap();

        assert!(first.is_released());
        assert!(!second.is_released());
        assert_eq!(f.stats.playing(), 1);
        assert_eq!(f.service.current_playback().await.unwrap().id(), second.id());
    }

    #[tokio::test]
    async fn test_preemption_can_be_disabled() {
        let server = MockServer::start().await;
        mount_audio(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "audio": [7] })),
        )
        .await;
        let backend = Arc::new(SilentAudioBackend::with_clip_duration(Duration::from_secs(60)));
        let stats = backend.stats();
        let service = build(
            &server,
            backend,
            Arc::new(SilentSynthesizer::new()),
            Arc::new(RecentErrors::default()),
        )
        .with_preemption(false);

        let first = service.speak_translated_text("uno", "es").await.unwrap();
        let _second = service.speak_translated_text("dos", "es").await.unwrap();
        assert!(!first.is_released());
        assert_eq!(stats.playing(), 2);
    }

    #[tokio::test]
    async fn test_translate_and_speak_returns_its_own_playback() {
        let server = MockServer::start().await;
        mount_translation(&server, "/api/v1/en/es/One", "uno").await;
        mount_translation(&server, "/api/v1/en/es/Two", "dos").await;
        Mock::given(method("GET"))
            .and(path("/api/v1/audio/es/uno"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "audio": [7] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/audio/es/dos"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let service = build(
            &server,
            Arc::new(SilentAudioBackend::with_clip_duration(Duration::from_secs(60))),
            Arc::new(SilentSynthesizer::new()),
            Arc::new(RecentErrors::default()),
        )
        .with_preemption(false);

        let (translated, first) = service
            .translate_and_speak_with_handle("One", "en", "es")
            .await
            .unwrap();
        assert_eq!(translated, "uno");
        let first = first.unwrap();

        let (translated, second) = service
            .translate_and_speak_with_handle("Two", "en", "es")
            .await
            .unwrap();
        assert_eq!(translated, "dos");
        assert!(second.is_none());
        assert_eq!(service.current_playback().await.unwrap().id(), first.id());
    }

    #[tokio::test]
    async fn test_playback_slot_is_free_while_audio_downloads() {
        let server = MockServer::start().await;
        mount_audio(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "audio": [7] }))
                .set_delay(Duration::from_millis(800)),
        )
        .await;
        let f = fixture(&server);
        let service = Arc::new(f.service);

        let background = service.clone();
        let pending =
            tokio::spawn(async move { background.speak_translated_text("Hola", "es").await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let current = tokio::time::timeout(Duration::from_millis(300), service.current_playback())
            .await
            .unwrap();
        assert!(current.is_none());
        let stopped = tokio::time::timeout(Duration::from_millis(300), service.stop_playback())
            .await
            .unwrap()
            .unwrap();
        assert!(!stopped);

        let handle = pending.await.unwrap().unwrap();
        assert_eq!(service.current_playback().await.unwrap().id(), handle.id());
    }

    #[tokio::test]
    async fn test_concurrent_playbacks_keep_only_the_latest() {
        let server = MockServer::start().await;
        mount_audio(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "audio": [7] }))
                .set_delay(Duration::from_millis(100)),
        )
        .await;
        let f = fixture(&server);

        let (a, b) = tokio::join!(
            f.service.speak_translated_text("uno", "es"),
            f.service.speak_translated_text("dos", "es"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(f.stats.playing(), 1);
        assert!(a.is_released() ^ b.is_released());
    }

    #[tokio::test]
    async fn test_get_translation_only_does_not_speak() {
        let server = MockServer::start().await;
        mount_translation(&server, "/api/v1/en/it/Thanks", "Grazie").await;
        let f = fixture(&server);

        let translated = f.service.get_translation_only("Thanks", "en", "it").await.unwrap();
        assert_eq!(translated, "Grazie");
        assert_eq!(f.stats.loaded(), 0);
        assert!(f.synth.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_interaction_spoken_remotely() {
        let server = MockServer::start().await;
        mount_translation(&server, "/api/v1/en/fr/Hello", "Bonjour").await;
        mount_audio(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "audio": [1] })),
        )
        .await;
        let f = fixture(&server);

        let outcome = f.service.run_interaction("Hello", "en", "fr").await;
        assert_eq!(outcome.state, InteractionState::Spoken);
        assert_eq!(
            outcome.path,
            vec![
                InteractionState::Idle,
                InteractionState::Translating,
                InteractionState::Translated,
                InteractionState::Speaking,
                InteractionState::Spoken,
            ]
        );
        assert_eq!(outcome.translation.as_deref(), Some("Bonjour"));
        assert!(outcome.playback.is_some());
        assert!(f.synth.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_interaction_falls_back_to_local_speech() {
        let server = MockServer::start().await;
        mount_translation(&server, "/api/v1/en/fr/Hello", "Bonjour").await;
        mount_audio(&server, ResponseTemplate::new(503)).await;
        let f = fixture(&server);

        let outcome = f.service.run_interaction("Hello", "en", "fr").await;
        assert_eq!(outcome.state, InteractionState::Spoken);
        assert!(outcome.path.contains(&InteractionState::LocalFallbackSpeaking));
        assert!(outcome.error.is_none());

        let spoken = f.synth.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].0, "Bonjour");
        assert_eq!(spoken[0].1.language, "fr");
        assert_eq!(f.errors.recent()[0].operation, "run_interaction");
    }

    #[tokio::test]
    async fn test_interaction_fallback_failure_is_terminal() {
        let server = MockServer::start().await;
        mount_translation(&server, "/api/v1/en/fr/Hello", "Bonjour").await;
        mount_audio(&server, ResponseTemplate::new(503)).await;
        let service = build(
            &server,
            Arc::new(SilentAudioBackend::new()),
            Arc::new(MuteSynthesizer),
            Arc::new(RecentErrors::default()),
        );

        let outcome = service.run_interaction("Hello", "en", "fr").await;
        assert_eq!(outcome.state, InteractionState::LocalFallbackFailed);
        assert!(outcome.state.is_terminal());
        assert_eq!(outcome.translation.as_deref(), Some("Bonjour"));
        assert!(matches!(outcome.error, Some(SpeechError::Synthesizer(_))));
    }

    #[tokio::test]
    async fn test_interaction_translation_failure() {
        let server = MockServer::start().await;
        let f = fixture(&server);

        let outcome = f.service.run_interaction("Hello", "en", "zz").await;
        assert_eq!(outcome.state, InteractionState::TranslationFailed);
        assert_eq!(
            outcome.path,
            vec![
                InteractionState::Idle,
                InteractionState::Translating,
                InteractionState::TranslationFailed,
            ]
        );
        assert!(outcome.translation.is_none());
        assert_eq!(outcome.error, Some(SpeechError::unsupported_language("zz")));
    }

    #[tokio::test]
    async fn test_local_speech_and_voice_queries() {
        let server = MockServer::start().await;
        let f = fixture(&server);

        let err = f
            .service
            .speak_local("   ", &SpeechOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::InvalidArgument(_)));

        f.service
            .speak_local("  Hello there ", &SpeechOptions::default())
            .await
            .unwrap();
        assert_eq!(f.synth.spoken()[0].0, "Hello there");
        assert_eq!(f.synth.spoken()[0].1.rate, 0.9);

        assert_eq!(f.service.voices_for_language("EN").await.len(), 1);
        assert!(f.service.voices_for_language("es").await.is_empty());

        let muted = build(
            &server,
            Arc::new(SilentAudioBackend::new()),
            Arc::new(MuteSynthesizer),
            Arc::new(RecentErrors::default()),
        );
        assert!(muted.available_voices().await.is_empty());
        assert!(!muted.is_speaking().await);
        muted.stop_speaking().await;
        muted.pause_speaking().await;
        muted.resume_speaking().await;
    }

    #[tokio::test]
    async fn test_pause_and_resume_local_speech() {
        let server = MockServer::start().await;
        let f = fixture(&server);

        f.service
            .speak_local("Un momento", &SpeechOptions::for_language("es"))
            .await
            .unwrap();
        f.service.pause_speaking().await;
        assert!(f.synth.is_paused());
        f.service.resume_speaking().await;
        assert!(!f.synth.is_paused());
        assert_eq!((f.synth.pauses(), f.synth.resumes()), (1, 1));
    }

    #[test]
    fn test_state_machine_transitions() {
        use InteractionState::*;
        assert!(Idle.can_transition_to(Translating));
        assert!(SpeakFailed.can_transition_to(LocalFallbackSpeaking));
        assert!(!Translated.can_transition_to(LocalFallbackSpeaking));
        assert!(!Spoken.can_transition_to(Speaking));
        for terminal in [TranslationFailed, Spoken, LocalFallbackFailed] {
            assert!(terminal.is_terminal());
        }
        assert!(!SpeakFailed.is_terminal());
    }
}
