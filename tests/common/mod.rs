#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use talktraverse_speech::config::BackendKind;
use talktraverse_speech::reporting::RecentErrors;
use talktraverse_speech::translate::LingvaTranslator;
use talktraverse_speech::tts::{RemoteAudioClient, SilentAudioBackend, SilentStats, SilentSynthesizer};
use talktraverse_speech::{build_app, AppState, Config, LanguageTable, TranslationService};

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub stats: Arc<SilentStats>,
    pub synth: Arc<SilentSynthesizer>,
}

pub fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.translation_config.base_url = server.uri();
    config.speech_config.base_url = server.uri();
    config.playback_config.backend = BackendKind::Silent;
    config.local_speech_config.backend = BackendKind::Silent;
    config
}

/// App wired to `server` for both endpoints; clips "play" for a minute unless stopped.
pub fn test_app(server: &MockServer) -> TestApp {
    let config = test_config(server);
    let languages = Arc::new(LanguageTable::new());
    let errors = Arc::new(RecentErrors::default());
    let backend = SilentAudioBackend::with_clip_duration(Duration::from_secs(60));
    let stats = backend.stats();
    let synth = Arc::new(SilentSynthesizer::new());

    let translator = LingvaTranslator::new(&config.translation_config).unwrap();
    let audio = RemoteAudioClient::new(&config.speech_config, Arc::new(backend)).unwrap();
    let service = TranslationService::new(
        languages.clone(),
        Arc::new(translator),
        Arc::new(audio),
        synth.clone(),
        errors.clone(),
    );

    let state = AppState::with_service(config, languages, Arc::new(service), errors);
    TestApp {
        app: build_app(state.clone()),
        state,
        stats,
        synth,
    }
}

pub async fn mount_translation(server: &MockServer, route: &str, translation: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translation": translation })),
        )
        .mount(server)
        .await;
}

pub async fn mount_audio(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/audio/.+"))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}
