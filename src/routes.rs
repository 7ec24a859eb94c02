use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::SpeechError;
use crate::languages::{DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE};
use crate::service::InteractionOutcome;
use crate::state::AppState;
use crate::tts::SpeechOptions;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/languages", get(list_languages))
        .route("/api/languages/:code", get(get_language))
        .route("/api/translate", post(translate))
        .route("/api/translate-and-speak", post(translate_and_speak))
        .route("/api/interaction", post(run_interaction))
        .route("/api/speak", post(speak_remote))
        .route("/api/speak/stop", post(stop_remote))
        .route("/api/speak/local", post(speak_local))
        .route("/api/speak/local/stop", post(stop_local))
        .route("/api/speak/local/pause", post(pause_local))
        .route("/api/speak/local/resume", post(resume_local))
        .route("/api/voices", get(list_voices))
}

/// Error body: `{"error": {"kind": ..., "message": ...}}`
pub enum ApiError {
    Speech(SpeechError),
    Busy(String),
}

impl From<SpeechError> for ApiError {
    fn from(err: SpeechError) -> Self {
        Self::Speech(err)
    }
}

pub fn status_for(err: &SpeechError) -> StatusCode {
    match err {
        SpeechError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        SpeechError::UnsupportedLanguage { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SpeechError::Network { .. }
        | SpeechError::Decode(_)
        | SpeechError::TranslationService(_) => StatusCode::BAD_GATEWAY,
        SpeechError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        SpeechError::Playback(_) | SpeechError::Synthesizer(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_json(err: &SpeechError) -> Value {
    json!({ "kind": err.kind(), "message": err.to_string() })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Speech(err) => {
                if !err.is_validation() {
                    warn!("Request failed ({}): {}", err.kind(), err);
                }
                (status_for(&err), Json(json!({ "error": error_json(&err) }))).into_response()
            }
            ApiError::Busy(message) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": { "kind": "busy", "message": message } })),
            )
                .into_response(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslateBody {
    pub text: Option<String>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub message_id: Option<String>,
}

impl TranslateBody {
    fn parts(&self) -> Result<(&str, &str, &str), SpeechError> {
        let text = self
            .text
            .as_deref()
            .ok_or_else(|| SpeechError::invalid_argument("Text cannot be empty"))?;
        Ok((
            text,
            self.source_lang.as_deref().unwrap_or(DEFAULT_SOURCE_LANGUAGE),
            self.target_lang.as_deref().unwrap_or(DEFAULT_TARGET_LANGUAGE),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct SpeakBody {
    pub text: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocalSpeakBody {
    pub text: Option<String>,
    #[serde(flatten)]
    pub options: SpeechOptions,
}

#[derive(Debug, Deserialize)]
pub struct LanguageQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoiceQuery {
    pub language: Option<String>,
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let current = state.service.current_playback().await;
    Json(json!({
        "status": "ok",
        "languages": state.languages.len(),
        "playback": current.map(|h| json!({ "id": h.id(), "language": h.language(), "state": h.state() })),
        "suppressed_errors": state.suppressed_errors.total(),
        "recent_errors": state.suppressed_errors.recent(),
    }))
}

async fn list_languages(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
) -> Json<Value> {
    let languages = state.service.search_languages(query.q.as_deref().unwrap_or(""));
    Json(json!(languages))
}

async fn get_language(State(state): State<AppState>, Path(code): Path<String>) -> Json<Value> {
    Json(json!({
        "code": code,
        "name": state.service.language_name(&code),
        "supported": state.service.is_language_supported(&code),
    }))
}

async fn translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateBody>,
) -> Result<Json<Value>, ApiError> {
    let (text, source, target) = body.parts()?;
    let record = state.service.translate_message(text, source, target).await?;
    Ok(Json(json!({
        "translation": record,
        "needs_translation": state.service.needs_translation(source, target),
    })))
}

async fn translate_and_speak(
    State(state): State<AppState>,
    Json(body): Json<TranslateBody>,
) -> Result<Json<Value>, ApiError> {
    let (text, source, target) = body.parts()?;
    let (translated, playback) = state
        .service
        .translate_and_speak_with_handle(text, source, target)
        .await?;
    Ok(Json(json!({
        "translated": translated,
        "playback_id": playback.map(|h| h.id()),
    })))
}

fn outcome_json(outcome: &InteractionOutcome) -> Value {
    json!({
        "state": outcome.state,
        "path": outcome.path,
        "translation": outcome.translation,
        "error": outcome.error.as_ref().map(error_json),
        "playback_id": outcome.playback.as_ref().map(|h| h.id()),
    })
}

async fn run_interaction(
    State(state): State<AppState>,
    Json(body): Json<TranslateBody>,
) -> Result<Json<Value>, ApiError> {
    let (text, source, target) = body.parts()?;

    let _guard = match body.message_id.as_deref() {
        Some(id) => match state.try_begin_interaction(id) {
            Some(guard) => Some(guard),
            None => {
                info!("Interaction for message {} already running", id);
                return Err(ApiError::Busy(format!(
                    "An interaction for message {} is already running",
                    id
                )));
            }
        },
        None => None,
    };

    let outcome = state.service.run_interaction(text, source, target).await;
    Ok(Json(outcome_json(&outcome)))
}

async fn speak_remote(
    State(state): State<AppState>,
    Json(body): Json<SpeakBody>,
) -> Result<Json<Value>, ApiError> {
    let handle = state
        .service
        .speak_translated_text(
            body.text.as_deref().unwrap_or(""),
            body.language.as_deref().unwrap_or(""),
        )
        .await?;
    Ok(Json(json!({
        "playback_id": handle.id(),
        "state": handle.state(),
    })))
}

async fn stop_remote(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stopped = state.service.stop_playback().await?;
    Ok(Json(json!({ "stopped": stopped })))
}

async fn speak_local(
    State(state): State<AppState>,
    Json(body): Json<LocalSpeakBody>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .speak_local(body.text.as_deref().unwrap_or(""), &body.options)
        .await?;
    Ok(Json(json!({ "speaking": true, "language": body.options.language })))
}

async fn stop_local(State(state): State<AppState>) -> Json<Value> {
    state.service.stop_speaking().await;
    Json(json!({ "stopped": true }))
}

async fn pause_local(State(state): State<AppState>) -> Json<Value> {
    state.service.pause_speaking().await;
    Json(json!({ "paused": true }))
}

async fn resume_local(State(state): State<AppState>) -> Json<Value> {
    state.service.resume_speaking().await;
    Json(json!({ "resumed": true }))
}

async fn list_voices(
    State(state): State<AppState>,
    Query(query): Query<VoiceQuery>,
) -> Json<Value> {
    let voices = match query.language.as_deref() {
        Some(language) => state.service.voices_for_language(language).await,
        None => state.service.available_voices().await,
    };
    Json(json!(voices))
}
