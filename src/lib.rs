pub mod config;
pub mod error;
pub mod languages;
pub mod reporting;
pub mod routes;
pub mod service;
pub mod state;
pub mod translate;
pub mod tts;

pub use config::Config;
pub use error::{SpeechError, SpeechResult};
pub use languages::LanguageTable;
pub use service::{InteractionOutcome, InteractionState, MessageTranslation, TranslationService};
pub use state::AppState;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the HTTP application around prepared state.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
