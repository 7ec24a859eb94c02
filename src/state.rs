use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::Config;
use crate::languages::LanguageTable;
use crate::reporting::RecentErrors;
use crate::service::TranslationService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub languages: Arc<LanguageTable>,
    pub service: Arc<TranslationService>,
    pub suppressed_errors: Arc<RecentErrors>,
    /// message_id -> start time of the interaction running for it
    pub active_interactions: Arc<DashMap<String, DateTime<Utc>>>,
}

/// Marks a message's interaction as running until dropped.
pub struct InteractionGuard {
    message_id: String,
    active: Arc<DashMap<String, DateTime<Utc>>>,
}

impl Drop for InteractionGuard {
    fn drop(&mut self) {
        self.active.remove(&self.message_id);
    }
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let languages = Arc::new(LanguageTable::new());
        let suppressed_errors = Arc::new(RecentErrors::default());
        let service =
            TranslationService::from_config(&config, languages.clone(), suppressed_errors.clone())?;

        Ok(Self::with_service(config, languages, Arc::new(service), suppressed_errors))
    }

    pub fn with_service(
        config: Config,
        languages: Arc<LanguageTable>,
        service: Arc<TranslationService>,
        suppressed_errors: Arc<RecentErrors>,
    ) -> Self {
        Self {
            config,
            languages,
            service,
            suppressed_errors,
            active_interactions: Arc::new(DashMap::new()),
        }
    }

    /// Claim `message_id`; `None` while another interaction for it is still running.
    pub fn try_begin_interaction(&self, message_id: &str) -> Option<InteractionGuard> {
        match self.active_interactions.entry(message_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Some(InteractionGuard {
                    message_id: message_id.to_string(),
                    active: self.active_interactions.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;

    #[test]
    fn test_interaction_guard_blocks_duplicates() {
        let mut config = Config::default();
        config.playback_config.backend = BackendKind::Silent;
        config.local_speech_config.backend = BackendKind::Silent;
        let state = AppState::new(config).unwrap();

        let guard = state.try_begin_interaction("msg-1").unwrap();
        assert!(state.try_begin_interaction("msg-1").is_none());
        assert!(state.try_begin_interaction("msg-2").is_some());

        drop(guard);
        assert!(state.try_begin_interaction("msg-1").is_some());
    }
}
