use std::fs;
use std::path::Path;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_LINGVA_URL: &str = "https://lingva.ml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub translation_config: TranslationConfig,
    #[serde(default)]
    pub speech_config: SpeechConfig,
    #[serde(default)]
    pub playback_config: PlaybackConfig,
    #[serde(default)]
    pub local_speech_config: LocalSpeechConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Decoded audio clips are written here while they play.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_translation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Spawn an external program.
    Command,
    /// Accept everything and finish immediately.
    Silent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_player_program")]
    pub program: String,
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,
    #[serde(default = "default_true")]
    pub preempt_previous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSpeechConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_synth_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub enhanced_args: Vec<String>,
    #[serde(default = "default_voices_args")]
    pub voices_args: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    12480
}

fn default_cache_dir() -> String {
    "cache".to_string()
}

fn default_base_url() -> String {
    DEFAULT_LINGVA_URL.to_string()
}

fn default_translation_timeout() -> u64 {
    10
}

fn default_speech_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    "TalkTraverse-App/1.0".to_string()
}

fn default_backend() -> BackendKind {
    BackendKind::Command
}

fn default_player_program() -> String {
    "ffplay".to_string()
}

fn default_player_args() -> Vec<String> {
    vec![
        "-nodisp".to_string(),
        "-autoexit".to_string(),
        "-loglevel".to_string(),
        "quiet".to_string(),
    ]
}

fn default_synth_program() -> String {
    "espeak-ng".to_string()
}

fn default_voices_args() -> Vec<String> {
    vec!["--voices".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_translation_timeout(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_speech_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            program: default_player_program(),
            args: default_player_args(),
            preempt_previous: true,
        }
    }
}

impl Default for LocalSpeechConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            program: default_synth_program(),
            args: Vec::new(),
            enhanced_args: Vec::new(),
            voices_args: default_voices_args(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            anyhow::bail!("Configuration file not found: {}", path);
        }

        let content = read_text_file(path)?;
        let content = substitute_env_vars(&content);

        let path_lower = path.to_lowercase();
        let config: Config = if path_lower.ends_with(".jsonld") || path_lower.ends_with(".json") {
            let mut json_value: serde_json::Value = serde_json::from_str(&content)?;
            // JSON-LD context is metadata only
            if let serde_json::Value::Object(ref mut obj) = json_value {
                obj.remove("@context");
            }
            serde_json::from_value(json_value)?
        } else {
            serde_yaml::from_str(&content)?
        };

        debug!("Parsed configuration from {}", path);
        Ok(config)
    }

    /// Endpoint base URLs may be overridden from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TRANSLATION_API_URL") {
            if !url.trim().is_empty() {
                self.translation_config.base_url = url;
            }
        }
        if let Ok(url) = std::env::var("SPEECH_API_URL") {
            if !url.trim().is_empty() {
                self.speech_config.base_url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.translation_config.timeout_secs == 0 {
            anyhow::bail!("translation_config.timeout_secs must be greater than zero");
        }
        if self.speech_config.timeout_secs == 0 {
            anyhow::bail!("speech_config.timeout_secs must be greater than zero");
        }
        for (name, url) in [
            ("translation_config.base_url", &self.translation_config.base_url),
            ("speech_config.base_url", &self.speech_config.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{} must be an http(s) URL, got '{}'", name, url);
            }
        }
        Ok(())
    }
}

/// Read a UTF-8 config file, dropping a leading BOM if present.
fn read_text_file(path: &str) -> Result<String> {
    let bytes = fs::read(path)?;
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
    if had_errors {
        anyhow::bail!("Configuration file is not valid UTF-8: {}", path);
    }
    Ok(text.into_owned())
}

/// Replace `${VAR_NAME}` with the environment value; unknown variables stay as written.
pub fn substitute_env_vars(content: &str) -> String {
    let pattern = match Regex::new(r"\$\{(\w+)\}") {
        Ok(p) => p,
        Err(_) => return content.to_string(),
    };
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
