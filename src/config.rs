use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::TutorError;
use crate::tutor::configuration::{DEFAULT_MODEL, GiveUpPolicy, MODELS};

pub const LOCALES: &[&str] = &["ja", "en"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_script_model")]
    pub script_model: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_tts_base_url")]
    pub tts_base_url: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_record_command")]
    pub record_command: Vec<String>,
    #[serde(default = "default_player_command")]
    pub player_command: Vec<String>,
    #[serde(default = "default_recording_mime")]
    pub recording_mime: String,
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
    #[serde(default)]
    pub give_up_policy: GiveUpPolicy,
}

fn default_theme() -> String {
    "terminal-default".to_string()
}
fn default_locale() -> String {
    "ja".to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_script_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_transcription_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}
fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}
fn default_tts_base_url() -> String {
    "https://translate.google.com/translate_tts".to_string()
}
fn default_record_command() -> Vec<String> {
    ["arecord", "-q", "-f", "cd", "-d", "8", "{path}"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_player_command() -> Vec<String> {
    ["mpv", "--really-quiet", "--no-video", "{path}"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_recording_mime() -> String {
    "audio/wav".to_string()
}
fn default_autoplay() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            locale: default_locale(),
            model: default_model(),
            script_model: default_script_model(),
            transcription_model: default_transcription_model(),
            api_base_url: default_api_base_url(),
            tts_base_url: default_tts_base_url(),
            request_timeout_secs: None,
            record_command: default_record_command(),
            player_command: default_player_command(),
            recording_mime: default_recording_mime(),
            autoplay: default_autoplay(),
            give_up_policy: GiveUpPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Reset values a stale or hand-edited file may carry.
    pub fn normalize(&mut self) {
        if !LOCALES.contains(&self.locale.as_str()) {
            self.locale = default_locale();
        }
        if !MODELS.contains(&self.model.as_str()) {
            log::warn!("unknown model '{}', using {}", self.model, DEFAULT_MODEL);
            self.model = default_model();
        }
        if !self.record_command.iter().any(|a| a.contains("{path}")) {
            self.record_command = default_record_command();
        }
        if !self.player_command.iter().any(|a| a.contains("{path}")) {
            self.player_command = default_player_command();
        }
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        if self.request_timeout_secs == Some(0) {
            self.request_timeout_secs = None;
        }
    }
}

/// API credentials and the optional access password. Kept apart from
/// `config.toml` so the settings screen never writes them back.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub app_password: Option<String>,
}

impl Secrets {
    pub fn load() -> Result<Self, TutorError> {
        Self::load_from(&config_dir().join("secrets.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, TutorError> {
        let mut secrets = if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| TutorError::Config(format!("{}: {e}", path.display())))?;
            toml::from_str::<Secrets>(&content)
                .map_err(|e| TutorError::Config(format!("{}: {e}", path.display())))?
        } else {
            Secrets::default()
        };
        secrets.apply_env(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("KAIWA_PASSWORD").ok(),
        );
        Ok(secrets)
    }

    fn apply_env(&mut self, api_key: Option<String>, password: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.gemini_api_key = Some(key);
        }
        if let Some(pw) = password.filter(|p| !p.is_empty()) {
            self.app_password = Some(pw);
        }
    }

    /// The API key, or the startup error shown before the TUI opens.
    pub fn require_api_key(&self) -> Result<&str, TutorError> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TutorError::Config(format!(
                    "gemini_api_key is not set; add it to {} or export GEMINI_API_KEY",
                    config_dir().join("secrets.toml").display()
                ))
            })
    }

    pub fn password(&self) -> Option<&str> {
        self.app_password.as_deref().filter(|p| !p.is_empty())
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kaiwa")
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kaiwa")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.locale, "ja");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.autoplay);
        assert_eq!(config.give_up_policy, GiveUpPolicy::ContinueNarrative);
        assert!(config.record_command.iter().any(|a| a == "{path}"));
    }

    #[test]
    fn test_config_partial_file_keeps_defaults() {
        let toml_str = r#"
theme = "solarized-dark"
give_up_policy = "fresh_question"
player_command = ["ffplay", "-nodisp", "-autoexit", "{path}"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.theme, "solarized-dark");
        assert_eq!(config.give_up_policy, GiveUpPolicy::FreshQuestion);
        assert_eq!(config.player_command[0], "ffplay");
        assert_eq!(config.recording_mime, "audio/wav");
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.model, deserialized.model);
        assert_eq!(config.player_command, deserialized.player_command);
        assert_eq!(config.give_up_policy, deserialized.give_up_policy);
    }

    #[test]
    fn test_normalize_resets_unknown_values() {
        let mut config = Config {
            locale: "fr".to_string(),
            model: "gpt-4".to_string(),
            record_command: vec!["arecord".to_string()],
            api_base_url: "http://localhost:8080/".to_string(),
            request_timeout_secs: Some(0),
            ..Config::default()
        };
        config.normalize();
        assert_eq!(config.locale, "ja");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.record_command, default_record_command());
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.request_timeout_secs, None);
    }

    #[test]
    fn test_secrets_env_overrides_file() {
        let mut secrets: Secrets = toml::from_str("gemini_api_key = \"from-file\"").unwrap();
        secrets.apply_env(Some("from-env".into()), None);
        assert_eq!(secrets.require_api_key().unwrap(), "from-env");
        assert_eq!(secrets.password(), None);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let mut secrets = Secrets::default();
        secrets.apply_env(Some("  ".into()), Some(String::new()));
        let err = secrets.require_api_key().unwrap_err();
        assert!(matches!(err, TutorError::Config(_)));
    }

    #[test]
    fn test_secrets_file_with_password() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "gemini_api_key = \"k\"\napp_password = \"hunter2\"\n").unwrap();
        let secrets = Secrets::load_from(&path).unwrap();
        assert!(secrets.gemini_api_key.is_some());
        // env may override the password in CI, so only check it is present
        assert!(secrets.password().is_some());
    }
}
