use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{SettingsError, ValidationError};

pub const DEFAULT_API_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// File name of the persisted settings blob
pub const SETTINGS_FILE: &str = "mertgpt_settings.json";

/// Models offered by the settings picker. Any other model name can still be typed in.
pub const KNOWN_MODELS: &[&str] = &["deepseek-chat", "deepseek-reasoner"];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub api_key: String,
    pub api_endpoint: String,
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Both the key and the endpoint are set, so a request can go out
    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    /// Key for display: everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let len = self.api_key.chars().count();
        if len == 0 {
            String::new()
        } else if len <= 4 {
            "*".repeat(len)
        } else {
            let last_four: String = self.api_key.chars().skip(len - 4).collect();
            format!("{}...{}", "*".repeat((len - 4).min(20)), last_four)
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_empty() {
            return Err(ValidationError::MissingApiKey);
        }
        if self.api_endpoint.is_empty() {
            return Err(ValidationError::MissingApiEndpoint);
        }
        Ok(())
    }
}

/// On-disk shape. Every field is optional so older or hand-edited files still load.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    api_key: Option<String>,
    api_endpoint: Option<String>,
    model: Option<String>,
}

impl From<StoredSettings> for Settings {
    fn from(stored: StoredSettings) -> Self {
        let defaults = Settings::default();
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        Self {
            api_key: stored.api_key.unwrap_or_default(),
            api_endpoint: non_empty(stored.api_endpoint).unwrap_or(defaults.api_endpoint),
            model: non_empty(stored.model).unwrap_or(defaults.model),
        }
    }
}

/// Loads and saves [`Settings`] as a single JSON blob
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/mertgpt/mertgpt_settings.json`
    pub fn default_location() -> Result<Self, SettingsError> {
        let config_dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(config_dir.join("mertgpt").join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or corrupt blob yields defaults.
    pub fn load(&self) -> Settings {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no saved settings, using defaults");
                return Settings::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read settings, using defaults");
                return Settings::default();
            }
        };

        match serde_json::from_str::<StoredSettings>(&content) {
            Ok(stored) => stored.into(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "corrupt settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Validates, then overwrites the whole blob. An invalid candidate leaves the file untouched.
    pub fn save(&self, candidate: Settings) -> Result<Settings, SettingsError> {
        let settings = Settings {
            api_key: candidate.api_key.trim().to_string(),
            api_endpoint: candidate.api_endpoint.trim().to_string(),
            model: candidate.model,
        };
        settings.validate()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&settings)?;
        fs::write(&self.path, content)?;

        tracing::info!(path = %self.path.display(), model = %settings.model, "settings saved");
        Ok(settings)
    }
}
