/// CLI configuration
use crate::error::{CliError, Result};
use lector_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "lector.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_speech")]
    pub speech: SpeechSettings,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeechSettings {
    /// BCP 47 tag of the console voice; unset disables the language check
    #[serde(default)]
    pub voice_language: Option<String>,

    /// Print each spoken chunk to stdout
    #[serde(default = "default_echo")]
    pub echo: bool,
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// `path` overrides the default `lector.toml`; an explicit path must
    /// exist. Environment variables prefixed with `LECTOR_` override both,
    /// with `__` between nested keys (`LECTOR_STORAGE__DATABASE_URL`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("LECTOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.trim().is_empty() {
            return Err(CliError::Config(
                "storage.database_url must not be empty".to_string(),
            ));
        }

        if let Some(voice) = &self.speech.voice_language {
            if voice.trim().is_empty() {
                return Err(CliError::Config(
                    "speech.voice_language must not be blank (omit it instead)".to_string(),
                ));
            }
        }

        self.playback
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))
    }
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./lector.db".to_string()
}

fn default_speech() -> SpeechSettings {
    SpeechSettings {
        voice_language: None,
        echo: default_echo(),
    }
}

fn default_echo() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            speech: default_speech(),
            playback: PlaybackConfig::default(),
        }
    }
}
