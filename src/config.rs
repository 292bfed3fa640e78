use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::channel::ChannelSettings;
use crate::core::keyring;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_NAMESPACE: &str = "/emails";

/// How long a failed-mutation notice stays up.
pub const MUTATION_NOTICE_TTL: Duration = Duration::from_secs(3);
/// How long the processing-complete notice stays up.
pub const PROCESSING_NOTICE_TTL: Duration = Duration::from_secs(5);
/// Rows in the recent detections table.
pub const RECENT_LIMIT: usize = 10;

/// Runtime config. The token is an opaque bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub namespace: String,
    pub token: String,
}

/// On-disk representation. The token is either a keyring reference or plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub api_url: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub token: TokenBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend")]
pub enum TokenBackend {
    #[serde(rename = "keyring")]
    Keyring,
    #[serde(rename = "plaintext")]
    Plaintext { value: String },
}

/// Why config could not be resolved without user input.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNeedsInput {
    /// No config file exists; run `mailguard login`.
    FullSetup,
    /// Config exists but the token is missing from the keyring.
    TokenOnly {
        api_url: String,
        error: Option<String>,
    },
}

impl std::fmt::Display for ConfigNeedsInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigNeedsInput::FullSetup => write!(
                f,
                "no configuration found; set MAILGUARD_TOKEN or run `mailguard login`"
            ),
            ConfigNeedsInput::TokenOnly { api_url, error } => {
                write!(f, "no token available for {api_url}")?;
                if let Some(e) = error {
                    write!(f, " ({e})")?;
                }
                write!(f, "; run `mailguard login`")
            }
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailguard")
        .join("config.json")
}

impl FileConfig {
    pub fn load() -> Result<Option<Self>, String> {
        let path = config_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path).map_err(|e| format!("read config: {e}"))?;
        Self::parse(&data).map(Some)
    }

    pub fn parse(data: &str) -> Result<Self, String> {
        serde_json::from_str(data).map_err(|e| format!("parse config: {e}"))
    }

    pub fn save(&self) -> Result<(), String> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create config dir: {e}"))?;
        }
        let data =
            serde_json::to_string_pretty(self).map_err(|e| format!("serialize config: {e}"))?;
        fs::write(&path, data).map_err(|e| format!("write config: {e}"))
    }
}

impl Config {
    /// Try env vars. Returns None if the token is missing.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let token = get("MAILGUARD_TOKEN").filter(|t| !t.is_empty())?;
        let api_url = get("MAILGUARD_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let namespace = get("MAILGUARD_NAMESPACE").unwrap_or_else(default_namespace);
        Some(Config {
            api_url,
            namespace,
            token,
        })
    }

    /// Build runtime Config from a FileConfig + resolved token.
    pub fn from_file_config(fc: &FileConfig, token: String) -> Self {
        Config {
            api_url: fc.api_url.clone(),
            namespace: fc.namespace.clone(),
            token,
        }
    }

    /// Resolution order: env vars → config file + keyring → Err(ConfigNeedsInput).
    pub fn resolve() -> Result<Self, ConfigNeedsInput> {
        // 1. Env vars override everything
        if let Some(config) = Self::from_env() {
            log::info!("Config loaded from environment variables");
            return Ok(config);
        }

        // 2. Config file + keyring
        match FileConfig::load() {
            Ok(Some(fc)) => match &fc.token {
                TokenBackend::Plaintext { value } => {
                    log::info!("Config loaded from file (plaintext token)");
                    Ok(Self::from_file_config(&fc, value.clone()))
                }
                TokenBackend::Keyring => match keyring::get_token(&fc.api_url) {
                    Ok(Some(token)) => {
                        log::info!("Config loaded from file + keyring");
                        Ok(Self::from_file_config(&fc, token))
                    }
                    Ok(None) => Err(ConfigNeedsInput::TokenOnly {
                        api_url: fc.api_url,
                        error: None,
                    }),
                    Err(e) => {
                        log::warn!("Keyring lookup failed: {}", e);
                        Err(ConfigNeedsInput::TokenOnly {
                            api_url: fc.api_url,
                            error: Some(format!("Keyring unavailable: {e}")),
                        })
                    }
                },
            },
            Ok(None) => {
                log::info!("No config file found, need full setup");
                Err(ConfigNeedsInput::FullSetup)
            }
            Err(e) => {
                log::warn!("Config file error: {}", e);
                Err(ConfigNeedsInput::FullSetup)
            }
        }
    }

    /// Persist config, keeping the token in the keyring when possible.
    pub fn store(&self) -> Result<(), String> {
        let token = match keyring::set_token(&self.api_url, &self.token) {
            Ok(()) => TokenBackend::Keyring,
            Err(e) => {
                log::warn!("Keyring unavailable, storing token in plaintext: {}", e);
                TokenBackend::Plaintext {
                    value: self.token.clone(),
                }
            }
        };
        FileConfig {
            api_url: self.api_url.clone(),
            namespace: self.namespace.clone(),
            token,
        }
        .save()
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            url: self.api_url.clone(),
            namespace: self.namespace.clone(),
            token: self.token.clone(),
        }
    }
}
