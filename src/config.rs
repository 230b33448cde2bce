//! Configuration management for Storybook.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories, with environment overrides
//! for the API key and listen address.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application name used for config directory.
const APP_NAME: &str = "Storybook";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Placeholder value for unconfigured API keys.
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Environment variables checked for the API key, first non-empty wins.
const API_KEY_ENV_VARS: [&str; 4] = ["VENICE_API_KEY", "VENICE_TOKEN", "VITE_VENICE_API_KEY", "API_KEY"];

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AI provider configuration.
    pub api: ApiConfig,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Book generation settings.
    pub generation: GenerationConfig,

    /// HTML export settings.
    pub render: RenderConfig,
}

/// API configuration for the text and image provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key. Unset means offline mode.
    pub key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Model used for story writing when the request doesn't pick one.
    pub text_model: String,

    /// Model used for character descriptions and image prompts.
    pub prompt_model: String,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: API_KEY_PLACEHOLDER.to_string(),
            base_url: "https://api.venice.ai/api/v1".to_string(),
            text_model: "mistral-31-24b".to_string(),
            prompt_model: "mistral-31-24b".to_string(),
            timeout_secs: 120,
        }
    }
}

impl ApiConfig {
    /// Checks if the API key is configured (not placeholder).
    pub fn is_configured(&self) -> bool {
        let key = self.key.trim();
        !key.is_empty() && key != API_KEY_PLACEHOLDER
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,

    /// Whole-request timeout in seconds. A full book takes a while.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            request_timeout_secs: 600,
        }
    }
}

/// Book generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Characters kept free below a model's prompt limit.
    pub prompt_limit_buffer: usize,

    /// Image size for the cover.
    pub cover_size: String,

    /// Image size for story and end pages.
    pub page_size: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            prompt_limit_buffer: 50,
            cover_size: "1792x1024".to_string(),
            page_size: "1024x1024".to_string(),
        }
    }
}

/// HTML export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Line printed under the final illustration.
    pub signature: String,

    /// Largest image, in bytes, the HTML export will download.
    pub max_image_bytes: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            signature: "Made with lots of love".to_string(),
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());
        if let Some(key) = key {
            self.api.key = key;
        }

        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host.trim().to_string();
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("'{}' is not a valid port", port),
            })?;
        }

        Ok(())
    }

    /// Validates the configuration.
    ///
    /// A missing API key is not an error: it selects offline mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = url::Url::parse(&self.api.base_url) {
            return Err(ConfigError::InvalidValue {
                key: "api.base_url".to_string(),
                message: e.to_string(),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "api.timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.request_timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.render.max_image_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "render.max_image_bytes".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        for origin in &self.server.cors_origins {
            if origin.parse::<axum::http::HeaderValue>().is_err() {
                return Err(ConfigError::InvalidValue {
                    key: "server.cors_origins".to_string(),
                    message: format!("'{}' is not a valid origin", origin),
                });
            }
        }

        Ok(())
    }

    /// Returns true when requests go to the provider instead of the offline fallback.
    pub fn is_online(&self) -> bool {
        self.api.is_configured()
    }
}
