//! TOML Configuration File Support
//!
//! This module provides centralized configuration loading for the studio
//! daemon, supporting a TOML configuration file at
//! `~/.config/novel-studio/studio.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (when applicable)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! The API key is only read from the environment (`DEEPSEEK_API_KEY`), never
//! from the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [upstream]
//! base_url = "https://api.deepseek.com/v1"
//! chat_model = "deepseek-chat"
//! reasoner_model = "deepseek-reasoner"
//! temperature = 0.7
//! chapter_max_tokens = 8192
//! request_timeout_secs = 180
//!
//! [server]
//! bind_addr = "127.0.0.1:3000"
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::GenerationSettings;

/// Default OpenAI-compatible API root
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Model used for structured (JSON) generation
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-chat";

/// Model used for chapter prose
pub const DEFAULT_REASONER_MODEL: &str = "deepseek-reasoner";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Upstream section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamToml {
    /// API root URL
    pub base_url: Option<String>,

    /// Model for structure and outline generation
    pub chat_model: Option<String>,

    /// Model for chapter generation
    pub reasoner_model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Output token limit for chapter generation
    pub chapter_max_tokens: Option<u32>,

    /// Timeout for blocking completions in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Listen address, e.g. `127.0.0.1:3000`
    pub bind_addr: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioToml {
    /// Upstream configuration section
    pub upstream: UpstreamToml,

    /// Server configuration section
    pub server: ServerToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Settings for the completion API
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// API root URL
    pub base_url: String,
    /// Bearer token, from `DEEPSEEK_API_KEY`
    pub api_key: Option<String>,
    /// Model for structure and outline generation
    pub chat_model: String,
    /// Model for chapter generation
    pub reasoner_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Output token limit for chapter generation
    pub chapter_max_tokens: u32,
    /// Timeout for blocking completions
    pub request_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            reasoner_model: DEFAULT_REASONER_MODEL.to_string(),
            temperature: 0.7,
            chapter_max_tokens: 8192,
            request_timeout: Duration::from_secs(180),
        }
    }
}

impl UpstreamConfig {
    /// Generation settings derived from this section
    #[must_use]
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            chat_model: self.chat_model.clone(),
            reasoner_model: self.reasoner_model.clone(),
            temperature: self.temperature,
            chapter_max_tokens: self.chapter_max_tokens,
        }
    }
}

/// Centralized configuration for the studio daemon
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct StudioConfig {
    /// Completion API settings
    pub upstream: UpstreamConfig,

    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl StudioConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that cannot be defaulted
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] when the API key is missing or
    /// the temperature is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::ValidationError(
                "missing DEEPSEEK_API_KEY".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.upstream.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "temperature {} is outside 0.0..=2.0",
                self.upstream.temperature
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/novel-studio/studio.toml` or
/// `~/.config/novel-studio/studio.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("novel-studio").join("studio.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<StudioConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<StudioConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
pub(crate) fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<StudioConfig, ConfigError> {
    // Start with defaults
    let mut config = StudioConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: StudioToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Environment overrides file values
    apply_env_config(&mut config, env);

    Ok(config)
}

fn parse_bind_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("bind_addr {value:?}: {e}")))
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut StudioConfig, toml: &StudioToml) -> Result<(), ConfigError> {
    let upstream = &toml.upstream;
    if let Some(ref url) = upstream.base_url {
        config.upstream.base_url.clone_from(url);
    }
    if let Some(ref model) = upstream.chat_model {
        config.upstream.chat_model.clone_from(model);
    }
    if let Some(ref model) = upstream.reasoner_model {
        config.upstream.reasoner_model.clone_from(model);
    }
    if let Some(temperature) = upstream.temperature {
        config.upstream.temperature = temperature;
    }
    if let Some(tokens) = upstream.chapter_max_tokens {
        config.upstream.chapter_max_tokens = tokens;
    }
    if let Some(secs) = upstream.request_timeout_secs {
        config.upstream.request_timeout = Duration::from_secs(secs);
    }

    if let Some(ref addr) = toml.server.bind_addr {
        config.bind_addr = parse_bind_addr(addr)?;
    }

    Ok(())
}

/// Apply environment variable overrides to the config
///
/// Unparseable numeric values are ignored with a warning.
fn apply_env_config(config: &mut StudioConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(key) = env("DEEPSEEK_API_KEY") {
        // The key has no file or default form, so it does not change the source.
        config.upstream.api_key = Some(key);
    }
    if let Some(url) = env("STUDIO_BASE_URL") {
        config.upstream.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = env("STUDIO_CHAT_MODEL") {
        config.upstream.chat_model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = env("STUDIO_REASONER_MODEL") {
        config.upstream.reasoner_model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(value) = env("STUDIO_TEMPERATURE") {
        match value.parse::<f32>() {
            Ok(t) => {
                config.upstream.temperature = t;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %value, "Ignoring invalid STUDIO_TEMPERATURE"),
        }
    }
    if let Some(value) = env("STUDIO_CHAPTER_MAX_TOKENS") {
        match value.parse::<u32>() {
            Ok(n) => {
                config.upstream.chapter_max_tokens = n;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %value, "Ignoring invalid STUDIO_CHAPTER_MAX_TOKENS"),
        }
    }
    if let Some(value) = env("STUDIO_REQUEST_TIMEOUT_SECS") {
        match value.parse::<u64>() {
            Ok(secs) => {
                config.upstream.request_timeout = Duration::from_secs(secs);
                config.source = ConfigSource::Env;
            }
            Err(_) => {
                tracing::warn!(value = %value, "Ignoring invalid STUDIO_REQUEST_TIMEOUT_SECS");
            }
        }
    }
    if let Some(value) = env("STUDIO_BIND_ADDR") {
        match parse_bind_addr(&value) {
            Ok(addr) => {
                config.bind_addr = addr;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid STUDIO_BIND_ADDR"),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Listen address override
    pub bind_addr: Option<SocketAddr>,

    /// API root override
    pub base_url: Option<String>,

    /// Chat model override
    pub chat_model: Option<String>,

    /// Reasoner model override
    pub reasoner_model: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set listen address override
    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Set API root override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set chat model override
    #[must_use]
    pub fn with_chat_model(mut self, model: String) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Set reasoner model override
    #[must_use]
    pub fn with_reasoner_model(mut self, model: String) -> Self {
        self.reasoner_model = Some(model);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut StudioConfig) {
        if self.bind_addr.is_some()
            || self.base_url.is_some()
            || self.chat_model.is_some()
            || self.reasoner_model.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(addr) = self.bind_addr {
            config.bind_addr = addr;
        }
        if let Some(ref url) = self.base_url {
            config.upstream.base_url.clone_from(url);
        }
        if let Some(ref model) = self.chat_model {
            config.upstream.chat_model.clone_from(model);
        }
        if let Some(ref model) = self.reasoner_model {
            config.upstream.reasoner_model.clone_from(model);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
