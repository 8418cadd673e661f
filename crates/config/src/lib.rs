//! Configuration loading, validation, and management for PajakGate.
//!
//! Loads configuration from `~/.pajakgate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use pajakgate_core::Lexicon;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.pajakgate/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used for answers
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per answer
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Provider connection settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Scope gate configuration
    #[serde(default)]
    pub scope: ScopeConfig,

    /// System instruction configuration
    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    2048
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("provider", &self.provider)
            .field("gateway", &self.gateway)
            .field("scope", &self.scope)
            .field("identity", &self.identity)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Override the Gemini API base URL (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Requests per minute per client (0 = unlimited)
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,

    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_rate_limit() -> usize {
    30
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit(),
            rate_limit_per_minute: default_rate_limit(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Scope gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Number of recent user messages checked
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Include the built-in Indonesian tax lexicon
    #[serde(default = "default_true")]
    pub use_builtin_keywords: bool,

    /// Extra keywords, one phrase per entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// File with one keyword phrase per line (`#` starts a comment line)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords_file: Option<PathBuf>,

    /// Upper bound on lexicon size
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,

    /// Longest history accepted per request
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,

    /// Reply sent when a conversation is out of scope
    #[serde(default = "default_refusal_message")]
    pub refusal_message: String,

    /// Reply sent when the model's answer cannot be parsed
    #[serde(default = "default_format_error_message")]
    pub format_error_message: String,
}

/// Largest accepted window.
pub const MAX_WINDOW_SIZE: usize = 20;

fn default_window_size() -> usize {
    pajakgate_core::scope::DEFAULT_WINDOW_SIZE
}
fn default_max_keywords() -> usize {
    2_000
}
fn default_max_history_messages() -> usize {
    100
}
fn default_refusal_message() -> String {
    "Maaf, saya hanya dapat membantu pertanyaan seputar pajak Indonesia.".into()
}
fn default_format_error_message() -> String {
    concat!(
        "Maaf, saya mengalami kesulitan dalam memproses jawaban karena format yang ",
        "tidak sesuai dari model AI. Silakan coba ajukan pertanyaan dengan format ",
        "yang lebih jelas atau gunakan kata kunci yang spesifik."
    )
    .into()
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            use_builtin_keywords: true,
            keywords: Vec::new(),
            keywords_file: None,
            max_keywords: default_max_keywords(),
            max_history_messages: default_max_history_messages(),
            refusal_message: default_refusal_message(),
            format_error_message: default_format_error_message(),
        }
    }
}

impl ScopeConfig {
    /// Build the lexicon: built-in phrases, then inline keywords, then the file.
    pub fn load_keywords(&self) -> Result<Lexicon, ConfigError> {
        let mut lexicon = if self.use_builtin_keywords {
            Lexicon::indonesian_tax()
        } else {
            Lexicon::default()
        };

        lexicon = lexicon.merged(Lexicon::new(&self.keywords));

        if let Some(path) = &self.keywords_file {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            lexicon = lexicon.merged(parse_keyword_lines(&content));
        }

        if lexicon.len() > self.max_keywords {
            return Err(ConfigError::ValidationError(format!(
                "lexicon has {} keywords, more than scope.max_keywords = {}",
                lexicon.len(),
                self.max_keywords
            )));
        }

        if lexicon.is_empty() {
            tracing::warn!("Keyword lexicon is empty, every conversation will be out of scope");
        }

        Ok(lexicon)
    }
}

/// Parse a keyword file: one phrase per line, blank lines and `#` comments skipped.
pub fn parse_keyword_lines(content: &str) -> Lexicon {
    Lexicon::new(
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#')),
    )
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Replace the built-in system instruction entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction_override: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.pajakgate/config.toml).
    ///
    /// Environment variables fill in or override file values:
    /// - `PAJAKGATE_API_KEY`, then `GEMINI_API_KEY`: used only when the
    ///   file sets no `api_key`
    /// - `PAJAKGATE_MODEL`: always overrides `model`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("PAJAKGATE_API_KEY")
                .or_else(|| lookup("GEMINI_API_KEY"))
                .filter(|k| !k.trim().is_empty());
        }

        if let Some(model) = lookup("PAJAKGATE_MODEL") {
            self.model = model;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pajakgate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.scope.window_size == 0 || self.scope.window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "scope.window_size must be between 1 and {MAX_WINDOW_SIZE}"
            )));
        }

        if self.scope.max_history_messages == 0 {
            return Err(ConfigError::ValidationError(
                "scope.max_history_messages must be > 0".into(),
            ));
        }

        if self.scope.refusal_message.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "scope.refusal_message must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            provider: ProviderConfig::default(),
            gateway: GatewayConfig::default(),
            scope: ScopeConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
