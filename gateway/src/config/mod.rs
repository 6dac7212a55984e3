//! Configuration module for the chat relay gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//! The configuration is split into logical submodules for maintainability.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! The configuration is built exactly once at process start and handed to
//! [`crate::state::AppState`]. Nothing reads credentials from the environment
//! after that point.
//!
//! # Example
//! ```rust,no_run
//! use chat_relay_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use zeroize::{Zeroize, ZeroizeOnDrop};

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port
pub const DEFAULT_PORT: u16 = 8000;
/// Default upstream base URL (OpenAI-compatible API root)
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 120;
/// Default transcript file served by the audio demo endpoint
pub const DEFAULT_AUDIO_TEXT_PATH: &str = "./file.txt";
/// Default raw PCM file served by the audio demo endpoint
pub const DEFAULT_AUDIO_PCM_PATH: &str = "./file.pcm";
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 16000;
pub const DEFAULT_AUDIO_CHUNK_DURATION_MS: u32 = 40;

/// Filler phrases sent as the first frame of an augmented completion
pub const DEFAULT_FILLER_MESSAGES: [&str; 3] = [
    "Just a moment, I'm thinking...",
    "Let me think about that for a second...",
    "Good question, let me find out...",
];

/// Upstream provider credential.
///
/// The key is wiped from memory when dropped and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key for building an Authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Settings for the upstream model provider connection
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Provider API key (`YOUR_LLM_API_KEY`). A missing key is reported when a
    /// completion is requested, not at startup.
    pub api_key: Option<ApiKey>,
    /// API root, `/chat/completions` is appended
    pub base_url: String,
    /// Model used when a request does not name one
    pub default_model: Option<String>,
    pub connect_timeout_seconds: u64,
    /// Time allowed until the provider answers with response headers
    pub request_timeout_seconds: u64,
    /// Maximum silence between two streamed events
    pub idle_timeout_seconds: u64,
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            default_model: None,
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECONDS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECONDS,
        }
    }
}

/// Local resources replayed by the audio demo endpoint
#[derive(Debug, Clone)]
pub struct AudioDemoConfig {
    pub text_path: PathBuf,
    pub pcm_path: PathBuf,
    /// Sample rate of the 16-bit mono PCM file
    pub sample_rate: u32,
    pub chunk_duration_ms: u32,
}

impl Default for AudioDemoConfig {
    fn default() -> Self {
        Self {
            text_path: PathBuf::from(DEFAULT_AUDIO_TEXT_PATH),
            pcm_path: PathBuf::from(DEFAULT_AUDIO_PCM_PATH),
            sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            chunk_duration_ms: DEFAULT_AUDIO_CHUNK_DURATION_MS,
        }
    }
}

/// Augmented completion settings
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub filler_messages: Vec<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            filler_messages: DEFAULT_FILLER_MESSAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the relay, including:
/// - Server settings (host, port, TLS)
/// - Upstream provider credential, endpoint and timeouts
/// - Audio demo resources
/// - Filler phrases for the augmented endpoint
/// - CORS settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    pub upstream: UpstreamConfig,
    pub audio_demo: AudioDemoConfig,
    pub rag: RagConfig,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            upstream: UpstreamConfig::default(),
            audio_demo: AudioDemoConfig::default(),
            rag: RagConfig::default(),
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// Environment variables override defaults. The `.env` file is loaded in
    /// `main.rs` before this is called, so its values appear as environment
    /// variables here.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }
}
