//! Configuration management for tgstream

use crate::error::{Error, Result};
use crate::telegram::{ALIGNMENT, MAX_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default chunk size requested from Telegram: 1MB
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Default number of chunks cached per open file
pub const DEFAULT_CACHE_CAPACITY: usize = 20;

/// Default size of each body piece written to the client: 256KB
pub const DEFAULT_READ_SIZE: usize = 256 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telegram API configuration
    pub telegram: TelegramConfig,

    /// Chunk fetching and caching
    pub stream: StreamConfig,

    /// HTTP listener
    pub server: ServerConfig,
}

/// Telegram API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Telegram API ID (get from my.telegram.org)
    pub api_id: i32,

    /// Telegram API hash
    pub api_hash: String,

    /// Bot token used to sign in
    pub bot_token: String,

    /// Session file path
    pub session_file: PathBuf,
}

/// Chunk fetching and caching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Bytes requested per `upload.getFile` call
    pub chunk_size: u64,

    /// Offset and limit granularity required by Telegram
    pub alignment: u64,

    /// Chunks kept per open file
    pub cache_capacity: usize,

    /// Timeout for a single chunk request (seconds)
    pub fetch_timeout_secs: u64,

    /// Retries for transient failures before giving up
    pub retry_attempts: u32,

    /// Base delay for exponential backoff (ms)
    pub retry_base_delay_ms: u64,

    /// Bytes read from the remote file per response piece
    pub read_size: usize,

    /// Pieces buffered ahead of the client socket
    pub body_buffer: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind_address: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        let session_file = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tgstream")
            .join("tgstream.session");

        TelegramConfig {
            api_id: 0,
            api_hash: String::new(),
            bot_token: String::new(),
            session_file,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            alignment: ALIGNMENT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            fetch_timeout_secs: 30,
            retry_attempts: 5,
            retry_base_delay_ms: 100,
            read_size: DEFAULT_READ_SIZE,
            body_buffer: 4,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from a file, with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise from the environment alone
    pub fn load_or_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::from_env())
        }
    }

    /// Create a config from defaults plus environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Some(id) = env_parse::<i32>("APP_ID") {
            self.telegram.api_id = id;
        }

        if let Some(hash) = env_string("APP_HASH") {
            self.telegram.api_hash = hash;
        }

        if let Some(token) = env_string("BOT_TOKEN") {
            self.telegram.bot_token = token;
        }

        if let Some(session) = env_string("TGSTREAM_SESSION") {
            self.telegram.session_file = PathBuf::from(session);
        }

        if let Some(port) = env_parse::<u16>("PORT") {
            self.server.port = port;
        }

        if let Some(capacity) = env_parse::<usize>("TGSTREAM_CACHE_CHUNKS") {
            self.stream.cache_capacity = capacity;
        }
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate everything needed to connect and serve
    pub fn validate(&self) -> Result<()> {
        if self.telegram.api_id == 0 {
            return Err(Error::InvalidConfig(
                "Telegram API ID is required (APP_ID)".to_string(),
            ));
        }

        if self.telegram.api_hash.is_empty() {
            return Err(Error::InvalidConfig(
                "Telegram API hash is required (APP_HASH)".to_string(),
            ));
        }

        if self.telegram.bot_token.is_empty() {
            return Err(Error::InvalidConfig(
                "Bot token is required (BOT_TOKEN)".to_string(),
            ));
        }

        self.stream.validate()
    }
}

impl StreamConfig {
    /// Check chunk geometry and buffer sizes
    pub fn validate(&self) -> Result<()> {
        if self.alignment == 0 || MAX_CHUNK_SIZE % self.alignment != 0 {
            return Err(Error::InvalidConfig(format!(
                "Alignment must be a non-zero divisor of {}",
                MAX_CHUNK_SIZE
            )));
        }

        // Chunks must tile Telegram's 1MB windows exactly.
        if self.chunk_size == 0
            || self.chunk_size > MAX_CHUNK_SIZE
            || self.chunk_size % self.alignment != 0
            || !(self.chunk_size / self.alignment).is_power_of_two()
        {
            return Err(Error::InvalidConfig(format!(
                "Chunk size must be a power-of-two multiple of {} up to {}",
                self.alignment, MAX_CHUNK_SIZE
            )));
        }

        if self.cache_capacity == 0 {
            return Err(Error::InvalidConfig(
                "Cache capacity must be at least 1".to_string(),
            ));
        }

        if self.read_size == 0 || self.body_buffer == 0 {
            return Err(Error::InvalidConfig(
                "Read size and body buffer must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}
