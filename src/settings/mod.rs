//! Engine settings.
//!
//! Settings are read with the following precedence (later wins):
//!
//! 1. built-in defaults,
//! 2. an optional `reqcache.toml` in the working directory (or an explicit file),
//! 3. environment variables prefixed `REQCACHE__`, with `__` separating nested
//!    keys, e.g. `REQCACHE__TTL_SECS=10` or `REQCACHE__ENCRYPTION__ENABLED=true`.
//!
//! ```toml
//! ttl_secs = 3
//! request_timeout_secs = 30
//!
//! [encryption]
//! enabled = true
//! key = "base64-encoded 32 byte key"
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::codec::{AesGcmCodec, Codec, CodecError, PlainCodec};

const DEFAULT_TTL_SECS: u64 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONFIG_BASENAME: &str = "reqcache";
const ENV_PREFIX: &str = "REQCACHE";

/// Errors raised while loading or applying settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("invalid encryption key: {0}")]
    Key(#[from] CodecError),
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Settings for one [`RequestCache`](crate::RequestCache).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Seconds a successful response stays fresh.
    pub ttl_secs: u64,
    /// Per-request timeout enforced by [`HttpTransport`](crate::transport::HttpTransport).
    pub request_timeout_secs: u64,
    /// Body encryption.
    pub encryption: EncryptionSettings,
}

/// Body encryption settings. Disabled by default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EncryptionSettings {
    pub enabled: bool,
    /// Base64-encoded 32-byte AES key. Required when `enabled` is set.
    pub key: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            encryption: EncryptionSettings::default(),
        }
    }
}

impl CacheSettings {
    /// Loads settings from `reqcache.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
            .add_source(Self::environment());
        Self::finish(builder.build()?)
    }

    /// Loads settings from `path` (which must exist) and the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(Self::environment());
        Self::finish(builder.build()?)
    }

    /// Parses settings from a TOML document, ignoring the environment.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds the body codec these settings describe.
    pub fn codec(&self) -> Result<Arc<dyn Codec>, ConfigError> {
        if !self.encryption.enabled {
            return Ok(Arc::new(PlainCodec));
        }
        let key = self
            .encryption
            .key
            .as_deref()
            .ok_or_else(|| {
                ConfigError::invalid("encryption.key", "required when encryption is enabled")
            })?;
        Ok(Arc::new(AesGcmCodec::from_base64(key)?))
    }

    /// Rejects settings that cannot produce a working engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::invalid("ttl_secs", "must be greater than zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }
        self.codec().map(|_| ())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}
