//! Broker configuration.
//!
//! Carries the two security-relevant knobs of the broker: the pinned
//! signing digest of the one trusted caller and the non-release
//! `allow_any_caller` relaxation. The compiled-in default pins
//! [`DEFAULT_TRUSTED_DIGEST`] with the relaxation off; a JSON config file
//! may override both.
//!
//! File loading is bounded: the size is checked on handle metadata before
//! any allocation, capping adversarial or corrupted config files.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use pkgbroker_core::SigningDigest;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Hex digest of the trusted caller's signing certificate compiled in as
/// the default pin.
pub const DEFAULT_TRUSTED_DIGEST: &str =
    "4e1c1d9f3cf91d1c3f8f2a89c8a4a1bd57cbe1f20d8e3a6f9b2c5d7e8f0a1b2c";

/// Upper bound on a config file's size in bytes.
pub const MAX_CONFIG_SIZE: u64 = 64 * 1024;

/// Errors loading broker configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exceeds [`MAX_CONFIG_SIZE`].
    #[error("config file too large: {size} bytes exceeds maximum of {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Allowed maximum.
        max: u64,
    },

    /// The config file could not be read.
    #[error("could not read config at {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file was not valid JSON for [`BrokerConfig`].
    #[error("invalid config at {}: {source}", path.display())]
    Parse {
        /// Path being parsed.
        path: PathBuf,
        /// Deserialization error.
        source: serde_json::Error,
    },
}

/// Broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Signing digest of the one caller trusted to issue privileged
    /// requests.
    pub expected_caller_digest: SigningDigest,

    /// Non-release relaxation: accept any caller, skipping the digest
    /// check. Defaults to off.
    #[serde(default)]
    pub allow_any_caller: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            expected_caller_digest: DEFAULT_TRUSTED_DIGEST
                .parse()
                .expect("compiled-in digest is valid hex"),
            allow_any_caller: false,
        }
    }
}

impl BrokerConfig {
    /// Loads configuration from a JSON file with a bounded read.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is oversized, unreadable, or
    /// not valid config JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let size = file
            .metadata()
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if size > MAX_CONFIG_SIZE {
            return Err(ConfigError::FileTooLarge {
                size,
                max: MAX_CONFIG_SIZE,
            });
        }

        let mut contents = String::with_capacity(usize::try_from(size).unwrap_or(0));
        let mut reader = file.take(MAX_CONFIG_SIZE);
        reader
            .read_to_string(&mut contents)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            expected = %config.expected_caller_digest,
            allow_any_caller = config.allow_any_caller,
            "broker config loaded"
        );
        Ok(config)
    }
}
