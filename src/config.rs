//! Context configuration

use std::env;
use std::num::{NonZeroUsize, ParseIntError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw store size meaning "never evict"
pub const STORE_UNLIMITED: usize = 0;

/// Raw store size requesting the built-in limit (256 MiB, the engine's default)
pub const STORE_DEFAULT: usize = 256 << 20;

/// Environment variable read by [`ContextConfig::from_env`]
pub const STORE_BYTES_ENV: &str = "MUPDF_ENV_STORE_BYTES";

/// Ceiling for the context's resource store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreLimit {
    /// Never evict
    Unlimited,
    /// Built-in limit of [`STORE_DEFAULT`] bytes
    #[default]
    Default,
    /// Exact byte ceiling
    Bytes(NonZeroUsize),
}

impl StoreLimit {
    /// Interpret a raw `max_store` value: `0` is unlimited, [`STORE_DEFAULT`]
    /// is the built-in limit, anything else an exact ceiling.
    pub fn from_raw(max_store: usize) -> Self {
        match max_store {
            STORE_UNLIMITED => StoreLimit::Unlimited,
            STORE_DEFAULT => StoreLimit::Default,
            n => NonZeroUsize::new(n).map_or(StoreLimit::Unlimited, StoreLimit::Bytes),
        }
    }

    /// Limit expressed in decimal megabytes; saturates on overflow
    pub fn megabytes(mb: u64) -> Self {
        let bytes = mb.saturating_mul(1_000_000);
        Self::from_raw(usize::try_from(bytes).unwrap_or(usize::MAX))
    }

    pub fn as_raw(self) -> usize {
        match self {
            StoreLimit::Unlimited => STORE_UNLIMITED,
            StoreLimit::Default => STORE_DEFAULT,
            StoreLimit::Bytes(n) => n.get(),
        }
    }

    /// Byte ceiling, `None` when unlimited
    pub fn max_bytes(self) -> Option<usize> {
        match self {
            StoreLimit::Unlimited => None,
            limit => Some(limit.as_raw()),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a byte count, got '{value}': {source}")]
    InvalidStoreBytes {
        var: &'static str,
        value: String,
        source: ParseIntError,
    },
}

/// Settings applied when a context is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub store: StoreLimit,
}

impl ContextConfig {
    pub fn new(store: StoreLimit) -> Self {
        Self { store }
    }

    /// Build a config from the process environment (and a `.env` file if present).
    ///
    /// Only hosts call this; contexts never read the environment themselves.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store = match env::var(STORE_BYTES_ENV) {
            Ok(value) => {
                let raw = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|source| ConfigError::InvalidStoreBytes {
                        var: STORE_BYTES_ENV,
                        value: value.clone(),
                        source,
                    })?;
                StoreLimit::from_raw(raw)
            }
            Err(_) => StoreLimit::Default,
        };

        Ok(Self { store })
    }
}
