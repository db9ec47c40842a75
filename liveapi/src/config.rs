//! Configuration loading.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! error_event = "error"
//! connect_event = "connect"
//! body_recursion_limit = 1
//! max_dependency_depth = 16
//! duplicate_policy = "reject"   # or "override", "fan_out"
//! r2r_timeout_secs = 60
//! ```

use liveapi_core::DEFAULT_R2R_TIMEOUT;
use liveapi_std::{
    DuplicatePolicy, Settings,
    error_handler::{DEFAULT_CONNECT_EVENT, DEFAULT_ERROR_EVENT},
    listener::DEFAULT_MAX_DEPENDENCY_DEPTH,
    validation::DEFAULT_BODY_RECURSION_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use thiserror::Error;

/// Errors raised while loading a [`LiveConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid configuration.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// User-facing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Event failures are reported on.
    pub error_event: String,
    /// The connection event; only it carries headers.
    pub connect_event: String,
    /// Nested field lookups attempted when a body does not match its schema.
    pub body_recursion_limit: usize,
    /// Deepest allowed dependency frame.
    pub max_dependency_depth: usize,
    /// How duplicate registrations are handled.
    pub duplicate_policy: DuplicatePolicy,
    /// Default bound of request/response exchanges, in seconds.
    pub r2r_timeout_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            error_event: DEFAULT_ERROR_EVENT.to_owned(),
            connect_event: DEFAULT_CONNECT_EVENT.to_owned(),
            body_recursion_limit: DEFAULT_BODY_RECURSION_LIMIT,
            max_dependency_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
            duplicate_policy: DuplicatePolicy::default(),
            r2r_timeout_secs: DEFAULT_R2R_TIMEOUT.as_secs(),
        }
    }
}

impl LiveConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// The runtime settings shared by listeners and the error handler.
    pub fn settings(&self) -> Settings {
        Settings {
            connect_event: self.connect_event.clone(),
            error_event: self.error_event.clone(),
            body_recursion_limit: self.body_recursion_limit,
            max_dependency_depth: self.max_dependency_depth,
            r2r_timeout: Duration::from_secs(self.r2r_timeout_secs),
        }
    }
}
