#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Defaults suit most hosts. Values can come from the environment
//! (`MODSTACK_CHAIN_POLICY`, `MODSTACK_TRACE_SNAPSHOTS`) or, with the
//! `policy-config` feature, from a TOML or JSON file:
//!
//! ```toml
//! chain_policy = "close-root"
//! trace_snapshots = true
//! ```

use std::env;

use modstack_core::{ChainPolicy, ParsePolicyError};

/// Environment variable selecting the [`ChainPolicy`].
pub const ENV_CHAIN_POLICY: &str = "MODSTACK_CHAIN_POLICY";

/// Environment variable enabling snapshot tracing.
pub const ENV_TRACE_SNAPSHOTS: &str = "MODSTACK_TRACE_SNAPSHOTS";

/// Errors from loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The chain policy string was not recognised.
    InvalidPolicy(ParsePolicyError),
    /// A boolean flag had an unrecognised value.
    InvalidFlag {
        /// Variable or key name.
        key: String,
        /// Rejected value.
        value: String,
    },
    /// The config file could not be read.
    Io(std::io::Error),
    /// The config file could not be parsed.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPolicy(err) => write!(f, "invalid config: {err}"),
            Self::InvalidFlag { key, value } => {
                write!(f, "invalid config: {key} expects a boolean, got '{value}'")
            }
            Self::Io(err) => write!(f, "config io error: {err}"),
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPolicy(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::InvalidFlag { .. } | Self::Parse(_) => None,
        }
    }
}

impl From<ParsePolicyError> for ConfigError {
    fn from(err: ParsePolicyError) -> Self {
        Self::InvalidPolicy(err)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Configuration for a [`ModalEngine`](crate::ModalEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default, deny_unknown_fields))]
pub struct EngineConfig {
    /// How far submit and replace reach down a relay chain.
    pub chain_policy: ChainPolicy,
    /// Log every installed snapshot at trace level.
    pub trace_snapshots: bool,
}

impl EngineConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chain policy.
    #[must_use]
    pub fn with_chain_policy(mut self, policy: ChainPolicy) -> Self {
        self.chain_policy = policy;
        self
    }

    /// Enable or disable snapshot tracing.
    #[must_use]
    pub fn with_trace_snapshots(mut self, enabled: bool) -> Self {
        self.trace_snapshots = enabled;
        self
    }

    /// Read overrides from the environment. Unset variables keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let policy = env::var(ENV_CHAIN_POLICY).ok();
        let trace = env::var(ENV_TRACE_SNAPSHOTS).ok();
        Self::from_env_values(policy.as_deref(), trace.as_deref())
    }

    fn from_env_values(policy: Option<&str>, trace: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(policy) = policy.filter(|p| !p.trim().is_empty()) {
            config.chain_policy = policy.parse()?;
        }
        if let Some(trace) = trace {
            config.trace_snapshots = parse_flag(ENV_TRACE_SNAPSHOTS, trace)?;
        }
        Ok(config)
    }

    /// Parse a TOML document.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Parse a JSON document.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Load from a file, choosing the format by extension (`.json` is JSON,
    /// anything else is TOML).
    #[cfg(feature = "policy-config")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&input)
        } else {
            Self::from_toml_str(&input)
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}
